//! Query normalization
//!
//! Normalized text is the cache key, so these functions must stay pure and
//! deterministic.

use reqwest::Url;
use serde_json::Value;

/// Object fields that carry the query text of a structured item, in priority order
const TEXT_FIELDS: [&str; 7] = ["title", "text", "query", "q", "searchQuery", "name", "snippet"];

/// Lowercases, trims and collapses internal whitespace to single spaces
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes every item, keeping one output per input (empty strings included)
pub fn normalize_all<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().map(|s| normalize(s.as_ref())).collect()
}

/// Normalizes a loosely structured item as produced by keyword extraction.
///
/// Strings are used as-is, objects through their first non-empty text field
/// and then their `url` (the `q` parameter, else the path). `null` maps to
/// the empty string and anything else goes through its JSON text.
pub fn normalize_value(item: &Value) -> String {
    match item {
        Value::Null => String::new(),
        Value::String(s) => normalize(s),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
            .map(normalize)
            .or_else(|| map.get("url").and_then(Value::as_str).and_then(query_from_url))
            .unwrap_or_else(|| normalize(&item.to_string())),
        other => normalize(&other.to_string()),
    }
}

/// Search text carried by a result URL
fn query_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let from_query = url
        .query_pairs()
        .find_map(|(key, value)| (key == "q").then(|| normalize(&value)))
        .filter(|q| !q.is_empty());
    if from_query.is_some() {
        return from_query;
    }

    let path = normalize(&url.path().trim_matches('/').replace(['-', '_'], " "));
    (!path.is_empty()).then_some(path)
}
