//! Hashtag extraction from search results
//!
//! The search actor returns dataset items with organic results, related
//! queries and AI overview text. Hashtags are any `#word` tokens found there.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text fields of an organic result that may mention hashtags
const ORGANIC_FIELDS: [&str; 5] = ["title", "snippet", "description", "plainText", "text"];

/// Fields of a related query object, in priority order
const RELATED_FIELDS: [&str; 3] = ["text", "query", "title"];

/// Item fields holding AI-generated overview text
const AI_FIELDS: [&str; 3] = ["aiOverview", "aiModeResults", "aiOverviews"];

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"))
}

/// Returns every hashtag occurrence in a lookup result, in document order.
///
/// Accepts either a list of dataset items or a single item.
pub fn extract_hashtags(result: &Value) -> Vec<String> {
    let mut found = Vec::new();
    match result {
        Value::Array(items) => items.iter().for_each(|item| scan_item(item, &mut found)),
        item => scan_item(item, &mut found),
    }
    found
}

fn scan_item(item: &Value, found: &mut Vec<String>) {
    let mut scan = |text: &str| {
        found.extend(hashtag_pattern().find_iter(text).map(|m| m.as_str().to_string()));
    };

    if let Some(organic) = item.get("organicResults").and_then(Value::as_array) {
        for result in organic {
            for field in ORGANIC_FIELDS {
                if let Some(text) = result.get(field).and_then(Value::as_str) {
                    scan(text);
                }
            }
        }
    }

    if let Some(related) = item.get("relatedQueries").and_then(Value::as_array) {
        for query in related {
            let text = match query {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => RELATED_FIELDS
                    .iter()
                    .filter_map(|f| query.get(*f).and_then(Value::as_str))
                    .find(|s| !s.is_empty()),
                _ => None,
            };
            if let Some(text) = text {
                scan(text);
            }
        }
    }

    for field in AI_FIELDS {
        match item.get(field) {
            Some(Value::String(text)) => scan(text),
            Some(Value::Array(parts)) => parts.iter().filter_map(Value::as_str).for_each(&mut scan),
            _ => {}
        }
    }
}

/// A hashtag and how often it appeared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagCount {
    pub hashtag: String,
    pub count: usize,
}

/// Running count of hashtags across lookup results
#[derive(Debug, Clone, Default)]
pub struct HashtagTally {
    counts: HashMap<String, usize>,
}

impl HashtagTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every hashtag in one lookup result
    pub fn add(&mut self, result: &Value) {
        for tag in extract_hashtags(result) {
            *self.counts.entry(tag).or_insert(0) += 1;
        }
    }

    /// Number of distinct hashtags seen
    pub fn total_unique(&self) -> usize {
        self.counts.len()
    }

    /// All hashtags, most frequent first; ties broken alphabetically
    pub fn ranked(&self) -> Vec<HashtagCount> {
        let mut ranked: Vec<HashtagCount> = self
            .counts
            .iter()
            .map(|(hashtag, count)| HashtagCount {
                hashtag: hashtag.clone(),
                count: *count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.hashtag.cmp(&b.hashtag)));
        ranked
    }

    /// The `n` most frequent hashtags
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranked().into_iter().take(n).map(|c| c.hashtag).collect()
    }
}
