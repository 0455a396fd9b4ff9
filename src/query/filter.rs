//! Generic-term filtering

use std::collections::HashSet;

/// Words too generic to be worth a trend lookup
pub const GENERIC_STOP_WORDS: [&str; 11] = [
    "the", "a", "an", "and", "or", "to", "in", "on", "for", "with", "of",
];

/// Configuration for [`filter_generic`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Queries equal to any of these (case-insensitively) are dropped
    pub stop_words: HashSet<String>,
    /// Queries shorter than this (in characters, after trimming) are dropped
    pub min_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stop_words: GENERIC_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            min_len: 2,
        }
    }
}

/// Drops queries that are too short or match a stop word, preserving order
pub fn filter_generic<I, S>(items: I, stop_words: &HashSet<String>, min_len: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let stop: HashSet<String> = stop_words.iter().map(|w| w.trim().to_lowercase()).collect();

    items
        .into_iter()
        .map(Into::into)
        .filter(|item| {
            let trimmed = item.trim();
            trimmed.chars().count() >= min_len && !stop.contains(&trimmed.to_lowercase())
        })
        .collect()
}
