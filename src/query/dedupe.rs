//! Order-preserving de-duplication

use std::collections::HashSet;

/// Keeps the first occurrence of each string, preserving relative order
pub fn dedupe_preserve_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(Into::into)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
