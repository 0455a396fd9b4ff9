//! Query reduction
//!
//! Canonicalizes, de-duplicates and filters raw queries before they reach the
//! cache or the trend source, so each distinct query costs at most one call.

mod dedupe;
mod filter;
mod normalize;

pub use dedupe::dedupe_preserve_order;
pub use filter::{filter_generic, FilterConfig, GENERIC_STOP_WORDS};
pub use normalize::{normalize, normalize_all, normalize_value};

/// Runs the full reduction: normalize, drop empties, filter, de-duplicate.
///
/// The returned list holds cache keys in first-seen order.
pub fn reduce<I, S>(raw: I, filter: &FilterConfig) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized: Vec<String> = normalize_all(raw)
        .into_iter()
        .filter(|q| !q.is_empty())
        .collect();
    let filtered = filter_generic(normalized, &filter.stop_words, filter.min_len);
    dedupe_preserve_order(filtered)
}
