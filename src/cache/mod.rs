//! Cache module for storing trend lookups
//!
//! This module provides the [`CacheStore`] interface plus two stores: a
//! [`FileCache`] that persists every mutation to a single JSON document, and a
//! [`MemoryCache`] used by tests and `--no-cache` runs. Expired entries are
//! never returned by `get`, although they may stay on disk until the next write.

mod clock;
mod entry;
mod file;
mod memory;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use file::FileCache;
pub use memory::MemoryCache;

/// Default time-to-live for cached lookups (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Errors raised by cache stores
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing file could not be written
    #[error("Failed to persist cache to {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Entries could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The cache path can be neither read nor written
    #[error("Cache path {path} is not accessible: {reason}")]
    Inaccessible { path: String, reason: String },
}

/// Key-value store with per-entry expiration.
///
/// Implementations serialize their own mutations, so a store can be shared
/// behind an `Arc` across concurrent fetches.
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key` if present and unexpired
    fn get(&self, key: &str) -> Option<Value>;

    /// Inserts or overwrites `key`, expiring after `ttl` (or the store default).
    ///
    /// The in-memory entry stays valid even when persisting fails.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Removes `key`, returning whether an entry was present
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// The TTL applied when `set` is called without one
    fn default_ttl(&self) -> Duration;
}
