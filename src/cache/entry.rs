//! On-disk cache entry

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached value together with its expiry timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached lookup result
    pub value: Value,
    /// When the entry stops being returned
    pub expires_at: DateTime<Utc>,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry written at `now` that lives for `ttl`
    pub fn new(value: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            expires_at,
            created_at: now,
        }
    }

    /// An entry is valid strictly before its expiry time
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_valid_until_expiry() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!({"x": 1}), now, Duration::from_secs(60));

        assert!(entry.is_valid(now));
        assert!(entry.is_valid(now + chrono::Duration::seconds(59)));
        assert!(!entry.is_valid(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_entry_with_huge_ttl_saturates() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!(null), now, Duration::from_secs(u64::MAX));
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_entry_serializes_expiry_as_timestamp() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!("v"), now, Duration::from_secs(1));
        let json = serde_json::to_value(&entry).expect("Should serialize");

        assert_eq!(json["value"], "v");
        assert!(json["expires_at"].is_string());
        assert!(json["created_at"].is_string());
    }
}
