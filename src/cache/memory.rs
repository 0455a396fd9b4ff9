//! In-memory cache store

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use super::{CacheEntry, CacheError, CacheStore, Clock, SystemClock, DEFAULT_TTL};

/// Cache that lives only as long as the process
#[derive(Debug)]
pub struct MemoryCache {
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_valid(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value, self.clock.now(), ttl.unwrap_or(self.default_ttl));
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.lock().remove(key).is_some())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
