//! File-backed cache store
//!
//! Keeps all entries in memory and rewrites a single JSON document on every
//! mutation. Writes go to a sibling `.tmp` file that is then renamed over the
//! cache file, so an interrupted write leaves the previous document intact.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use directories::ProjectDirs;
use log::{debug, warn};
use serde_json::Value;

use super::{CacheEntry, CacheError, CacheStore, Clock, SystemClock};

/// File name used inside the default cache directory
const CACHE_FILE_NAME: &str = "trends.json";

type Entries = HashMap<String, CacheEntry>;

/// Persistent cache backed by one JSON file
///
/// The document maps each normalized query to `{ value, expires_at, created_at }`.
/// A missing, unreadable or corrupt file yields an empty cache rather than an
/// error; only a path that can be neither read nor written fails `open`.
#[derive(Debug)]
pub struct FileCache {
    /// Location of the JSON document
    path: PathBuf,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Time source for expiry checks
    clock: Arc<dyn Clock>,
    /// Entries loaded from disk plus everything set since
    entries: Mutex<Entries>,
}

impl FileCache {
    /// Returns the default cache file path in an XDG-compliant cache directory
    ///
    /// Uses `~/.cache/tagtrend/trends.json` on Linux, or the equivalent on other platforms.
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "tagtrend")?;
        Some(project_dirs.cache_dir().join(CACHE_FILE_NAME))
    }

    /// Opens (or starts) the cache at `path` using the wall clock
    pub fn open(path: impl Into<PathBuf>, default_ttl: Duration) -> Result<Self, CacheError> {
        Self::open_with_clock(path, default_ttl, Arc::new(SystemClock))
    }

    /// Opens the cache at `path` with a custom time source
    ///
    /// # Errors
    /// * `CacheError::Inaccessible` if the file cannot be read and its location cannot be written
    pub fn open_with_clock(
        path: impl Into<PathBuf>,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = load(&path)?;
        debug!("Loaded {} cache entries from {}", entries.len(), path.display());

        Ok(Self {
            path,
            default_ttl,
            clock,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of unexpired entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock().values().filter(|e| e.is_valid(now)).count()
    }

    /// Whether the cache holds no unexpired entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes every unexpired entry to disk.
    ///
    /// Called with the entries lock held, which serializes writers.
    fn flush(&self, entries: &Entries) -> Result<(), CacheError> {
        let now = self.clock.now();
        let live: BTreeMap<&String, &CacheEntry> =
            entries.iter().filter(|(_, e)| e.is_valid(now)).collect();
        let json = serde_json::to_string_pretty(&live)?;

        let write_failed = |source| CacheError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json).map_err(write_failed)?;
        fs::rename(&tmp, &self.path).map_err(write_failed)
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_valid(now) => {
                debug!("Cache hit for key: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache expired for key: {}", key);
                entries.remove(key);
                None
            }
            None => {
                debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value, self.clock.now(), ttl.unwrap_or(self.default_ttl));
        let mut entries = self.lock();
        entries.insert(key.to_string(), entry);
        self.flush(&entries)
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.lock();
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(&entries)?;
        Ok(true)
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Sibling path used for atomic replacement, e.g. `trends.json.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads the cache document, degrading to an empty map on any read problem
/// unless the location is also unwritable.
fn load(path: &Path) -> Result<Entries, CacheError> {
    if path.is_dir() {
        return Err(CacheError::Inaccessible {
            path: path.display().to_string(),
            reason: "path is a directory".to_string(),
        });
    }

    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
        Ok(content) => match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                Ok(Entries::new())
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            probe_writable(path)?;
            Ok(Entries::new())
        }
        Err(e) => {
            probe_writable(path)?;
            warn!("Could not read cache file {}: {}", path.display(), e);
            Ok(Entries::new())
        }
    }
}

/// Checks that the cache location can be written without touching the cache file
fn probe_writable(path: &Path) -> Result<(), CacheError> {
    let inaccessible = |e: std::io::Error| CacheError::Inaccessible {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(inaccessible)?;
    }
    let tmp = tmp_path(path);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .map_err(inaccessible)?;
    if let Err(e) = fs::remove_file(&tmp) {
        debug!("Could not remove {}: {}", tmp.display(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::Utc;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(3600);

    fn create_test_cache() -> (FileCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FileCache::open(temp_dir.path().join("trends.json"), TTL)
            .expect("Should open cache");
        (cache, temp_dir)
    }

    fn create_clocked_cache() -> (FileCache, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache =
            FileCache::open_with_clock(temp_dir.path().join("trends.json"), TTL, clock.clone())
                .expect("Should open cache");
        (cache, clock, temp_dir)
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let (cache, temp_dir) = create_test_cache();

        assert!(cache.is_empty());
        assert!(!temp_dir.path().join("trends.json").exists());
        assert!(cache.get("anything").is_none());
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let (cache, _temp_dir) = create_test_cache();
        let value = json!({"hashtags": ["#seo"]});

        cache.set("seo", value.clone(), None).expect("Set should succeed");

        assert_eq!(cache.get("seo"), Some(value));
    }

    #[test]
    fn test_set_persists_value_and_expiry() {
        let (cache, temp_dir) = create_test_cache();

        cache.set("marketing", json!({"x": 1}), None).expect("Set should succeed");

        let content = fs::read_to_string(temp_dir.path().join("trends.json"))
            .expect("Should read file");
        let doc: Value = serde_json::from_str(&content).expect("Should be valid JSON");
        assert_eq!(doc["marketing"]["value"], json!({"x": 1}));
        assert!(doc["marketing"]["expires_at"].is_string());
        assert!(!temp_dir.path().join("trends.json.tmp").exists());
    }

    #[test]
    fn test_get_returns_none_after_ttl_elapses() {
        let (cache, clock, _temp_dir) = create_clocked_cache();

        cache
            .set("ai", json!("trend"), Some(Duration::from_secs(60)))
            .expect("Set should succeed");
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("ai"), Some(json!("trend")));

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("ai").is_none());
    }

    #[test]
    fn test_expired_entry_still_on_disk_is_not_returned_after_reload() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));

        let cache = FileCache::open_with_clock(&path, TTL, clock.clone()).expect("Should open");
        cache
            .set("short", json!(1), Some(Duration::from_secs(10)))
            .expect("Set should succeed");
        drop(cache);

        clock.advance(Duration::from_secs(11));
        let reopened = FileCache::open_with_clock(&path, TTL, clock).expect("Should reopen");

        let content = fs::read_to_string(&path).expect("Should read file");
        assert!(content.contains("short"), "Entry may persist physically");
        assert!(reopened.get("short").is_none());
    }

    #[test]
    fn test_rewrite_prunes_expired_entries() {
        let (cache, clock, temp_dir) = create_clocked_cache();

        cache
            .set("old", json!(1), Some(Duration::from_secs(5)))
            .expect("Set should succeed");
        clock.advance(Duration::from_secs(10));
        cache.set("new", json!(2), None).expect("Set should succeed");

        let content = fs::read_to_string(temp_dir.path().join("trends.json"))
            .expect("Should read file");
        assert!(!content.contains("\"old\""));
        assert!(content.contains("\"new\""));
    }

    #[test]
    fn test_cache_survives_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");

        let cache = FileCache::open(&path, TTL).expect("Should open");
        cache.set("seo", json!({"n": 1}), None).expect("Set should succeed");
        cache.set("cloud ai", json!(["#CloudAI"]), None).expect("Set should succeed");
        cache.set("null", Value::Null, None).expect("Set should succeed");
        drop(cache);

        let reopened = FileCache::open(&path, TTL).expect("Should reopen");
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.get("seo"), Some(json!({"n": 1})));
        assert_eq!(reopened.get("cloud ai"), Some(json!(["#CloudAI"])));
        assert_eq!(reopened.get("null"), Some(Value::Null));
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty_cache() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");
        fs::write(&path, "{ not json").expect("Should write corrupt file");

        let cache = FileCache::open(&path, TTL).expect("Corrupt cache must not fail open");
        assert!(cache.is_empty());

        cache.set("fresh", json!(true), None).expect("Set should succeed");
        let reopened = FileCache::open(&path, TTL).expect("Should reopen");
        assert_eq!(reopened.get("fresh"), Some(json!(true)));
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let cache = FileCache::open(nested.join("trends.json"), TTL).expect("Should open");

        cache.set("k", json!(1), None).expect("Set should succeed");

        assert!(nested.join("trends.json").exists(), "Cache file should exist");
    }

    #[test]
    fn test_open_directory_path_is_inaccessible() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let result = FileCache::open(temp_dir.path(), TTL);

        assert!(matches!(result, Err(CacheError::Inaccessible { .. })));
    }

    #[test]
    fn test_write_failure_keeps_entry_in_memory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");
        let cache = FileCache::open(&path, TTL).expect("Should open");

        // A directory in place of the file makes the rename fail
        fs::create_dir(&path).expect("Should create blocking directory");

        let result = cache.set("k", json!("v"), None);
        assert!(matches!(result, Err(CacheError::WriteFailed { .. })));
        assert_eq!(cache.get("k"), Some(json!("v")));
    }

    #[test]
    fn test_overwrite_existing_entry() {
        let (cache, _temp_dir) = create_test_cache();

        cache.set("k", json!("first"), None).expect("First set should succeed");
        cache.set("k", json!("second"), None).expect("Second set should succeed");

        assert_eq!(cache.get("k"), Some(json!("second")));
    }

    #[test]
    fn test_delete_removes_entry_from_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");
        let cache = FileCache::open(&path, TTL).expect("Should open");
        cache.set("k", json!(1), None).expect("Set should succeed");

        assert!(cache.delete("k").expect("Delete should succeed"));
        assert!(!cache.delete("k").expect("Delete should succeed"));

        let reopened = FileCache::open(&path, TTL).expect("Should reopen");
        assert!(reopened.get("k").is_none());
    }

    #[test]
    fn test_concurrent_sets_are_not_lost() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("trends.json");
        let cache = Arc::new(FileCache::open(&path, TTL).expect("Should open"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                thread::spawn(move || {
                    cache
                        .set(&format!("key{}", i), json!(i), None)
                        .expect("Set should succeed");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread should finish");
        }

        let reopened = FileCache::open(&path, TTL).expect("Should reopen");
        assert_eq!(reopened.len(), 8);
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        if let Some(path) = FileCache::default_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("tagtrend"), "Cache path should contain project name");
            assert!(path_str.ends_with("trends.json"));
        }
        // Test passes if default_path() returns None (e.g., no home directory in CI)
    }
}
