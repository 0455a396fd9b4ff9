//! The composite trend lookup
//!
//! Reduces raw queries, answers what it can from the cache, fetches the rest
//! in parallel, writes fresh results back and reports one outcome per raw query.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheStore;
use crate::config::{ConfigError, TrendConfig};
use crate::fetch::{FetchResult, ParallelFetcher, TrendSource};
use crate::query::{self, normalize, FilterConfig};

/// Where a raw query's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Served from a valid cache entry
    Cache,
    /// Freshly fetched (and written back to the cache)
    Fetched,
    /// Looked up but no value could be obtained
    Unresolved,
    /// Dropped by the generic-term filter; never looked up
    Filtered,
}

/// Outcome for one raw input query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// The query as given by the caller
    pub query: String,
    /// Normalized cache key, absent when the query was filtered out
    pub key: Option<String>,
    pub origin: Origin,
    pub value: Option<Value>,
}

/// Result of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Queries that survived reduction, in first-seen order
    pub reduced: Vec<String>,
    /// One entry per raw input, in input order
    pub resolutions: Vec<Resolution>,
}

impl PipelineOutput {
    /// Maps every raw query to its value, `None` where nothing was resolved
    pub fn values(&self) -> BTreeMap<String, Option<Value>> {
        self.resolutions
            .iter()
            .map(|r| (r.query.clone(), r.value.clone()))
            .collect()
    }

    /// Number of distinct reduced queries with the given origin
    pub fn count(&self, origin: Origin) -> usize {
        self.resolutions
            .iter()
            .filter(|r| r.origin == origin)
            .filter_map(|r| r.key.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Values for the reduced queries, one per distinct key
    pub fn resolved_values(&self) -> impl Iterator<Item = &Value> {
        let mut seen = HashSet::new();
        self.resolutions
            .iter()
            .filter(move |r| r.key.as_ref().map_or(false, |k| seen.insert(k.clone())))
            .filter_map(|r| r.value.as_ref())
    }
}

/// Query reduction, cache and parallel fetcher wired together
pub struct TrendPipeline {
    filter: FilterConfig,
    default_ttl: Duration,
    cache: Arc<dyn CacheStore>,
    fetcher: ParallelFetcher,
}

impl TrendPipeline {
    /// Builds a pipeline, failing fast on invalid configuration
    pub fn new(
        config: &TrendConfig,
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn TrendSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            filter: config.filter.clone(),
            default_ttl: config.default_ttl,
            cache,
            fetcher: ParallelFetcher::new(source, &config.fetch)?,
        })
    }

    /// Normalizes, filters and de-duplicates raw queries
    pub fn reduce<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        query::reduce(raw, &self.filter)
    }

    /// Reduce, consult cache, fetch misses, write back, and resolve every raw query
    pub async fn run<S: AsRef<str>>(&self, raw: &[S]) -> PipelineOutput {
        let reduced = self.reduce(raw);

        let mut values: HashMap<String, (Origin, Option<Value>)> = HashMap::new();
        let mut misses = Vec::new();
        for key in &reduced {
            match self.cache.get(key) {
                Some(value) => {
                    values.insert(key.clone(), (Origin::Cache, Some(value)));
                }
                None => misses.push(key.clone()),
            }
        }
        info!("{} cached, {} to query", values.len(), misses.len());

        if !misses.is_empty() {
            let fresh = self
                .fetcher
                .fetch_all_with(&misses, |result| self.write_back(result))
                .await;
            for (key, result) in fresh {
                let origin = if result.is_resolved() {
                    Origin::Fetched
                } else {
                    Origin::Unresolved
                };
                values.insert(key, (origin, result.value));
            }
        }

        let kept: HashSet<&String> = reduced.iter().collect();
        let resolutions = raw
            .iter()
            .map(|raw| {
                let query = raw.as_ref().to_string();
                let key = normalize(&query);
                if !kept.contains(&key) {
                    return Resolution {
                        query,
                        key: None,
                        origin: Origin::Filtered,
                        value: None,
                    };
                }
                let (origin, value) = values
                    .get(&key)
                    .cloned()
                    .unwrap_or((Origin::Unresolved, None));
                Resolution {
                    query,
                    key: Some(key),
                    origin,
                    value,
                }
            })
            .collect();

        PipelineOutput {
            reduced,
            resolutions,
        }
    }

    /// Persists a successful lookup; failures only cost future cache hits
    async fn write_back(&self, result: FetchResult) {
        let Some(value) = result.value else {
            return;
        };
        let query = result.query;
        let cache = Arc::clone(&self.cache);
        let ttl = self.default_ttl;
        let key = query.clone();

        match tokio::task::spawn_blocking(move || cache.set(&key, value, Some(ttl))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to cache result for '{}': {}", query, e),
            Err(e) => warn!("Cache write for '{}' did not complete: {}", query, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryCache};
    use chrono::Utc;
    use crate::fetch::FetchError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoSource {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TrendSource for EchoSource {
        async fn fetch(&self, query: &str) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(query.to_string());
            if query == "broken" {
                return Err(FetchError::Payload("garbage".to_string()));
            }
            Ok(json!({ "echo": query }))
        }
    }

    fn pipeline(source: Arc<EchoSource>, cache: Arc<MemoryCache>) -> TrendPipeline {
        let mut config = TrendConfig::new();
        config.filter.stop_words = HashSet::from(["enterprise".to_string()]);
        TrendPipeline::new(&config, cache, source).unwrap()
    }

    #[tokio::test]
    async fn test_run_resolves_every_raw_query() {
        let source = Arc::new(EchoSource::default());
        let pipeline = pipeline(source.clone(), Arc::new(MemoryCache::default()));

        let output = pipeline.run(&["Cat", "cat ", "dog", "enterprise"]).await;

        assert_eq!(output.reduced, vec!["cat", "dog"]);
        assert_eq!(output.resolutions.len(), 4);
        assert_eq!(output.resolutions[1].key.as_deref(), Some("cat"));
        assert_eq!(output.resolutions[1].value, Some(json!({ "echo": "cat" })));
        assert_eq!(output.resolutions[3].origin, Origin::Filtered);
        assert_eq!(output.values()["enterprise"], None);
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let source = Arc::new(EchoSource::default());
        let cache = Arc::new(MemoryCache::default());
        let pipeline = pipeline(source.clone(), cache);

        pipeline.run(&["seo", "broken"]).await;
        let output = pipeline.run(&["SEO", "broken"]).await;

        assert_eq!(output.resolutions[0].origin, Origin::Cache);
        assert_eq!(output.resolutions[1].origin, Origin::Unresolved);
        assert_eq!(output.count(Origin::Cache), 1);
        assert_eq!(output.count(Origin::Unresolved), 1);
        // "broken" is looked up on both runs, "seo" only on the first
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.iter().filter(|q| q.as_str() == "broken").count(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let source = Arc::new(EchoSource::default());
        let pipeline = pipeline(source.clone(), Arc::new(MemoryCache::default()));

        let output = pipeline.run::<&str>(&[]).await;

        assert!(output.reduced.is_empty());
        assert!(output.resolutions.is_empty());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolved_values_are_distinct_per_key() {
        let pipeline = pipeline(Arc::new(EchoSource::default()), Arc::new(MemoryCache::default()));

        let output = pipeline.run(&["ai", "AI", "cloud"]).await;

        assert_eq!(output.resolved_values().count(), 2);
    }

    #[tokio::test]
    async fn test_write_back_uses_configured_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(MemoryCache::with_clock(
            Duration::from_secs(86_400),
            clock.clone(),
        ));
        let source = Arc::new(EchoSource::default());
        let mut config = TrendConfig::new();
        config.default_ttl = Duration::from_secs(60);
        let pipeline = TrendPipeline::new(&config, cache, source.clone()).unwrap();

        pipeline.run(&["seo"]).await;
        clock.advance(Duration::from_secs(30));
        let fresh = pipeline.run(&["seo"]).await;
        clock.advance(Duration::from_secs(90));
        let expired = pipeline.run(&["seo"]).await;

        assert_eq!(fresh.resolutions[0].origin, Origin::Cache);
        assert_eq!(expired.resolutions[0].origin, Origin::Fetched);
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TrendConfig::new();
        config.fetch.max_workers = 0;

        let result = TrendPipeline::new(
            &config,
            Arc::new(MemoryCache::default()),
            Arc::new(EchoSource::default()),
        );

        assert!(matches!(result, Err(ConfigError::InvalidWorkers(0))));
    }
}
