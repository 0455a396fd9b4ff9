//! Bounded parallel fan-out over a trend source

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;

use super::{FetchError, FetchResult, RetryPolicy, TrendSource};
use crate::config::{ConfigError, FetchConfig};
use crate::query::dedupe_preserve_order;

/// Issues one lookup per query with at most `max_workers` in flight
#[derive(Clone)]
pub struct ParallelFetcher {
    source: Arc<dyn TrendSource>,
    max_workers: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ParallelFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelFetcher")
            .field("max_workers", &self.max_workers)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ParallelFetcher {
    /// Creates a fetcher, rejecting invalid configuration before any request is made
    pub fn new(source: Arc<dyn TrendSource>, config: &FetchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            max_workers: config.max_workers,
            timeout: config.timeout,
            retry: config.retry.clone(),
        })
    }

    /// Looks up every query, returning exactly one result per distinct query
    pub async fn fetch_all(&self, queries: &[String]) -> HashMap<String, FetchResult> {
        self.fetch_all_with(queries, |_| future::ready(())).await
    }

    /// Like [`fetch_all`](Self::fetch_all), awaiting `on_result` as each lookup finishes
    ///
    /// In-flight lookups are not polled while `on_result` runs, so it should
    /// hand blocking work off the async worker.
    pub async fn fetch_all_with<F, Fut>(
        &self,
        queries: &[String],
        on_result: F,
    ) -> HashMap<String, FetchResult>
    where
        F: Fn(FetchResult) -> Fut,
        Fut: Future<Output = ()>,
    {
        let unique = dedupe_preserve_order(queries.iter().cloned());
        let total = unique.len();
        let start = Instant::now();

        let results: HashMap<String, FetchResult> = stream::iter(unique)
            .map(|query| async move {
                let value = self.fetch_one(&query).await;
                FetchResult { query, value }
            })
            .buffer_unordered(self.max_workers)
            .then(|result| {
                let done = on_result(result.clone());
                async move {
                    done.await;
                    (result.query.clone(), result)
                }
            })
            .collect()
            .await;

        let resolved = results.values().filter(|r| r.is_resolved()).count();
        info!(
            "Completed {} queries ({} resolved) in {:.2}s",
            total,
            resolved,
            start.elapsed().as_secs_f64()
        );
        results
    }

    /// Looks up a single query with timeout and retries; `None` on failure
    pub async fn fetch_one(&self, query: &str) -> Option<Value> {
        let outcome = self
            .retry
            .execute(|| async move {
                match tokio::time::timeout(self.timeout, self.source.fetch(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(self.timeout)),
                }
            })
            .await;

        match outcome {
            Ok(Value::Null) => {
                debug!("Empty result for query '{}'", query);
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Lookup failed for query '{}': {}", query, e);
                None
            }
        }
    }
}
