//! JSON run report

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::pipeline::{Origin, PipelineOutput};
use crate::trending::{HashtagCount, HashtagTally};

/// How many hashtags make the headline list
pub const TOP_HASHTAGS: usize = 20;

/// Errors that can occur when writing a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

/// Everything learned in one run, as written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub topic: String,
    /// Queries that were looked up, after reduction
    pub queries: Vec<String>,
    /// Every raw query mapped to its lookup result, `null` when unresolved
    pub results: BTreeMap<String, Option<Value>>,
    pub trending_hashtags: Vec<String>,
    pub hashtag_counts: Vec<HashtagCount>,
    pub total_unique: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub unresolved: usize,
    pub duration_secs: f64,
    pub avg_secs_per_query: f64,
}

impl TrendReport {
    /// Summarizes a pipeline run that took `elapsed`
    pub fn from_output(
        topic: impl Into<String>,
        output: &PipelineOutput,
        elapsed: Duration,
    ) -> Self {
        let mut tally = HashtagTally::new();
        output.resolved_values().for_each(|value| tally.add(value));

        let duration_secs = elapsed.as_secs_f64();
        let avg_secs_per_query = if output.reduced.is_empty() {
            0.0
        } else {
            duration_secs / output.reduced.len() as f64
        };

        Self {
            topic: topic.into(),
            queries: output.reduced.clone(),
            results: output.values(),
            trending_hashtags: tally.top(TOP_HASHTAGS),
            hashtag_counts: tally.ranked(),
            total_unique: tally.total_unique(),
            cache_hits: output.count(Origin::Cache),
            fetched: output.count(Origin::Fetched),
            unresolved: output.count(Origin::Unresolved),
            duration_secs,
            avg_secs_per_query,
        }
    }

    /// The short view printed to the console
    pub fn minimal(&self) -> Value {
        json!({
            "topic": self.topic,
            "queries": self.queries,
            "trending_hashtags": self.trending_hashtags,
        })
    }

    /// Writes the full report as pretty-printed JSON
    pub fn save_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
