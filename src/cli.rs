//! Command-line interface parsing for tagtrend
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated [`StartupConfig`] before any cache or network access happens.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;

use crate::cache::FileCache;
use crate::config::{ConfigError, TrendConfig, DEFAULT_MAX_WORKERS};
use crate::fetch::ApiToken;
use crate::fetch::RetryPolicy;
use crate::query::{normalize_value, GENERIC_STOP_WORDS};

/// Environment variable holding the Apify API token
pub const TOKEN_ENV: &str = "APIFY_API_TOKEN";

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No API token on the command line or in the environment
    #[error("No API token given. Pass --token or set APIFY_API_TOKEN")]
    MissingToken,

    /// Neither positional queries nor a query file supplied anything
    #[error("No queries given. Pass queries as arguments or with --file")]
    NoQueries,

    /// The query file could not be read
    #[error("Failed to read queries from {path}: {source}")]
    ReadQueries {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The query file looked like JSON but was not an array of items
    #[error("Failed to parse queries in {path}: {source}")]
    ParseQueries {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A setting is out of range
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// tagtrend - Check which hashtags are trending, with caching and parallel lookups
#[derive(Parser, Debug)]
#[command(name = "tagtrend")]
#[command(about = "Check trending hashtags with de-duplicated, cached, parallel lookups")]
#[command(version)]
pub struct Cli {
    /// Hashtags or keywords to check
    pub queries: Vec<String>,

    /// Read additional queries from a file, one per line or a JSON array of items
    #[arg(long, short, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Topic recorded in the report (defaults to the queries joined by commas)
    #[arg(long)]
    pub topic: Option<String>,

    /// Where to write the JSON report
    #[arg(long, short, default_value = "output.json", value_name = "PATH")]
    pub output: PathBuf,

    /// Cache file location (defaults to the user cache directory)
    #[arg(long, value_name = "PATH", conflicts_with = "no_cache")]
    pub cache: Option<PathBuf>,

    /// Keep results in memory only for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds a cached lookup stays valid
    #[arg(long, default_value_t = 86_400, value_name = "SECS")]
    pub ttl: u64,

    /// Maximum number of lookups in flight at once
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub workers: usize,

    /// Minimum query length after trimming
    #[arg(long, default_value_t = 2)]
    pub min_len: usize,

    /// Extra stop word to filter out (repeatable)
    #[arg(long = "stop-word", value_name = "WORD")]
    pub stop_words: Vec<String>,

    /// Do not filter the built-in generic English stop words
    #[arg(long)]
    pub no_default_stop_words: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    pub timeout: u64,

    /// Attempts per query, including the first
    #[arg(long, default_value_t = 3)]
    pub attempts: u32,

    /// Override the search actor endpoint
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Apify API token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,
}

/// Where lookups are cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    File(PathBuf),
    Memory,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Raw queries, positional ones first
    pub queries: Vec<String>,
    pub topic: String,
    pub output: PathBuf,
    pub cache: CacheLocation,
    pub trend: TrendConfig,
    pub token: ApiToken,
    pub endpoint: Option<String>,
}

/// Reads queries from a file.
///
/// A file starting with `[` is a JSON array of strings or objects such as
/// search results, each reduced to its query text. Anything else is read as
/// one query per non-blank line.
pub fn read_queries(path: &Path) -> Result<Vec<String>, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::ReadQueries {
        path: path.display().to_string(),
        source,
    })?;

    if content.trim_start().starts_with('[') {
        let items: Vec<Value> =
            serde_json::from_str(&content).map_err(|source| CliError::ParseQueries {
                path: path.display().to_string(),
                source,
            })?;
        return Ok(items
            .iter()
            .map(normalize_value)
            .filter(|query| !query.is_empty())
            .collect());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

impl Cli {
    /// Builds the run configuration from the numeric and filter flags
    pub fn trend_config(&self) -> TrendConfig {
        let mut stop_words: HashSet<String> = if self.no_default_stop_words {
            HashSet::new()
        } else {
            GENERIC_STOP_WORDS.iter().map(|w| w.to_string()).collect()
        };
        stop_words.extend(self.stop_words.iter().map(|w| w.trim().to_lowercase()));

        let mut config = TrendConfig::new();
        config.default_ttl = Duration::from_secs(self.ttl);
        config.filter.stop_words = stop_words;
        config.filter.min_len = self.min_len;
        config.fetch.max_workers = self.workers;
        config.fetch.timeout = Duration::from_secs(self.timeout);
        config.fetch.retry = RetryPolicy::with_max_attempts(self.attempts);
        config
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// Settings are validated first, then the token, then the query sources.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` for invalid settings, a missing token or no queries
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let trend = cli.trend_config();
        trend.validate()?;

        let token = cli
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ApiToken::new)
            .ok_or(CliError::MissingToken)?;

        let mut queries = cli.queries.clone();
        if let Some(path) = &cli.file {
            queries.extend(read_queries(path)?);
        }
        if queries.iter().all(|q| q.trim().is_empty()) {
            return Err(CliError::NoQueries);
        }

        let topic = cli.topic.clone().unwrap_or_else(|| queries.join(", "));
        let cache = if cli.no_cache {
            CacheLocation::Memory
        } else {
            cli.cache
                .clone()
                .or_else(FileCache::default_path)
                .map(CacheLocation::File)
                .unwrap_or(CacheLocation::Memory)
        };

        Ok(StartupConfig {
            queries,
            topic,
            output: cli.output.clone(),
            cache,
            trend,
            token,
            endpoint: cli.endpoint.clone(),
        })
    }
}
