//! Run configuration
//!
//! Groups every tunable of a trend run and validates it up front, so a bad
//! setting fails before any file or network access happens.

use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_TTL;
use crate::fetch::RetryPolicy;
use crate::query::FilterConfig;

/// Default number of concurrent lookups
pub const DEFAULT_MAX_WORKERS: usize = 6;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors, reported before any work starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_workers must be at least 1 (got {0})")]
    InvalidWorkers(usize),

    #[error("default_ttl must be greater than zero")]
    InvalidTtl,

    #[error("request timeout must be greater than zero")]
    InvalidTimeout,

    #[error("retry policy needs at least one attempt")]
    InvalidRetries,
}

/// Settings for the parallel fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Upper bound on simultaneous in-flight lookups
    pub max_workers: usize,
    /// Timeout applied to each individual attempt
    pub timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers < 1 {
            return Err(ConfigError::InvalidWorkers(self.max_workers));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetries);
        }
        Ok(())
    }
}

/// Full configuration of a trend run
#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    /// TTL for newly cached lookups
    pub default_ttl: Duration,
    /// Query filtering rules
    pub filter: FilterConfig,
    /// Fetcher settings
    pub fetch: FetchConfig,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            filter: FilterConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl TrendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl.is_zero() {
            return Err(ConfigError::InvalidTtl);
        }
        self.fetch.validate()
    }
}
