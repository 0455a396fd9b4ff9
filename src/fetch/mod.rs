//! Trend lookups against the external search service
//!
//! A [`TrendSource`] performs one lookup; the [`ParallelFetcher`] fans a batch
//! of queries out over a bounded number of concurrent lookups, applying a
//! per-request timeout and a bounded retry policy. Every query resolves to a
//! value or `None`; no single failure aborts the batch.

mod apify;
mod parallel;
mod retry;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use apify::ApifyClient;
pub use parallel::ParallelFetcher;
pub use retry::RetryPolicy;

/// Errors that can occur during a single lookup
#[derive(Debug, Error)]
pub enum FetchError {
    /// The lookup did not finish within the per-request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON
    #[error("Malformed response payload: {0}")]
    Payload(String),

    /// The source is temporarily unable to serve the lookup
    #[error("Trend source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Whether retrying the same lookup may succeed
    ///
    /// Timeouts, connection problems, rate limiting (429) and server errors
    /// (5xx) are transient; other client errors and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Unavailable(_) => true,
            FetchError::Request(e) => match e.status() {
                Some(status) => is_transient_status(status.as_u16()),
                None => !e.is_decode() && !e.is_builder(),
            },
            FetchError::Status { status, .. } => is_transient_status(*status),
            FetchError::Payload(_) => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Opaque API credential; never printed in full
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the auth header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Outcome of one query in a batch; `value` is `None` when the lookup failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub query: String,
    pub value: Option<Value>,
}

impl FetchResult {
    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// A service that can look up trend data for one query
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Value, FetchError>;
}
