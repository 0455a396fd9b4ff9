//! Apify Google Search Scraper client
//!
//! Runs the search actor synchronously for one query and returns the dataset
//! items it produced.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ApiToken, FetchError, TrendSource};

/// Synchronous run endpoint of the Google Search Scraper actor
const APIFY_ENDPOINT: &str =
    "https://api.apify.com/v2/acts/apify~google-search-scraper/run-sync-get-dataset-items";

/// Result pages requested per query (keeps each actor run short)
const MAX_PAGES_PER_QUERY: u32 = 1;

/// Longest error body kept in a `FetchError::Status`
const MAX_ERROR_BODY: usize = 200;

/// Builds the actor input for a query; hashtags are searched as plain phrases
fn search_input(query: &str) -> Value {
    let phrase = query.trim_start_matches('#').trim();
    json!({
        "queries": format!("trending hashtags for {}", phrase),
        "maxPagesPerQuery": MAX_PAGES_PER_QUERY,
        "languageCode": "en",
        "mobileResults": false,
        "includeUnfilteredResults": true,
    })
}

/// Client for looking up trending hashtags through Apify
#[derive(Debug, Clone)]
pub struct ApifyClient {
    client: Client,
    endpoint: String,
    token: ApiToken,
}

impl ApifyClient {
    /// Create a new ApifyClient with default settings
    pub fn new(token: ApiToken) -> Self {
        Self::with_client(Client::new(), token)
    }

    /// Create a new ApifyClient with a custom HTTP client
    pub fn with_client(client: Client, token: ApiToken) -> Self {
        Self {
            client,
            endpoint: APIFY_ENDPOINT.to_string(),
            token,
        }
    }

    /// Point the client at a different actor endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TrendSource for ApifyClient {
    async fn fetch(&self, query: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(&search_input(query))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| FetchError::Payload(e.to_string()))
    }
}
