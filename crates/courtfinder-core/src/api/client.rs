//! HTTP client for the slot lookup backend.
//!
//! The backend takes one JSON POST per venue and answers with the venue's
//! booking page HTML, fetched on our behalf with the user's ActiveSG cookie.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::VenueId;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// The backend proxies a slow upstream site; 30s keeps a stuck venue from
/// holding the whole search open.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Request body for one venue lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueQuery {
    pub venue: VenueId,
    /// Unix seconds of local midnight on the search date
    pub time: i64,
    /// ActiveSG session cookie, forwarded untouched
    pub cookie: String,
}

/// Source of raw venue pages. The dispatcher only talks to this trait.
#[async_trait]
pub trait VenueBackend: Send + Sync {
    /// Fetch the booking page HTML for one venue.
    async fn fetch_venue(&self, query: &VenueQuery) -> Result<String, ApiError>;
}

/// Backend client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
    max_retries: u32,
}

impl BackendClient {
    /// Create a client for `endpoint` with the default timeout and retries
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        Self::build(
            endpoint.into(),
            DEFAULT_REQUEST_TIMEOUT_SECS,
            DEFAULT_MAX_RATE_LIMIT_RETRIES,
        )
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::build(
            config.endpoint.clone(),
            config.request_timeout_secs,
            config.max_rate_limit_retries,
        )
    }

    fn build(endpoint: String, timeout_secs: u64, max_retries: u32) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post_for_text<B: Serialize + Sync>(&self, body: &B) -> Result<String, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .header(header::CONTENT_TYPE, "application/json")
                .json(body)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response.text().await?),
                None => {
                    retries += 1;
                    if retries > self.max_retries {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %self.endpoint, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }
}

#[async_trait]
impl VenueBackend for BackendClient {
    async fn fetch_venue(&self, query: &VenueQuery) -> Result<String, ApiError> {
        debug!(venue = %query.venue, time = query.time, "Fetching venue page");
        let html = self.post_for_text(query).await?;
        debug!(venue = %query.venue, bytes = html.len(), "Venue page received");
        Ok(html)
    }
}
