//! Upstream stats access.
//!
//! [`StatsSource`] is the only capability the report pipeline consumes:
//! fetch the cumulative stats of one account for one query window.
//! [`HttpStatsSource`] implements it against the stats proxy HTTP API.
//! Errors are returned as-is; nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::models::{Snapshot, TimeWindow};

/// Errors that can occur while fetching a snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Access token rejected or expired")]
    Unauthorized,

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of cumulative stat snapshots.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the stats of `account_id` accumulated over `window`.
    async fn fetch_snapshot(
        &self,
        account_id: &str,
        window: TimeWindow,
    ) -> Result<Snapshot, FetchError>;
}

/// Configuration for the HTTP stats source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL of the stats proxy service
    pub base_url: String,

    /// Bearer token from the external OAuth exchange
    pub access_token: Option<String>,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://statsproxy-public-service-live.ol.epicgames.com".to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("stats-window/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Stats proxy client.
pub struct HttpStatsSource {
    client: Client,
    base_url: Url,
}

impl HttpStatsSource {
    /// Create a new source with the given configuration.
    pub fn new(config: HttpSourceConfig) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("stats-window/0.1.0")),
        );
        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| FetchError::Unauthorized)?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// URL of the stats query for one account and window.
    fn snapshot_url(&self, account_id: &str, window: TimeWindow) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["statsproxy", "api", "statsv2", "account", account_id]);
        url.query_pairs_mut()
            .append_pair("startTime", &window.start_time.to_string())
            .append_pair("endTime", &window.end_time.to_string());
        Ok(url)
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    fn name(&self) -> &'static str {
        "statsproxy"
    }

    async fn fetch_snapshot(
        &self,
        account_id: &str,
        window: TimeWindow,
    ) -> Result<Snapshot, FetchError> {
        let url = self.snapshot_url(account_id, window)?;
        info!(
            account_id,
            start = window.start_time,
            end = window.end_time,
            "Fetching stats snapshot"
        );

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        let snapshot: Snapshot = serde_json::from_slice(&body)?;
        debug!(keys = snapshot.stats.len(), "Snapshot received");

        Ok(snapshot)
    }
}
