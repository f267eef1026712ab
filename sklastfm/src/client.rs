//! HTTP client for the Last.fm recent-tracks endpoint
//!
//! `HistorySource` is the seam between the sync engine and the network:
//! `LastFmClient` implements it over `reqwest`, tests implement it in memory.
//!
//! # Example
//!
//! ```no_run
//! use sklastfm::{HistoryQuery, HistorySource, LastFmClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LastFmClient::builder("my-api-key").build()?;
//!     let page = client.recent_tracks(&HistoryQuery::full("rj"), 1).await?;
//!     println!("{} pages", page.recent_tracks.attr.total_pages);
//!     Ok(())
//! }
//! ```

use crate::config_ext::LastFmConfigExt;
use crate::error::{Error, Result};
use crate::models::{ApiErrorBody, RecentTracksResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use skconfig::Config;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Last.fm API endpoint
pub const DEFAULT_BASE_URL: &str = "http://ws.audioscrobbler.com/2.0/";

/// Per-request timeout (5 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "Spotkov/0.1 (sklastfm)";

/// API method returning a user's scrobbles
pub const RECENT_TRACKS_METHOD: &str = "user.getrecenttracks";

/// Scrobbles per page (API maximum)
pub const PAGE_LIMIT: u32 = 200;

/// Parameters shared by every page request of one sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub user: String,
    /// Lower bound in unix seconds, 0 for the whole history
    pub from: i64,
}

impl HistoryQuery {
    /// Query for plays strictly after `watermark` (whole history when `None`)
    pub fn new(user: impl Into<String>, watermark: Option<DateTime<Utc>>) -> Self {
        let from = watermark
            .map(|t| t.timestamp())
            .filter(|t| *t > 0)
            .map(|t| t + 1)
            .unwrap_or(0);
        Self {
            user: user.into(),
            from,
        }
    }

    /// Query for the whole history
    pub fn full(user: impl Into<String>) -> Self {
        Self::new(user, None)
    }

    pub fn is_incremental(&self) -> bool {
        self.from > 0
    }
}

/// Source of paginated listening history
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch one page (1-based) of recent tracks, newest first
    async fn recent_tracks(&self, query: &HistoryQuery, page: u32) -> Result<RecentTracksResponse>;
}

/// Last.fm HTTP client
///
/// Connections are never reused: every request (and so every retry)
/// goes out over a fresh connection with a 5 second timeout.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl LastFmClient {
    /// Create a builder for the given API key
    pub fn builder(api_key: impl Into<String>) -> LastFmClientBuilder {
        LastFmClientBuilder::new(api_key)
    }

    /// Create a client using the API key from the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_lastfm_api_key()?;
        Self::builder(api_key).build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_page(&self, query: &HistoryQuery, page: u32) -> Result<RecentTracksResponse> {
        let limit = PAGE_LIMIT.to_string();
        let from = query.from.to_string();
        let page = page.to_string();
        let params = [
            ("method", RECENT_TRACKS_METHOD),
            ("user", query.user.as_str()),
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
            ("from", from.as_str()),
            ("format", "json"),
            ("page", page.as_str()),
        ];

        debug!(user = %query.user, from = query.from, page = %page, "GET recent tracks");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Structured failures come back with or without an error status
        if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text) {
            warn!(code = body.error, message = %body.message, "Last.fm API error");
            return Err(Error::Upstream {
                code: body.error,
                message: body.message,
            });
        }

        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl HistorySource for LastFmClient {
    async fn recent_tracks(&self, query: &HistoryQuery, page: u32) -> Result<RecentTracksResponse> {
        self.get_page(query, page).await
    }
}

/// Builder for configuring a LastFmClient
#[derive(Debug)]
pub struct LastFmClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl LastFmClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<LastFmClient> {
        if self.api_key.trim().is_empty() {
            return Err(Error::other("Last.fm API key is empty"));
        }

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(LastFmClient {
            client,
            base_url: self.base_url,
            api_key: self.api_key,
            timeout: self.timeout,
        })
    }
}
