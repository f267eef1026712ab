//! Access to the Spotify Web API
//!
//! `PlatformApi` lists the six operations the resolver and the playlist
//! writer need. `SpotifyClient` implements them over `reqwest` with a bearer
//! token obtained elsewhere (the OAuth exchange is not part of Spotkov).

use crate::config_ext::SpotifyConfigExt;
use crate::error::{Result, SpotifyError};
use crate::models::{
    CreatePlaylistRequest, CurrentUser, ErrorEnvelope, Paging, PlaylistSummary, SearchResponse,
    TrackId, TrackUris,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use skconfig::Config;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Web API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Playlists requested per listing page (API maximum)
const PLAYLIST_PAGE_LIMIT: u32 = 50;

/// Remote operations consumed by `TrackResolver` and `PlaylistWriter`
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Identifier of the user owning the token
    async fn current_user_id(&self) -> Result<String>;

    async fn list_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>>;

    async fn create_playlist(&self, user_id: &str, name: &str, public: bool)
        -> Result<PlaylistSummary>;

    /// Replace every track of a playlist (at most 100 ids)
    async fn replace_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()>;

    /// Append tracks to a playlist (at most 100 ids)
    async fn add_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()>;

    /// Best match for a search query, `None` when nothing matches
    async fn search_track(&self, query: &str) -> Result<Option<TrackId>>;
}

/// Spotify Web API client
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn builder(access_token: impl Into<String>) -> SpotifyClientBuilder {
        SpotifyClientBuilder::new(access_token)
    }

    /// Create a client with the configured access token
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.get_spotify_access_token()?;
        Self::builder(token).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = Self::check_status(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            SpotifyError::Json(e)
        })
    }

    async fn send_unit(&self, request: RequestBuilder) -> Result<()> {
        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        warn!("Spotify API error ({}): {}", code, message);
        Err(SpotifyError::from_status(code, message))
    }
}

#[async_trait]
impl PlatformApi for SpotifyClient {
    async fn current_user_id(&self) -> Result<String> {
        let user: CurrentUser = self.send_json(self.request(Method::GET, "/me")).await?;
        Ok(user.id)
    }

    async fn list_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>> {
        let endpoint = format!("/users/{}/playlists", user_id);
        let limit = PLAYLIST_PAGE_LIMIT.to_string();
        let mut playlists = Vec::new();
        let mut offset = 0u32;

        loop {
            let offset_param = offset.to_string();
            let page: Paging<PlaylistSummary> = self
                .send_json(
                    self.request(Method::GET, &endpoint)
                        .query(&[("limit", limit.as_str()), ("offset", offset_param.as_str())]),
                )
                .await?;

            let fetched = page.items.len() as u32;
            playlists.extend(page.items);

            if page.next.is_none() || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        Ok(playlists)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> Result<PlaylistSummary> {
        let endpoint = format!("/users/{}/playlists", user_id);
        self.send_json(
            self.request(Method::POST, &endpoint)
                .json(&CreatePlaylistRequest { name, public }),
        )
        .await
    }

    async fn replace_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()> {
        let endpoint = format!("/playlists/{}/tracks", playlist_id);
        self.send_unit(self.request(Method::PUT, &endpoint).json(&TrackUris::new(tracks)))
            .await
    }

    async fn add_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()> {
        let endpoint = format!("/playlists/{}/tracks", playlist_id);
        self.send_unit(self.request(Method::POST, &endpoint).json(&TrackUris::new(tracks)))
            .await
    }

    async fn search_track(&self, query: &str) -> Result<Option<TrackId>> {
        let response: SearchResponse = self
            .send_json(
                self.request(Method::GET, "/search")
                    .query(&[("q", query), ("type", "track"), ("limit", "1")]),
            )
            .await?;
        Ok(response.first_track_id())
    }
}

/// Builder for configuring a SpotifyClient
#[derive(Debug)]
pub struct SpotifyClientBuilder {
    access_token: String,
    base_url: String,
    timeout: Duration,
}

impl SpotifyClientBuilder {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the base URL (no trailing slash)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        if self.access_token.trim().is_empty() {
            return Err(SpotifyError::TokenRejected("access token is empty".into()));
        }

        let client = Client::builder().timeout(self.timeout).build()?;

        Ok(SpotifyClient {
            client,
            base_url: self.base_url,
            access_token: self.access_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = SpotifyClient::builder("token")
            .base_url("http://localhost:1234/v1/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn test_builder_rejects_empty_token() {
        let err = SpotifyClient::builder("").build().unwrap_err();
        assert!(err.needs_new_token());
    }
}
