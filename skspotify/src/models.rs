//! Data models for the Spotify Web API
//!
//! Domain types (`TrackId`, `SongKey`) come first, then the subset of the
//! Web API payloads Spotkov reads or writes.

use serde::{Deserialize, Serialize};
use sklastfm::Song;
use std::fmt;

/// Spotify track identifier (base-62 id, not the URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `spotify:track:<id>`, the form playlist endpoints expect
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolution cache key: verbatim (artist, title), case-sensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongKey {
    pub artist: String,
    pub title: String,
}

impl SongKey {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

impl From<&Song> for SongKey {
    fn from(song: &Song) -> Self {
        Self::new(song.artist.clone(), song.title.clone())
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Generic paging object
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: u32,
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next: None,
            total: 0,
        }
    }
}

/// Playlist as listed by `GET /users/{id}/playlists`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `GET /search?type=track`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Paging<TrackObject>,
}

impl SearchResponse {
    /// Identifier of the best match, if any
    pub fn first_track_id(&self) -> Option<TrackId> {
        self.tracks
            .items
            .iter()
            .find_map(|t| t.id.as_deref().filter(|id| !id.is_empty()))
            .map(TrackId::new)
    }
}

/// Track object (only the fields Spotkov reads)
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    /// Local files have no id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /users/{id}/playlists`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub public: bool,
}

/// Body of the replace/append track endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TrackUris {
    pub uris: Vec<String>,
}

impl TrackUris {
    pub fn new(tracks: &[TrackId]) -> Self {
        Self {
            uris: tracks.iter().map(TrackId::uri).collect(),
        }
    }
}

/// `{"error": {"status": 401, "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}
