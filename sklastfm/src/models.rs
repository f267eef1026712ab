//! Data models for listening history
//!
//! `Song` and `HistorySnapshot` are the domain types shared with the rest of
//! the workspace. The `Raw*` / `RecentTracks*` types mirror the JSON payload
//! of `user.getrecenttracks` and are deliberately lenient: every field has a
//! default, numeric fields accept either strings or numbers, and the
//! "now playing" marker is read through an untyped value so an unexpected
//! shape reads as "not playing" instead of failing the page.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Domain types
// ============================================================================

/// A single scrobbled song
///
/// Identity for caching and resolution is the verbatim `(artist, title)`
/// pair; the timestamp only distinguishes plays of the same song.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Song {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Song {
    /// Create a song without a play timestamp
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            timestamp: None,
        }
    }

    /// Set the play timestamp from unix seconds (non-positive values mean "unknown")
    pub fn played_at(mut self, unix_secs: i64) -> Self {
        self.timestamp = timestamp_from_unix(unix_secs);
        self
    }

    /// Unix seconds of the play, 0 when unknown
    pub fn unix_time(&self) -> i64 {
        self.timestamp.map(|t| t.timestamp()).unwrap_or(0)
    }
}

/// Ordered song history of one user, oldest play first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub songs: Vec<Song>,
}

impl HistorySnapshot {
    pub fn new(songs: Vec<Song>) -> Self {
        Self { songs }
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Synchronization watermark: the first known play time in snapshot order
    ///
    /// Songs without a timestamp are skipped. `None` means a full resync.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.songs
            .iter()
            .filter_map(|s| s.timestamp)
            .find(|t| t.timestamp() > 0)
    }

    pub fn into_songs(self) -> Vec<Song> {
        self.songs
    }
}

fn timestamp_from_unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

// ============================================================================
// Wire types (user.getrecenttracks)
// ============================================================================

/// Top-level response of `user.getrecenttracks`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTracksResponse {
    #[serde(rename = "recenttracks", alias = "recentTracks", default)]
    pub recent_tracks: RecentTracks,
}

/// Track list plus pagination metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTracks {
    #[serde(rename = "track", default, deserialize_with = "one_or_many")]
    pub tracks: Vec<RawTrack>,
    #[serde(rename = "@attr", default)]
    pub attr: PageAttr,
}

/// Pagination metadata (`@attr`); the API sends every number as a string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageAttr {
    #[serde(default)]
    pub user: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: u64,
    #[serde(rename = "perPage", default, deserialize_with = "lenient_u64")]
    pub per_page: u64,
    #[serde(rename = "totalPages", default, deserialize_with = "lenient_u64")]
    pub total_pages: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
}

/// One entry of the track list, newest first
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub artist: TextField,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub album: TextField,
    #[serde(default)]
    pub date: Option<TrackDate>,
    #[serde(rename = "@attr", default)]
    pub attr: Option<Value>,
}

/// `{"#text": "..."}` wrapper (extended responses use `name` instead)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextField {
    #[serde(rename = "#text", default)]
    pub text: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl TextField {
    pub fn value(&self) -> &str {
        if self.text.is_empty() {
            self.name.as_deref().unwrap_or_default()
        } else {
            &self.text
        }
    }
}

/// Play date of a finished scrobble
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackDate {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub uts: i64,
    #[serde(rename = "#text", default)]
    pub text: String,
}

impl RawTrack {
    /// Whether this entry is flagged as currently playing
    ///
    /// Accepts `"true"` or `true`; any other shape counts as not playing.
    pub fn is_now_playing(&self) -> bool {
        match self.attr.as_ref().and_then(|attr| attr.get("nowplaying")) {
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    pub fn into_song(self) -> Song {
        let timestamp = self.date.and_then(|d| timestamp_from_unix(d.uts));
        Song {
            artist: self.artist.value().to_string(),
            title: self.name,
            timestamp,
        }
    }
}

/// Structured error body: `{"error": 6, "message": "User not found"}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: u32,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// The API collapses a one-element track list into a bare object
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<RawTrack>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<RawTrack>),
        One(Box<RawTrack>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(tracks)) => tracks,
        Some(OneOrMany::One(track)) => vec![*track],
        None => Vec::new(),
    })
}
