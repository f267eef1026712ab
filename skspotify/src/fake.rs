//! In-memory `PlatformApi` used by the unit tests

use crate::api::PlatformApi;
use crate::error::{Result, SpotifyError};
use crate::models::{PlaylistSummary, TrackId};
use crate::query::search_query;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    CurrentUser,
    ListPlaylists(String),
    CreatePlaylist(String),
    Replace(String, Vec<TrackId>),
    Add(String, Vec<TrackId>),
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    pub user_id: String,
    /// search query → id
    pub catalog: HashMap<String, TrackId>,
    /// search query → failures left before answering
    pub search_failures: Mutex<HashMap<String, u32>>,
    /// a search for this query panics
    pub panic_on: Option<String>,
    pub search_delay: Duration,
    pub user_failures: AtomicU32,
    pub replace_failures: AtomicU32,
    pub add_failures: AtomicU32,
    /// every append after this many successful ones fails
    pub add_limit: Option<usize>,
    pub playlists: Mutex<Vec<PlaylistSummary>>,
    pub contents: Mutex<HashMap<String, Vec<TrackId>>>,
    /// successful calls, in order
    pub calls: Mutex<Vec<Call>>,
    pub searches: AtomicUsize,
    pub write_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakePlatform {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// Make `title` by `artist` findable as `id`
    pub fn with_track(mut self, artist: &str, title: &str, id: &str) -> Self {
        self.catalog
            .insert(search_query(title, artist), TrackId::new(id));
        self
    }

    pub fn with_playlist(self, id: &str, name: &str) -> Self {
        self.playlists
            .lock()
            .unwrap()
            .push(PlaylistSummary {
                id: id.to_string(),
                name: name.to_string(),
            });
        self
    }

    pub fn fail_search(&self, artist: &str, title: &str, times: u32) {
        self.search_failures
            .lock()
            .unwrap()
            .insert(search_query(title, artist), times);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Replace(..) | Call::Add(..)))
            .collect()
    }

    pub fn contents_of(&self, playlist_id: &str) -> Vec<TrackId> {
        self.contents
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn current_user_id(&self) -> Result<String> {
        if Self::take_failure(&self.user_failures) {
            return Err(SpotifyError::from_status(502, "bad gateway"));
        }
        self.record(Call::CurrentUser);
        Ok(self.user_id.clone())
    }

    async fn list_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>> {
        self.record(Call::ListPlaylists(user_id.to_string()));
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        _public: bool,
    ) -> Result<PlaylistSummary> {
        self.record(Call::CreatePlaylist(name.to_string()));
        let playlist = PlaylistSummary {
            id: format!("{}-playlist", user_id),
            name: name.to_string(),
        };
        self.playlists.lock().unwrap().push(playlist.clone());
        Ok(playlist)
    }

    async fn replace_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.replace_failures) {
            return Err(SpotifyError::from_status(500, "replace failed"));
        }
        self.record(Call::Replace(playlist_id.to_string(), tracks.to_vec()));
        self.contents
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), tracks.to_vec());
        Ok(())
    }

    async fn add_tracks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let adds = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Add(..)))
            .count();
        if self.add_limit.is_some_and(|limit| adds >= limit) || Self::take_failure(&self.add_failures)
        {
            return Err(SpotifyError::from_status(500, "append failed"));
        }
        self.record(Call::Add(playlist_id.to_string(), tracks.to_vec()));
        self.contents
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend_from_slice(tracks);
        Ok(())
    }

    async fn search_track(&self, query: &str) -> Result<Option<TrackId>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(query) {
            panic!("unexpected payload for {}", query);
        }

        let failing = {
            let mut failures = self.search_failures.lock().unwrap();
            match failures.get_mut(query) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if failing {
            return Err(SpotifyError::Throttled);
        }

        Ok(self.catalog.get(query).cloned())
    }
}
