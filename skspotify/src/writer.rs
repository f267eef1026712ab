//! Playlist publication
//!
//! `publish` writes a resolved track list into the user's generated
//! playlist, creating it on first use. Lists of up to [`CHUNK_SIZE`] tracks
//! go out in one "replace" call that is not retried. Longer lists are split
//! in chunks: the first replaces the playlist content, the others are
//! appended, and every chunk is retried under [`RetryPolicy::CHUNK`]. A chunk
//! that exhausts its attempts aborts the publication; chunks already written
//! stay on the playlist.

use crate::api::PlatformApi;
use crate::cache::TrackCache;
use crate::config_ext::SpotifyConfigExt;
use crate::error::{Result, SpotifyError};
use crate::models::TrackId;
use crate::retry::RetryPolicy;
use skconfig::Config;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Track ids per playlist write call
pub const CHUNK_SIZE: usize = 50;

/// Name of the playlist Spotkov owns
pub const DEFAULT_PLAYLIST_NAME: &str = "Generated by Spotkov";

/// Outcome of a successful publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub playlist_id: String,
    /// The playlist did not exist before this publication
    pub created: bool,
    pub tracks_written: usize,
    /// Successful replace/append calls
    pub write_calls: usize,
}

/// Publishes resolved tracks to the generated playlist
pub struct PlaylistWriter<A, C> {
    api: Arc<A>,
    cache: Arc<C>,
    playlist_name: String,
    chunk_retry: RetryPolicy,
    user_retry: RetryPolicy,
}

impl<A, C> PlaylistWriter<A, C>
where
    A: PlatformApi,
    C: TrackCache,
{
    pub fn new(api: Arc<A>, cache: Arc<C>) -> Self {
        Self {
            api,
            cache,
            playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
            chunk_retry: RetryPolicy::CHUNK,
            user_retry: RetryPolicy::CURRENT_USER,
        }
    }

    /// Writer targeting the configured playlist name
    pub fn from_config(api: Arc<A>, cache: Arc<C>, config: &Config) -> Result<Self> {
        let name = config.get_spotify_playlist_name()?;
        Ok(Self::new(api, cache).with_playlist_name(name))
    }

    pub fn with_playlist_name(mut self, name: impl Into<String>) -> Self {
        self.playlist_name = name.into();
        self
    }

    pub fn with_chunk_retry(mut self, retry: RetryPolicy) -> Self {
        self.chunk_retry = retry;
        self
    }

    pub fn with_user_retry(mut self, retry: RetryPolicy) -> Self {
        self.user_retry = retry;
        self
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    /// Identifier of the token owner, retried under [`RetryPolicy::CURRENT_USER`]
    pub async fn current_user_id(&self) -> Result<String> {
        self.user_retry
            .run("current user lookup", || self.api.current_user_id())
            .await
            .map_err(|e| {
                warn!(error = %e, "Could not retrieve the current user");
                e
            })
    }

    /// Publish `resolved` (unresolved entries are skipped) to `user_id`'s playlist
    ///
    /// On success the resolution cache is persisted.
    pub async fn publish(&self, user_id: &str, resolved: &[Option<TrackId>]) -> Result<PublishReport> {
        let tracks: Vec<TrackId> = resolved.iter().flatten().cloned().collect();
        debug!(
            requested = resolved.len(),
            resolved = tracks.len(),
            "Publishing playlist"
        );

        let (playlist_id, created) = self.find_or_create(user_id).await?;

        let write_calls = if tracks.len() <= CHUNK_SIZE {
            self.api
                .replace_tracks(&playlist_id, &tracks)
                .await
                .map_err(|e| {
                    SpotifyError::Publish(format!(
                        "couldn't clear and update {}, no changes have been made: {}",
                        self.playlist_name, e
                    ))
                })?;
            1
        } else {
            self.write_chunks(&playlist_id, &tracks).await?
        };

        if let Err(e) = self.cache.persist().await {
            warn!(error = %e, "Couldn't save the resolution cache");
        }

        info!(
            playlist = %self.playlist_name,
            playlist_id = %playlist_id,
            tracks = tracks.len(),
            "Successfully published the playlist"
        );

        Ok(PublishReport {
            playlist_id,
            created,
            tracks_written: tracks.len(),
            write_calls,
        })
    }

    async fn find_or_create(&self, user_id: &str) -> Result<(String, bool)> {
        let playlists = self.api.list_playlists(user_id).await.map_err(|e| {
            warn!(user = %user_id, error = %e, "Couldn't retrieve the playlists");
            e
        })?;

        if let Some(existing) = playlists.iter().find(|p| p.name == self.playlist_name) {
            debug!(playlist_id = %existing.id, "Reusing playlist");
            return Ok((existing.id.clone(), false));
        }

        let created = self
            .api
            .create_playlist(user_id, &self.playlist_name, false)
            .await?;
        info!(playlist_id = %created.id, name = %self.playlist_name, "Created playlist");
        Ok((created.id, true))
    }

    async fn write_chunks(&self, playlist_id: &str, tracks: &[TrackId]) -> Result<usize> {
        let mut calls = 0;

        for (index, chunk) in tracks.chunks(CHUNK_SIZE).enumerate() {
            let outcome = if index == 0 {
                self.chunk_retry
                    .run("playlist replace", || self.api.replace_tracks(playlist_id, chunk))
                    .await
            } else {
                self.chunk_retry
                    .run("playlist append", || self.api.add_tracks(playlist_id, chunk))
                    .await
            };

            if let Err(e) = outcome {
                let written = index * CHUNK_SIZE;
                warn!(chunk = index, written, error = %e, "Giving up on playlist chunk");
                let message = if index == 0 {
                    format!("couldn't clear and update {}, no changes have been made", self.playlist_name)
                } else {
                    format!("adding some tracks failed, the playlist contains {} tracks", written)
                };
                return Err(SpotifyError::Publish(message));
            }

            calls += 1;
            debug!(chunk = index, size = chunk.len(), "Wrote playlist chunk");
        }

        Ok(calls)
    }
}
