//! Concurrent song → track id resolution
//!
//! `resolve_all` spawns one task per song and gates them with a semaphore.
//! Each task checks the cache, otherwise searches with retry and records
//! the first match. Output slots line up with the input songs; a song that
//! could not be resolved (no match, retries exhausted, task panicked) yields
//! `None` and leaves the cache untouched.

use crate::api::PlatformApi;
use crate::cache::TrackCache;
use crate::config_ext::SpotifyConfigExt;
use crate::error::Result;
use crate::models::{SongKey, TrackId};
use crate::query::search_query;
use crate::retry::RetryPolicy;
use skconfig::Config;
use sklastfm::Song;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default number of songs resolved at once
pub const DEFAULT_CONCURRENCY: usize = 200;

/// Resolves songs to platform track ids
pub struct TrackResolver<A, C> {
    api: Arc<A>,
    cache: Arc<C>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl<A, C> TrackResolver<A, C>
where
    A: PlatformApi + 'static,
    C: TrackCache + 'static,
{
    pub fn new(api: Arc<A>, cache: Arc<C>) -> Self {
        Self {
            api,
            cache,
            retry: RetryPolicy::SEARCH,
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        }
    }

    /// Resolver using the configured concurrency limit
    pub fn from_config(api: Arc<A>, cache: Arc<C>, config: &Config) -> Result<Self> {
        let limit = config.get_spotify_resolver_concurrency()?;
        Ok(Self::new(api, cache).with_concurrency(limit))
    }

    /// Maximum number of songs resolved at once (at least 1)
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Resolve every song, keeping input order
    pub async fn resolve_all(&self, songs: &[Song]) -> Vec<Option<TrackId>> {
        let handles: Vec<_> = songs
            .iter()
            .map(|song| {
                let key = SongKey::from(song);
                let api = Arc::clone(&self.api);
                let cache = Arc::clone(&self.cache);
                let permits = Arc::clone(&self.permits);
                let retry = self.retry;

                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok()?;
                    resolve_one(api.as_ref(), cache.as_ref(), retry, key).await
                })
            })
            .collect();

        let mut resolved = Vec::with_capacity(handles.len());
        for (song, handle) in songs.iter().zip(handles) {
            match handle.await {
                Ok(id) => resolved.push(id),
                Err(e) => {
                    warn!(artist = %song.artist, title = %song.title, error = %e, "Resolution task failed");
                    resolved.push(None);
                }
            }
        }

        let found = resolved.iter().filter(|id| id.is_some()).count();
        info!(songs = songs.len(), resolved = found, "Resolved tracks");
        resolved
    }
}

async fn resolve_one<A, C>(api: &A, cache: &C, retry: RetryPolicy, key: SongKey) -> Option<TrackId>
where
    A: PlatformApi + ?Sized,
    C: TrackCache + ?Sized,
{
    if let Some(id) = cache.get(&key).await {
        debug!(artist = %key.artist, title = %key.title, id = %id, "Resolved from cache");
        return Some(id);
    }

    let query = search_query(&key.title, &key.artist);
    debug!(query = %query, "Searching track");

    match retry.run("track search", || api.search_track(&query)).await {
        Ok(Some(id)) => {
            cache.put(key, id.clone()).await;
            Some(id)
        }
        Ok(None) => {
            debug!(query = %query, "No match");
            None
        }
        Err(e) => {
            warn!(artist = %key.artist, title = %key.title, error = %e, "Giving up on track search");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolutionCache;
    use crate::fake::FakePlatform;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn fast() -> RetryPolicy {
        RetryPolicy::SEARCH.with_delay(Duration::from_millis(1))
    }

    fn resolver(api: FakePlatform) -> TrackResolver<FakePlatform, ResolutionCache> {
        TrackResolver::new(Arc::new(api), Arc::new(ResolutionCache::in_memory())).with_retry(fast())
    }

    #[tokio::test]
    async fn test_output_is_aligned_with_input() {
        let resolver = resolver(
            FakePlatform::new("u")
                .with_track("Oasis", "Wonderwall!!", "ww")
                .with_track("Blur", "Song 2", "s2"),
        );
        let songs = vec![
            Song::new("Oasis", "Wonderwall!!"),
            Song::new("Nobody", "Unknown"),
            Song::new("Blur", "Song 2"),
        ];

        let ids = resolver.resolve_all(&songs).await;

        assert_eq!(
            ids,
            vec![Some(TrackId::new("ww")), None, Some(TrackId::new("s2"))]
        );
    }

    #[tokio::test]
    async fn test_second_resolution_hits_cache() {
        let resolver = resolver(FakePlatform::new("u").with_track("Blur", "Song 2", "s2"));
        let songs = vec![Song::new("Blur", "Song 2")];

        let first = resolver.resolve_all(&songs).await;
        let searches = resolver.api.searches.load(Ordering::SeqCst);
        let second = resolver.resolve_all(&songs).await;

        assert_eq!(first, second);
        assert_eq!(searches, 1);
        assert_eq!(resolver.api.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_succeeds_on_tenth_attempt_and_is_cached() {
        let api = FakePlatform::new("u").with_track("Oasis", "Wonderwall", "ww");
        api.fail_search("Oasis", "Wonderwall", 9);
        let resolver = resolver(api);

        let ids = resolver.resolve_all(&[Song::new("Oasis", "Wonderwall")]).await;

        assert_eq!(ids, vec![Some(TrackId::new("ww"))]);
        assert_eq!(resolver.api.searches.load(Ordering::SeqCst), 10);
        assert_eq!(
            resolver.cache().get(&SongKey::new("Oasis", "Wonderwall")).await,
            Some(TrackId::new("ww"))
        );
    }

    #[tokio::test]
    async fn test_exhausted_search_is_not_cached() {
        let api = FakePlatform::new("u").with_track("Oasis", "Wonderwall", "ww");
        api.fail_search("Oasis", "Wonderwall", 10);
        let resolver = resolver(api);
        let songs = [Song::new("Oasis", "Wonderwall")];

        assert_eq!(resolver.resolve_all(&songs).await, vec![None]);
        assert!(resolver.cache().is_empty().await);

        // retried fresh on the next call
        assert_eq!(
            resolver.resolve_all(&songs).await,
            vec![Some(TrackId::new("ww"))]
        );
        assert_eq!(resolver.api.searches.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_panicking_task_yields_none_for_that_song_only() {
        let mut api = FakePlatform::new("u")
            .with_track("Blur", "Song 2", "s2")
            .with_track("Pulp", "Common People", "cp");
        api.panic_on = Some(search_query("Song 2", "Blur"));
        let resolver = resolver(api);

        let ids = resolver
            .resolve_all(&[Song::new("Blur", "Song 2"), Song::new("Pulp", "Common People")])
            .await;

        assert_eq!(ids, vec![None, Some(TrackId::new("cp"))]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut api = FakePlatform::new("u");
        api.search_delay = Duration::from_millis(5);
        let songs: Vec<Song> = (0..40).map(|i| Song::new("Artist", format!("Song {}", i))).collect();
        let resolver = resolver(api).with_concurrency(4);

        let ids = resolver.resolve_all(&songs).await;

        assert_eq!(ids.len(), 40);
        assert!(resolver.api.max_in_flight.load(Ordering::SeqCst) <= 4);
        assert_eq!(resolver.api.searches.load(Ordering::SeqCst), 40);
    }

    #[tokio::test]
    async fn test_cache_key_is_case_sensitive() {
        let resolver = resolver(
            FakePlatform::new("u")
                .with_track("Oasis", "Wonderwall", "ww"),
        );
        resolver.resolve_all(&[Song::new("Oasis", "Wonderwall")]).await;
        resolver.resolve_all(&[Song::new("OASIS", "wonderwall")]).await;

        // same normalized query, distinct cache keys
        assert_eq!(resolver.api.searches.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cache().len().await, 2);
    }
}
