//! Incremental history synchronization
//!
//! `HistorySync::sync` brings a user's cached snapshot up to date:
//!
//! 1. read the cached snapshot; its watermark decides between an incremental
//!    sync and a full resync (missing, corrupt or empty cache)
//! 2. fetch page 1 to learn the total page count
//! 3. fetch the remaining pages concurrently, in batches of at most
//!    [`FAN_OUT_CAP`] pages, each batch joined before the next starts
//! 4. reverse the page order (page 1 holds the newest plays) and concatenate
//! 5. prepend the new songs to the cache (incremental) or replace it (full)
//! 6. persist, logging but tolerating a failed write
//!
//! A structured upstream failure on page 1 (a rate limit, say) degrades like
//! any other failed page. It only surfaces when nothing, cached or fetched,
//! is left to return.
//!
//! Each spawned page task owns exactly one slot of the page table. A task
//! that panics leaves its slot empty; it never takes its siblings down.

use crate::cache::HistoryCache;
use crate::client::{HistoryQuery, HistorySource, LastFmClient};
use crate::error::{Error, Result};
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::models::{HistorySnapshot, Song};
use skconfig::Config;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maximum number of page fetches in flight at once
pub const FAN_OUT_CAP: usize = 100;

/// Upper bound on the page count accepted from the API (10M plays)
pub const MAX_PAGES: usize = 50_000;

/// History synchronizer
pub struct HistorySync<S> {
    fetcher: Arc<PageFetcher<S>>,
    cache: HistoryCache,
    batch_size: usize,
}

impl HistorySync<LastFmClient> {
    /// Build a synchronizer from the configured API key and cache directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = LastFmClient::from_config(config)?;
        let cache = HistoryCache::from_config(config)?;
        Ok(Self::new(PageFetcher::new(client), cache))
    }
}

impl<S: HistorySource + 'static> HistorySync<S> {
    pub fn new(fetcher: PageFetcher<S>, cache: HistoryCache) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache,
            batch_size: FAN_OUT_CAP,
        }
    }

    /// Override the batch size (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn cache(&self) -> &HistoryCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &PageFetcher<S> {
        &self.fetcher
    }

    /// Synchronize and return the user's full history
    ///
    /// # Errors
    ///
    /// When the merged history is empty:
    ///
    /// - [`Error::Upstream`] if the API reported a structured failure for page 1
    /// - [`Error::NoHistory`] otherwise
    pub async fn sync(&self, user: &str) -> Result<Vec<Song>> {
        let cached = self.load_cached(user);
        let watermark = cached.watermark();
        let query = HistoryQuery::new(user, watermark);

        info!(
            user = %user,
            cached = cached.len(),
            from = query.from,
            "Synchronizing listening history"
        );

        let mut first = self.fetcher.fetch(&query, 1).await;
        let upstream = match first.error.take() {
            Some(err @ Error::Upstream { .. }) => {
                warn!(user = %user, error = %err, "Page 1 rejected upstream, keeping the cache");
                Some(err)
            }
            _ => None,
        };

        let total_pages = page_table_len(first.total_pages);
        let mut pages: Vec<Vec<Song>> = vec![Vec::new(); total_pages];
        pages[0] = first.songs;

        self.fetch_remaining(&query, &mut pages).await;

        // Page 1 is the newest; flip so the concatenation is oldest first
        pages.reverse();
        let fetched: Vec<Song> = pages.into_iter().flatten().collect();
        let new_songs = fetched.len();

        let snapshot = if query.is_incremental() && !cached.is_empty() {
            prepend_new(cached, fetched)
        } else {
            HistorySnapshot::new(fetched)
        };

        if let Err(e) = self.cache.write(user, &snapshot) {
            warn!(user = %user, error = %e, "Couldn't cache the songs");
        }

        if snapshot.is_empty() {
            return Err(upstream.unwrap_or_else(|| Error::NoHistory(user.to_string())));
        }

        info!(
            user = %user,
            pages = total_pages,
            fetched = new_songs,
            total = snapshot.len(),
            "History synchronized"
        );
        Ok(snapshot.into_songs())
    }

    fn load_cached(&self, user: &str) -> HistorySnapshot {
        match self.cache.read(user) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => HistorySnapshot::default(),
            Err(e) => {
                warn!(user = %user, error = %e, "History cache unreadable, regenerating");
                HistorySnapshot::default()
            }
        }
    }

    /// Fetch pages 2..=N into their slots, batch by batch
    ///
    /// Batches follow page boundaries that are multiples of the batch size:
    /// `2..=100`, `101..=200`, ...
    async fn fetch_remaining(&self, query: &HistoryQuery, pages: &mut [Vec<Song>]) {
        let total = pages.len();
        let mut next = 2;

        while next <= total {
            let batch_end = ((next - 1) / self.batch_size + 1) * self.batch_size;
            let batch_end = batch_end.min(total);
            debug!(first = next, last = batch_end, "Fetching page batch");

            let handles: Vec<(usize, JoinHandle<FetchedPage>)> = (next..=batch_end)
                .map(|page| {
                    let fetcher = Arc::clone(&self.fetcher);
                    let query = query.clone();
                    let page_no = u32::try_from(page).unwrap_or(u32::MAX);
                    let handle = tokio::spawn(async move { fetcher.fetch(&query, page_no).await });
                    (page, handle)
                })
                .collect();

            for (page, handle) in handles {
                match handle.await {
                    Ok(fetched) => pages[page - 1] = fetched.songs,
                    Err(e) => warn!(page, error = %e, "Page task failed, leaving a gap"),
                }
            }

            next = batch_end + 1;
        }
    }
}

/// Number of slots in the page table for a reported page count
///
/// At least one slot (page 1), at most [`MAX_PAGES`].
fn page_table_len(reported: u32) -> usize {
    let pages = usize::try_from(reported).unwrap_or(usize::MAX).max(1);
    if pages > MAX_PAGES {
        warn!(reported, cap = MAX_PAGES, "Implausible page count, clamping");
        return MAX_PAGES;
    }
    pages
}

/// Place newly fetched songs before the cached ones
///
/// Songs already present in the cache (same artist, title and play time)
/// are skipped.
fn prepend_new(cached: HistorySnapshot, fetched: Vec<Song>) -> HistorySnapshot {
    let mut merged: Vec<Song> = {
        let known: HashSet<&Song> = cached.songs.iter().collect();
        fetched.into_iter().filter(|s| !known.contains(s)).collect()
    };
    merged.extend(cached.into_songs());
    HistorySnapshot::new(merged)
}
