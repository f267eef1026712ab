//! Listening-history synchronization for Spotkov
//!
//! This crate keeps a local copy of a user's Last.fm scrobble history up to
//! date. The first sync downloads the whole history; later syncs only ask for
//! plays newer than the cached watermark and prepend them.
//!
//! # Features
//!
//! - **Paginated fetch**: 200 scrobbles per page, pages fetched concurrently
//!   in batches of at most 100
//! - **Retry**: each page is tried up to 4 times; a page that keeps failing
//!   contributes no songs instead of aborting the sync
//! - **Disk cache**: one bincode snapshot per user, replaced atomically
//! - **Autocompletion**: title or artist suggestions from the cached songs
//! - **Configuration extension**: API key and cache directory in `skconfig`
//!
//! # Example
//!
//! ```no_run
//! use skconfig::get_config;
//! use sklastfm::HistorySync;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = get_config();
//!     let sync = HistorySync::from_config(&config)?;
//!
//!     let songs = sync.sync("rj").await?;
//!     println!("{} plays", songs.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod complete;
pub mod config_ext;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod sync;

// Re-exports
pub use cache::HistoryCache;
pub use client::{HistoryQuery, HistorySource, LastFmClient, LastFmClientBuilder};
pub use complete::{best_matches, unique_songs, MatchField, DEFAULT_MATCH_LIMIT};
pub use config_ext::LastFmConfigExt;
pub use error::{Error, Result};
pub use fetcher::{FetchedPage, PageFetcher, MAX_PAGE_ATTEMPTS};
pub use models::{HistorySnapshot, RecentTracksResponse, Song};
pub use sync::{HistorySync, FAN_OUT_CAP, MAX_PAGES};
