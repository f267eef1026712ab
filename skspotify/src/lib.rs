//! Track resolution and playlist publication for Spotkov
//!
//! - [`TrackResolver`] turns `(artist, title)` songs into Spotify track ids,
//!   concurrently, through a shared [`TrackCache`]
//! - [`PlaylistWriter`] writes the resolved ids into the generated playlist,
//!   in chunks of 50
//! - [`SpotifyClient`] is the HTTP implementation of [`PlatformApi`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use skconfig::get_config;
//! use sklastfm::Song;
//! use skspotify::{PlaylistWriter, ResolutionCache, SpotifyClient, TrackResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = get_config();
//!     let api = Arc::new(SpotifyClient::from_config(&config)?);
//!     let cache = Arc::new(ResolutionCache::from_config(&config)?);
//!
//!     let resolver = TrackResolver::from_config(api.clone(), cache.clone(), &config)?;
//!     let ids = resolver.resolve_all(&[Song::new("Oasis", "Wonderwall")]).await;
//!
//!     let writer = PlaylistWriter::from_config(api, cache, &config)?;
//!     let user = writer.current_user_id().await?;
//!     let report = writer.publish(&user, &ids).await?;
//!     println!("{} tracks in {}", report.tracks_written, report.playlist_id);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod query;
pub mod resolver;
pub mod retry;
pub mod writer;

#[cfg(test)]
mod fake;

// Re-exports
pub use api::{PlatformApi, SpotifyClient, SpotifyClientBuilder};
pub use cache::{ResolutionCache, TrackCache};
pub use config_ext::SpotifyConfigExt;
pub use error::{Result, SpotifyError};
pub use models::{PlaylistSummary, SongKey, TrackId};
pub use query::{lower_and_strip_non_alphanumeric, search_query};
pub use resolver::TrackResolver;
pub use retry::RetryPolicy;
pub use writer::{PlaylistWriter, PublishReport, CHUNK_SIZE, DEFAULT_PLAYLIST_NAME};
