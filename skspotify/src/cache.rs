//! Shared (artist, title) → track id cache
//!
//! One `ResolutionCache` serves every resolver task and every user of the
//! process. Lookups take a read lock, inserts a write lock, and neither is
//! held across a network call: two tasks missing the same key at the same
//! time both search and both insert the same id. Entries are never evicted
//! and a failed resolution is never recorded.
//!
//! The map is persisted as a single bincode file, written through a
//! temporary file and renamed into place.

use crate::config_ext::SpotifyConfigExt;
use crate::error::Result;
use crate::models::{SongKey, TrackId};
use async_trait::async_trait;
use skconfig::Config;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Cache consulted and filled by `TrackResolver`
#[async_trait]
pub trait TrackCache: Send + Sync {
    async fn get(&self, key: &SongKey) -> Option<TrackId>;

    async fn put(&self, key: SongKey, id: TrackId);

    /// Save the current content (no-op for purely in-memory caches)
    async fn persist(&self) -> Result<()>;
}

/// File-backed resolution cache
#[derive(Debug, Default)]
pub struct ResolutionCache {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<SongKey, TrackId>>,
}

impl ResolutionCache {
    /// Cache without a backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache stored at `path`
    ///
    /// A missing or unreadable file yields an empty cache; it will be
    /// rebuilt by later resolutions and overwritten on the next persist.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match read_entries(&path) {
            Ok(Some(entries)) => {
                info!(entries = entries.len(), path = %path.display(), "Loaded resolution cache");
                entries
            }
            Ok(None) => {
                debug!("Resolution cache does not exist: {}", path.display());
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Resolution cache unreadable, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// Load the cache from the configured path
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::load(config.get_spotify_resolution_cache_path()?))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TrackCache for ResolutionCache {
    async fn get(&self, key: &SongKey) -> Option<TrackId> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: SongKey, id: TrackId) {
        self.entries.write().await.insert(key, id);
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = {
            let entries = self.entries.read().await;
            bincode::serialize(&*entries)?
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!("Saved resolution cache to {}", path.display());
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Option<HashMap<SongKey, TrackId>>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(bincode::deserialize(&bytes)?))
}
