//! On-disk cache of per-user history snapshots
//!
//! One bincode file per user, `{cache_dir}/{user}.bin`. Reads load the whole
//! file; writes go through a temporary file in the same directory which is
//! then renamed over the target, so an interrupted write never leaves a
//! truncated snapshot behind. Any read failure is reported to the caller,
//! which falls back to a full resync.

use crate::config_ext::LastFmConfigExt;
use crate::error::Result;
use crate::models::HistorySnapshot;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use skconfig::Config;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Bytes escaped in snapshot file names: everything but `[A-Za-z0-9_-]`
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

/// Per-user history cache
#[derive(Debug, Clone)]
pub struct HistoryCache {
    cache_dir: PathBuf,
}

impl HistoryCache {
    /// Create a cache rooted at `cache_dir` (created on first write)
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// Create a cache in the configured history directory
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.get_lastfm_history_cache_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of a user's snapshot file
    ///
    /// The user name is percent-encoded, so distinct users never share a
    /// file and no name can escape the cache directory.
    pub fn cache_path(&self, user: &str) -> PathBuf {
        let name = utf8_percent_encode(user, FILE_NAME);
        self.cache_dir.join(format!("{}.bin", name))
    }

    /// Load a user's snapshot
    ///
    /// Returns `Ok(None)` when no snapshot exists, an error when the file
    /// cannot be read or decoded.
    pub fn read(&self, user: &str) -> Result<Option<HistorySnapshot>> {
        let path = self.cache_path(user);

        if !path.exists() {
            debug!("History cache does not exist: {}", path.display());
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let snapshot: HistorySnapshot = bincode::deserialize(&bytes)?;

        debug!(
            "Loaded {} songs from {}",
            snapshot.len(),
            path.display()
        );
        Ok(Some(snapshot))
    }

    /// Overwrite a user's snapshot
    pub fn write(&self, user: &str, snapshot: &HistorySnapshot) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.cache_path(user);
        let bytes = bincode::serialize(snapshot)?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("Saved {} songs to {}", snapshot.len(), path.display());
        Ok(())
    }

    /// Remove a user's snapshot
    pub fn invalidate(&self, user: &str) -> Result<()> {
        let path = self.cache_path(user);

        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Invalidated history cache: {}", path.display());
        }

        Ok(())
    }
}
