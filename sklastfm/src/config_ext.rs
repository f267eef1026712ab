//! Last.fm settings stored in the Spotkov configuration
//!
//! ```yaml
//! sources:
//!   lastfm:
//!     api_key: "..."
//!     cache_dir: cached-songs
//! ```
//!
//! The `LASTFM_KEY` environment variable takes precedence over the stored key.

use anyhow::{anyhow, Result};
use serde_yaml::Value;
use skconfig::Config;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "LASTFM_KEY";

/// Default history cache directory, relative to the config directory
pub const DEFAULT_HISTORY_CACHE_DIR: &str = "cached-songs";

/// Extension trait adding Last.fm settings to `skconfig::Config`
pub trait LastFmConfigExt {
    /// API key, from `LASTFM_KEY` or `sources.lastfm.api_key`
    fn get_lastfm_api_key(&self) -> Result<String>;

    fn set_lastfm_api_key(&self, api_key: &str) -> Result<()>;

    /// Absolute history cache directory (created if missing)
    fn get_lastfm_history_cache_dir(&self) -> Result<String>;

    fn set_lastfm_history_cache_dir(&self, directory: &str) -> Result<()>;
}

impl LastFmConfigExt for Config {
    fn get_lastfm_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.get_string(&["sources", "lastfm", "api_key"])
            .ok_or_else(|| anyhow!("No Last.fm API key: set {} or sources.lastfm.api_key", API_KEY_ENV))
    }

    fn set_lastfm_api_key(&self, api_key: &str) -> Result<()> {
        self.set_value(
            &["sources", "lastfm", "api_key"],
            Value::String(api_key.to_string()),
        )
    }

    fn get_lastfm_history_cache_dir(&self) -> Result<String> {
        self.get_managed_dir(&["sources", "lastfm", "cache_dir"], DEFAULT_HISTORY_CACHE_DIR)
    }

    fn set_lastfm_history_cache_dir(&self, directory: &str) -> Result<()> {
        self.set_managed_dir(&["sources", "lastfm", "cache_dir"], directory.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_history_cache_dir_defaults_under_config_dir() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        let cache_dir = config.get_lastfm_history_cache_dir()?;

        assert_eq!(cache_dir, dir.path().join("cached-songs").to_string_lossy());
        assert!(dir.path().join("cached-songs").is_dir());
        Ok(())
    }

    #[test]
    fn test_api_key_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        config.set_lastfm_api_key("abc123")?;
        assert_eq!(
            config.get_string(&["sources", "lastfm", "api_key"]).as_deref(),
            Some("abc123")
        );
        Ok(())
    }
}
