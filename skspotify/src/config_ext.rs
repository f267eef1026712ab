//! Spotify settings stored in the Spotkov configuration
//!
//! ```yaml
//! sources:
//!   spotify:
//!     access_token: ""
//!     resolution_cache: songIDs.bin
//!     playlist_name: Generated by Spotkov
//!     resolver_concurrency: 200
//! ```

use crate::resolver::DEFAULT_CONCURRENCY;
use crate::writer::DEFAULT_PLAYLIST_NAME;
use anyhow::{anyhow, Result};
use serde_yaml::Value;
use skconfig::Config;
use std::path::PathBuf;

/// Environment variable holding the access token
pub const ACCESS_TOKEN_ENV: &str = "SPOTIFY_TOKEN";

/// Default resolution cache file, relative to the config directory
pub const DEFAULT_RESOLUTION_CACHE: &str = "songIDs.bin";

/// Extension trait adding Spotify settings to `skconfig::Config`
pub trait SpotifyConfigExt {
    /// Bearer token, from `SPOTIFY_TOKEN` or `sources.spotify.access_token`
    fn get_spotify_access_token(&self) -> Result<String>;

    fn set_spotify_access_token(&self, token: &str) -> Result<()>;

    /// Absolute path of the resolution cache file
    fn get_spotify_resolution_cache_path(&self) -> Result<PathBuf>;

    /// Name of the generated playlist
    fn get_spotify_playlist_name(&self) -> Result<String>;

    fn set_spotify_playlist_name(&self, name: &str) -> Result<()>;

    /// Maximum number of concurrent track resolutions
    fn get_spotify_resolver_concurrency(&self) -> Result<usize>;

    fn set_spotify_resolver_concurrency(&self, limit: usize) -> Result<()>;
}

impl SpotifyConfigExt for Config {
    fn get_spotify_access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }

        self.get_string(&["sources", "spotify", "access_token"])
            .ok_or_else(|| {
                anyhow!(
                    "No Spotify access token: set {} or sources.spotify.access_token",
                    ACCESS_TOKEN_ENV
                )
            })
    }

    fn set_spotify_access_token(&self, token: &str) -> Result<()> {
        self.set_value(
            &["sources", "spotify", "access_token"],
            Value::String(token.to_string()),
        )
    }

    fn get_spotify_resolution_cache_path(&self) -> Result<PathBuf> {
        let file = self
            .get_string(&["sources", "spotify", "resolution_cache"])
            .unwrap_or_else(|| DEFAULT_RESOLUTION_CACHE.to_string());
        Ok(self.resolve_path(&file))
    }

    fn get_spotify_playlist_name(&self) -> Result<String> {
        match self.get_string(&["sources", "spotify", "playlist_name"]) {
            Some(name) => Ok(name),
            None => {
                self.set_spotify_playlist_name(DEFAULT_PLAYLIST_NAME)?;
                Ok(DEFAULT_PLAYLIST_NAME.to_string())
            }
        }
    }

    fn set_spotify_playlist_name(&self, name: &str) -> Result<()> {
        self.set_value(
            &["sources", "spotify", "playlist_name"],
            Value::String(name.to_string()),
        )
    }

    fn get_spotify_resolver_concurrency(&self) -> Result<usize> {
        match self.get_value(&["sources", "spotify", "resolver_concurrency"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(limit) if limit > 0 => Ok(limit),
                _ => Ok(DEFAULT_CONCURRENCY),
            },
            _ => {
                self.set_spotify_resolver_concurrency(DEFAULT_CONCURRENCY)?;
                Ok(DEFAULT_CONCURRENCY)
            }
        }
    }

    fn set_spotify_resolver_concurrency(&self, limit: usize) -> Result<()> {
        self.set_u64(&["sources", "spotify", "resolver_concurrency"], limit as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        assert_eq!(
            config.get_spotify_resolution_cache_path()?,
            dir.path().join("songIDs.bin")
        );
        assert_eq!(config.get_spotify_playlist_name()?, "Generated by Spotkov");
        assert_eq!(config.get_spotify_resolver_concurrency()?, 200);
        Ok(())
    }

    #[test]
    fn test_overrides_are_persisted() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        config.set_spotify_playlist_name("Spotkov mix")?;
        config.set_spotify_resolver_concurrency(8)?;

        let reloaded = Config::load_config(&dir.path().to_string_lossy())?;
        assert_eq!(reloaded.get_spotify_playlist_name()?, "Spotkov mix");
        assert_eq!(reloaded.get_spotify_resolver_concurrency()?, 8);
        Ok(())
    }
}
