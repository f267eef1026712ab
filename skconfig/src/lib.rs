//! # Spotkov configuration module
//!
//! This crate provides configuration management for Spotkov:
//! - Loading configuration from a YAML file
//! - Merging with an embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access
//!
//! Source-specific settings (Last.fm API key, Spotify token, cache paths)
//! live in extension traits declared by the crates that consume them
//! (`sklastfm::LastFmConfigExt`, `skspotify::SpotifyConfigExt`).
//!
//! ## Usage
//!
//! ```no_run
//! use skconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! let cache_dir = config.get_managed_dir(&["sources", "lastfm", "cache_dir"], "cached-songs")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("spotkov.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load Spotkov configuration"));
}

const ENV_CONFIG_DIR: &str = "SPOTKOV_CONFIG";
const ENV_PREFIX: &str = "SPOTKOV_CONFIG__";
const CONFIG_DIR_NAME: &str = ".spotkov";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Configuration manager for Spotkov
///
/// The whole tree is kept in memory behind a mutex and written back to
/// `config.yaml` after every `set_value`.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Picks the config directory: argument, `SPOTKOV_CONFIG`, `./.spotkov`,
    /// `~/.spotkov`, falling back to `./.spotkov`
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory from environment");
            return from_env;
        }

        let candidates = std::iter::once(PathBuf::from(CONFIG_DIR_NAME))
            .chain(home_dir().map(|home| home.join(CONFIG_DIR_NAME)));
        for candidate in candidates {
            if candidate.is_dir() {
                return candidate.to_string_lossy().into_owned();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Creates the directory if needed and checks that it is writable
    fn validate_config_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let marker = path.join(".write_test");
        fs::write(&marker, b"spotkov")
            .map_err(|e| anyhow!("{} is not writable: {}", path.display(), e))?;
        fs::remove_file(&marker)?;
        Ok(())
    }

    /// Determines and validates the configuration directory
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir))?;
        Ok(dir)
    }

    /// Loads the configuration from `directory` (empty for the default search)
    ///
    /// The embedded defaults are overlaid with `config.yaml` when it exists,
    /// keys are lower-cased, `SPOTKOV_CONFIG__*` variables are applied, and
    /// the result is written back so the file always lists every setting.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        let path = Path::new(&config_dir).join("config.yaml");
        info!(config_dir = %config_dir, "Using config directory");

        let mut tree: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read(&path) {
            Ok(bytes) => {
                let external: Value = serde_yaml::from_slice(&bytes)?;
                merge_yaml(&mut tree, &Self::lower_keys_value(external));
                info!(config_file = %path.display(), "Loaded config file");
            }
            Err(_) => info!(config_file = %path.display(), "No config file, using defaults"),
        }

        let mut tree = Self::lower_keys_value(tree);
        Self::apply_env_overrides(&mut tree);

        let config = Config {
            config_dir,
            path: path.to_string_lossy().into_owned(),
            data: Mutex::new(tree),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`; relative managed paths resolve against it
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("configuration lock poisoned"))
    }

    /// Writes the in-memory tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock()?)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Stores `value` at `path` (e.g. `&["sources", "lastfm", "api_key"]`) and saves
    ///
    /// Missing intermediate mappings are created.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut *self.lock()?, path, value)?;
        self.save()
    }

    /// Value at `path`; an error names the first missing key
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        let mut node = &*data;
        for (depth, key) in path.iter().enumerate() {
            node = node
                .as_mapping()
                .and_then(|map| map.get(key.to_lowercase().as_str()))
                .ok_or_else(|| anyhow!("No configuration value at {}", path[..=depth].join(".")))?;
        }
        Ok(node.clone())
    }

    /// Gets a non-empty string value, or `None` when missing or blank
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// `SPOTKOV_CONFIG__SOURCES__LASTFM__API_KEY=x` sets `sources.lastfm.api_key`
    fn apply_env_overrides(tree: &mut Value) {
        for (name, raw) in env::vars() {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = rest.split("__").filter(|k| !k.is_empty()).collect();
            if path.is_empty() {
                continue;
            }
            let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw.clone()));
            if let Err(e) = insert_at(tree, &path, value) {
                tracing::warn!(variable = %name, error = %e, "Ignoring configuration override");
            }
        }
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| {
                        let k = match k {
                            Value::String(s) => Value::String(s.to_lowercase()),
                            other => other,
                        };
                        (k, Self::lower_keys_value(v))
                    })
                    .collect(),
            ),
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            other => other,
        }
    }

    /// Resolves a path against the config directory when relative
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(p)
        }
    }

    /// Directory stored at `path`, created if missing
    ///
    /// Relative values resolve against the config directory. A missing key
    /// is initialized with `default`.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let dir = match self.get_string(path) {
            Some(dir) => dir,
            None => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };

        let absolute = self.resolve_path(&dir);
        if !absolute.is_dir() {
            fs::create_dir_all(&absolute)?;
            info!(directory = %absolute.display(), "Created cache directory");
        }
        Ok(absolute.to_string_lossy().into_owned())
    }

    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    /// Minimum log level (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self
            .get_string(&["host", "logger", "min_level"])
            .unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string()))
    }

    /// Stores an unsigned integer at `path`
    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }
}

/// Walks `path` in `tree`, creating mappings, and stores `value` at the end
fn insert_at(tree: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return Ok(());
    };

    let mut node = tree;
    for key in parents {
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("Cannot set {}: {} is not a mapping", path.join("."), key))?;
        node = map
            .entry(Value::String(key.to_lowercase()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    node.as_mapping_mut()
        .ok_or_else(|| anyhow!("Cannot set {}: parent is not a mapping", path.join(".")))?
        .insert(Value::String(last.to_lowercase()), value);
    Ok(())
}

/// Returns the global configuration instance
///
/// Lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges an external YAML tree into the default one
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_writes_default_config() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.get_log_min_level()?, "INFO");
        Ok(())
    }

    #[test]
    fn test_external_file_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("config.yaml"),
            "host:\n  Logger:\n    min_level: DEBUG\n",
        )?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        assert_eq!(config.get_log_min_level()?, "DEBUG");
        // untouched defaults survive the merge
        assert!(config.get_value(&["sources", "spotify"]).is_ok());
        Ok(())
    }

    #[test]
    fn test_set_and_get_value() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        config.set_value(&["sources", "lastfm", "api_key"], Value::String("abc".into()))?;
        assert_eq!(
            config.get_string(&["sources", "lastfm", "api_key"]),
            Some("abc".to_string())
        );

        let reloaded = Config::load_config(&dir.path().to_string_lossy())?;
        assert_eq!(
            reloaded.get_string(&["sources", "lastfm", "api_key"]),
            Some("abc".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_missing_path_is_error() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;
        assert!(config.get_value(&["nope", "nothing"]).is_err());
        assert_eq!(config.get_string(&["nope"]), None);
        Ok(())
    }

    #[test]
    fn test_managed_dir_is_created_relative_to_config() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;

        let managed = config.get_managed_dir(&["test", "dir"], "somewhere")?;
        assert!(Path::new(&managed).is_dir());
        assert!(Path::new(&managed).starts_with(dir.path()));
        Ok(())
    }

    #[test]
    fn test_merge_yaml_replaces_scalars_and_keeps_siblings() {
        let mut base: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\n").unwrap();
        let ext: Value = serde_yaml::from_str("a:\n  b: 5\n").unwrap();
        merge_yaml(&mut base, &ext);
        assert_eq!(base["a"]["b"], Value::Number(5.into()));
        assert_eq!(base["a"]["c"], Value::Number(2.into()));
    }
}
