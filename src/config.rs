//! Configuration loading.
//!
//! Layers, lowest to highest: built-in defaults, the user configuration
//! file, `PINBOX_*` environment variables.

use crate::logging::LoggingConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinboxConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory; None means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the store directory, falling back to the platform data
    /// directory.
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let project_dirs = directories::ProjectDirs::from("", "pinbox", "pinbox")
            .ok_or_else(|| {
                ConfigError::Message("could not determine platform data directory".to_string())
            })?;
        Ok(project_dirs.data_dir().join("store"))
    }
}

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment.
    ///
    /// `explicit` overrides default config file discovery entirely.
    pub fn load(explicit: Option<&Path>) -> Result<PinboxConfig, ConfigError> {
        let mut builder = Config::builder();
        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()));
            }
            None => {
                if let Some(path) = Self::user_config_path() {
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }
        builder = builder.add_source(Environment::with_prefix("PINBOX").separator("__"));
        let raw = builder.build()?;
        raw.try_deserialize()
    }

    /// Default user configuration file (`<config dir>/pinbox/config.toml`).
    fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "pinbox", "pinbox")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Built-in defaults.
    pub fn default() -> PinboxConfig {
        PinboxConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_store_path_wins() {
        let config = StoreConfig {
            path: Some(PathBuf::from("/tmp/pinbox-store")),
        };
        assert_eq!(
            config.resolve_path().unwrap(),
            PathBuf::from("/tmp/pinbox-store")
        );
    }

    #[test]
    fn default_store_path_ends_with_store() {
        let config = StoreConfig::default();
        let path = config.resolve_path().unwrap();
        assert!(path.ends_with("store"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\npath = \"/tmp/custom\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/custom")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn defaults_when_no_file() {
        let config = ConfigLoader::default();
        assert_eq!(config.store.path, None);
        assert_eq!(config.logging.level, "info");
    }
}
