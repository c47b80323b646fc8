//! Configuration parsing for strata.yml.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_persist::{Base64JsonCodec, FileStorage, JsonCodec, PersistConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Configuration matching the strata.yml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub codec: CodecKind,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".strata")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Base64,
}

impl StrataConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: StrataConfig = serde_yaml::from_str(&contents)?;

        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Storage directory, resolved relative to the config file
    pub fn storage_dir(&self) -> PathBuf {
        let path = &self.storage.path;
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }

    pub fn open_storage(&self) -> FileStorage {
        FileStorage::new(self.storage_dir())
    }

    /// Persistence settings for the store under `key`
    pub fn persist_config(&self, key: &str) -> PersistConfig {
        let config = PersistConfig::new(key).storage(Arc::new(self.open_storage()));
        match self.codec {
            CodecKind::Json => config.codec(JsonCodec),
            CodecKind::Base64 => config.codec(Base64JsonCodec),
        }
    }
}
