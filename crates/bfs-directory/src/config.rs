//! Directory service configuration, read from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bfs_logging::LogConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NEEDLE_MAX_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Largest payload a single needle holds. Also the chunk size of
    /// chunked files and the upload ceiling.
    pub needle_max_size: u64,

    /// Largest byte range one read may request.
    pub max_range_size: u64,

    /// A volume accepts writes only while its free space is above this.
    pub volume_min_free_space: u64,

    #[serde(with = "humantime_compat")]
    pub pull_interval: Duration,

    /// Sleep after a failed synchronization cycle.
    #[serde(with = "humantime_compat")]
    pub retry_interval: Duration,

    /// Deadline for every coordination, metadata-store and id-generator call.
    #[serde(with = "humantime_compat")]
    pub op_timeout: Duration,

    pub log: LogConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            needle_max_size: DEFAULT_NEEDLE_MAX_SIZE,
            max_range_size: DEFAULT_NEEDLE_MAX_SIZE,
            volume_min_free_space: 0,
            pull_interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(1),
            op_timeout: Duration::from_secs(5),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl DirectoryConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.needle_max_size == 0 {
            return Err(ConfigError::Invalid("needle_max_size must be positive".into()));
        }
        if self.max_range_size == 0 {
            return Err(ConfigError::Invalid("max_range_size must be positive".into()));
        }
        if self.pull_interval.is_zero() {
            return Err(ConfigError::Invalid("pull_interval must be positive".into()));
        }
        if self.op_timeout.is_zero() {
            return Err(ConfigError::Invalid("op_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Durations as float seconds.
mod humantime_compat {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
