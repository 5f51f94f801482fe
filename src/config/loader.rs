//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Flat YAML mapping keyed by the long flag names.
///
/// Every key is optional; a missing key falls back to the flag default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,

    pub enable_http: Option<bool>,
    pub port_http: Option<i64>,

    pub enable_https: Option<bool>,
    pub port_https: Option<i64>,
    pub crt_file: Option<String>,
    pub key_file: Option<String>,

    pub enable_auth: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,

    pub timeout_read: Option<i64>,
    pub timeout_write: Option<i64>,
    pub timeout_dial: Option<i64>,

    pub enable_log: Option<bool>,
    pub log_dir: Option<PathBuf>,
    pub log_connections: Option<bool>,

    pub quiet: Option<bool>,
}

impl FileConfig {
    /// Parse a YAML document. An empty document yields all defaults.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load the YAML config file at `path`.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FileConfig::from_yaml(&content, path)
}
