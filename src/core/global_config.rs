//! Global configuration management
//!
//! Reads settings from `config.toml` in the config directory:
//!
//! ```toml
//! [discovery]
//! interval_ms = 1000
//! settle_timeout = "5s"
//! probe_timeout_ms = 500
//!
//! [[discovery.network]]
//! address = "192.168.1.20"
//! port = 8266
//! name = "nodemcuv2"
//!
//! [index]
//! path = "/srv/boardman/package_index.toml"
//! ```

use crate::config::defaults::{DEFAULT_DISCOVERY_INTERVAL, DEFAULT_PROBE_TIMEOUT};
use crate::infra::dirs::BoardmanDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Global configuration for boardman
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Device discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Package index settings
    #[serde(default)]
    pub index: IndexConfig,
}

/// Device discovery settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Milliseconds between discovery scans
    pub interval_ms: Option<u64>,

    /// Default settle duration for `board attach` (e.g. "5s")
    pub settle_timeout: Option<String>,

    /// Milliseconds allowed for a network endpoint to accept a connection
    pub probe_timeout_ms: Option<u64>,

    /// Network endpoints to probe
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network: Vec<NetworkEndpoint>,
}

/// A network endpoint that may host a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub address: String,
    pub port: u16,
    /// Board id advertised by the endpoint
    pub name: String,
}

/// Package index settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Custom index location
    pub path: Option<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `GlobalConfigError::ParseError` if the config file exists but
    /// contains invalid TOML.
    pub fn load(dirs: &BoardmanDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective interval between discovery scans
    #[must_use]
    pub fn discovery_interval(&self) -> Duration {
        self.discovery
            .interval_ms
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_DISCOVERY_INTERVAL, Duration::from_millis)
    }

    /// Effective network probe timeout
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        self.discovery
            .probe_timeout_ms
            .map_or(DEFAULT_PROBE_TIMEOUT, Duration::from_millis)
    }

    /// Configured settle duration, unparsed
    #[must_use]
    pub fn settle_timeout(&self) -> &str {
        self.discovery.settle_timeout.as_deref().unwrap_or_default()
    }

    /// Effective package index location
    #[must_use]
    pub fn index_path(&self, dirs: &BoardmanDirs) -> PathBuf {
        self.index.path.clone().unwrap_or_else(|| dirs.index_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.discovery_interval(), DEFAULT_DISCOVERY_INTERVAL);
        assert_eq!(config.probe_timeout(), DEFAULT_PROBE_TIMEOUT);
        assert_eq!(config.settle_timeout(), "");
        assert!(config.discovery.network.is_empty());
        assert!(config.index.path.is_none());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = GlobalConfig::load_from_path(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let content = r#"
[discovery]
interval_ms = 250
settle_timeout = "2s"

[[discovery.network]]
address = "192.168.1.20"
port = 8266
name = "nodemcuv2"

[index]
path = "/srv/index.toml"
"#;
        fs::write(&config_path, content).unwrap();

        let config = GlobalConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config.discovery_interval(), Duration::from_millis(250));
        assert_eq!(config.settle_timeout(), "2s");
        assert_eq!(config.discovery.network[0].port, 8266);
        assert_eq!(
            config.index_path(&BoardmanDirs::new()),
            PathBuf::from("/srv/index.toml")
        );
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let config = GlobalConfig {
            discovery: DiscoveryConfig {
                interval_ms: Some(0),
                ..DiscoveryConfig::default()
            },
            ..GlobalConfig::default()
        };
        assert_eq!(config.discovery_interval(), DEFAULT_DISCOVERY_INTERVAL);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        assert!(matches!(
            GlobalConfig::load_from_path(&config_path),
            Err(GlobalConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[discovery]
interval_ms = 2000
settle_timeout = "10s"
probe_timeout_ms = 100

[[discovery.network]]
address = "10.0.0.5"
port = 3232
name = "esp32"

[index]
path = "/tmp/index.toml"
"#,
        )
        .unwrap();

        let config = GlobalConfig {
            discovery: DiscoveryConfig {
                interval_ms: Some(2000),
                settle_timeout: Some("10s".to_string()),
                probe_timeout_ms: Some(100),
                network: vec![NetworkEndpoint {
                    address: "10.0.0.5".to_string(),
                    port: 3232,
                    name: "esp32".to_string(),
                }],
            },
            index: IndexConfig {
                path: Some(PathBuf::from("/tmp/index.toml")),
            },
        };

        assert_eq!(GlobalConfig::load_from_path(&config_path).unwrap(), config);
    }
}
