//! Platform-specific directory management
//!
//! Follows the XDG Base Directory layout on Linux and the standard locations
//! on macOS and Windows.
//!
//! Environment variables override the defaults:
//! - `BOARDMAN_CONFIG_DIR` - Override config directory
//! - `BOARDMAN_DATA_DIR` - Override data directory

use std::env;
use std::path::PathBuf;

use crate::config::defaults::{CONFIG_FILE, INDEX_FILE};

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "BOARDMAN_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "BOARDMAN_DATA_DIR";

const APP_NAME: &str = "boardman";

/// Directory provider for boardman
#[derive(Debug, Clone)]
pub struct BoardmanDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl BoardmanDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: resolve(ENV_CONFIG_DIR, dirs::config_dir, &[".config"]),
            data_dir: resolve(ENV_DATA_DIR, dirs::data_dir, &[".local", "share"]),
        }
    }

    /// Config directory
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Data directory; installed packages and libraries live here
    ///
    /// - Linux: `$XDG_DATA_HOME/boardman` or `~/.local/share/boardman`
    /// - macOS: `~/Library/Application Support/boardman`
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Default package index location
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }
}

impl Default for BoardmanDirs {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &[&str]) -> PathBuf {
    if let Ok(path) = env::var(var) {
        return PathBuf::from(path);
    }

    platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_fallback
            .iter()
            .fold(base, |path, part| path.join(part))
            .join(APP_NAME)
    })
}
