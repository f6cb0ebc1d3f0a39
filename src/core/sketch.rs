//! Sketch metadata
//!
//! A sketch directory carries a `sketch.json` recording the board it was last
//! attached to:
//!
//! ```json
//! { "cpu": { "fqbn": "arduino:avr:uno", "name": "Arduino Uno", "port": "serial:///dev/ttyACM0" } }
//! ```
//!
//! Unknown top-level keys are kept when the file is rewritten.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults::SKETCH_METADATA_FILE;
use crate::error::SketchError;

/// Board a sketch is attached to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMetadata {
    /// Fully qualified board name
    pub fqbn: String,

    /// Board name, set for discovered boards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Port the board was discovered on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Contents of `sketch.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchMetadata {
    /// Attached board
    #[serde(default)]
    pub cpu: BoardMetadata,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A sketch directory and its metadata
#[derive(Debug, Clone)]
pub struct Sketch {
    path: PathBuf,
    pub metadata: SketchMetadata,
}

impl Sketch {
    /// Open a sketch directory, reading existing metadata if present
    pub fn open(path: &Path) -> Result<Self, SketchError> {
        if !path.is_dir() {
            return Err(SketchError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let metadata_path = path.join(SKETCH_METADATA_FILE);
        let metadata = if metadata_path.exists() {
            let content =
                std::fs::read_to_string(&metadata_path).map_err(|e| SketchError::Read {
                    path: metadata_path.clone(),
                    error: e.to_string(),
                })?;
            serde_json::from_str(&content).map_err(|e| SketchError::Parse {
                path: metadata_path.clone(),
                error: e.to_string(),
            })?
        } else {
            SketchMetadata::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
        })
    }

    /// Sketch directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `sketch.json`
    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(SKETCH_METADATA_FILE)
    }

    /// Write the metadata back to `sketch.json`
    pub fn export_metadata(&self) -> Result<(), SketchError> {
        let path = self.metadata_path();
        let content = serde_json::to_string_pretty(&self.metadata).map_err(|e| SketchError::Write {
            path: path.clone(),
            error: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| SketchError::Write {
            path,
            error: e.to_string(),
        })
    }
}
