//! Install store
//!
//! Records which platform, tool and library releases are installed. The
//! filesystem store lays releases out as:
//!
//! ```text
//! <root>/packages/<package>/hardware/<architecture>/<version>/installed.json
//! <root>/packages/<package>/tools/<tool>/<version>/installed.json
//! <root>/libraries/<name>/library.json
//! ```
//!
//! Each manifest carries the full index entry of the release so the catalog
//! can be rebuilt even when the package index no longer lists it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::defaults::{INSTALLED_MANIFEST, LIBRARY_MANIFEST};
use crate::core::catalog::{PlatformId, ToolId};
use crate::core::index::{IndexLibrary, IndexPlatform, IndexTool};
use crate::core::version::ReleaseVersion;
use crate::error::StoreError;

use super::filesystem;

const PACKAGES_DIR: &str = "packages";
const LIBRARIES_DIR: &str = "libraries";
const HARDWARE_DIR: &str = "hardware";
const TOOLS_DIR: &str = "tools";

/// Install manifest of a platform release
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformManifest {
    pub package: String,
    pub platform: IndexPlatform,
}

/// Install manifest of a tool release
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolManifest {
    pub package: String,
    pub tool: IndexTool,
}

/// Everything found installed by a scan
#[derive(Debug, Clone, Default)]
pub struct InstalledState {
    pub platforms: Vec<PlatformManifest>,
    pub tools: Vec<ToolManifest>,
    pub libraries: Vec<IndexLibrary>,
}

/// Persistence of installed releases
///
/// Writing and removing install manifests is the only side effect of the
/// lifecycle operations; fetching and unpacking archives happens elsewhere.
pub trait InstallStore: fmt::Debug + Send + Sync {
    /// Read every installed release
    fn scan(&self) -> Result<InstalledState, StoreError>;

    /// Record a platform release as installed
    fn install_platform(&self, package: &str, platform: &IndexPlatform) -> Result<(), StoreError>;

    /// Record a tool release as installed
    fn install_tool(&self, package: &str, tool: &IndexTool) -> Result<(), StoreError>;

    /// Record a library release as installed
    fn install_library(&self, library: &IndexLibrary) -> Result<(), StoreError>;

    /// Remove an installed platform release
    fn remove_platform(&self, id: &PlatformId, version: &ReleaseVersion) -> Result<(), StoreError>;

    /// Remove an installed tool release
    fn remove_tool(&self, id: &ToolId, version: &ReleaseVersion) -> Result<(), StoreError>;

    /// Remove an installed library
    fn remove_library(&self, name: &str) -> Result<(), StoreError>;
}

/// Filesystem-backed install store
#[derive(Debug, Clone)]
pub struct FsInstallStore {
    root: PathBuf,
}

impl FsInstallStore {
    /// Create a store rooted at the given data directory
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Install directory of a platform release
    pub fn platform_dir(&self, id: &PlatformId, version: &ReleaseVersion) -> PathBuf {
        self.root
            .join(PACKAGES_DIR)
            .join(&id.package)
            .join(HARDWARE_DIR)
            .join(&id.architecture)
            .join(version.as_str())
    }

    /// Install directory of a tool release
    pub fn tool_dir(&self, id: &ToolId, version: &ReleaseVersion) -> PathBuf {
        self.root
            .join(PACKAGES_DIR)
            .join(&id.package)
            .join(TOOLS_DIR)
            .join(&id.name)
            .join(version.as_str())
    }

    /// Install directory of a library
    pub fn library_dir(&self, name: &str) -> PathBuf {
        self.root.join(LIBRARIES_DIR).join(name)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let content =
            serde_json::to_string_pretty(value).map_err(|e| StoreError::InvalidManifest {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        filesystem::write_file(path, &content)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
        let content = filesystem::read_file(path)?;
        serde_json::from_str(&content).map_err(|e| StoreError::InvalidManifest {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn remove_release_dir(&self, dir: &Path) -> Result<(), StoreError> {
        filesystem::remove_dir_all(dir)?;
        filesystem::prune_empty_parents(dir, &self.root);
        Ok(())
    }

    fn scan_packages(&self, state: &mut InstalledState) -> Result<(), StoreError> {
        let packages_dir = self.root.join(PACKAGES_DIR);
        if !packages_dir.exists() {
            return Ok(());
        }

        // <package>/<hardware|tools>/<name>/<version>/installed.json
        for entry in WalkDir::new(&packages_dir)
            .min_depth(5)
            .max_depth(5)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::ReadFile {
                path: packages_dir.clone(),
                error: e.to_string(),
            })?;
            if entry.file_name() != INSTALLED_MANIFEST || !entry.file_type().is_file() {
                continue;
            }

            let kind = entry
                .path()
                .strip_prefix(&packages_dir)
                .ok()
                .and_then(|relative| relative.components().nth(1))
                .map(|component| component.as_os_str().to_string_lossy().into_owned());

            match kind.as_deref() {
                Some(HARDWARE_DIR) => state.platforms.push(Self::read_json(entry.path())?),
                Some(TOOLS_DIR) => state.tools.push(Self::read_json(entry.path())?),
                _ => tracing::debug!("Ignoring stray manifest {}", entry.path().display()),
            }
        }
        Ok(())
    }

    fn scan_libraries(&self, state: &mut InstalledState) -> Result<(), StoreError> {
        let libraries_dir = self.root.join(LIBRARIES_DIR);
        if !libraries_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(&libraries_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::ReadFile {
                path: libraries_dir.clone(),
                error: e.to_string(),
            })?;
            if entry.file_name() == LIBRARY_MANIFEST && entry.file_type().is_file() {
                state.libraries.push(Self::read_json(entry.path())?);
            }
        }
        Ok(())
    }
}

impl InstallStore for FsInstallStore {
    fn scan(&self) -> Result<InstalledState, StoreError> {
        let mut state = InstalledState::default();
        self.scan_packages(&mut state)?;
        self.scan_libraries(&mut state)?;
        Ok(state)
    }

    fn install_platform(&self, package: &str, platform: &IndexPlatform) -> Result<(), StoreError> {
        let dir = self.platform_dir(&PlatformId::new(package, &platform.architecture), &platform.version);
        let manifest = PlatformManifest {
            package: package.to_string(),
            platform: platform.clone(),
        };
        Self::write_json(&dir.join(INSTALLED_MANIFEST), &manifest)
    }

    fn install_tool(&self, package: &str, tool: &IndexTool) -> Result<(), StoreError> {
        let dir = self.tool_dir(&ToolId::new(package, &tool.name), &tool.version);
        let manifest = ToolManifest {
            package: package.to_string(),
            tool: tool.clone(),
        };
        Self::write_json(&dir.join(INSTALLED_MANIFEST), &manifest)
    }

    fn install_library(&self, library: &IndexLibrary) -> Result<(), StoreError> {
        let dir = self.library_dir(&library.name);
        Self::write_json(&dir.join(LIBRARY_MANIFEST), library)
    }

    fn remove_platform(&self, id: &PlatformId, version: &ReleaseVersion) -> Result<(), StoreError> {
        self.remove_release_dir(&self.platform_dir(id, version))
    }

    fn remove_tool(&self, id: &ToolId, version: &ReleaseVersion) -> Result<(), StoreError> {
        self.remove_release_dir(&self.tool_dir(id, version))
    }

    fn remove_library(&self, name: &str) -> Result<(), StoreError> {
        self.remove_release_dir(&self.library_dir(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn avr_platform(version: &str) -> IndexPlatform {
        IndexPlatform {
            architecture: "avr".to_string(),
            name: "Arduino AVR Boards".to_string(),
            version: ReleaseVersion::from(version),
            tool_dependencies: vec![],
            boards: vec![],
        }
    }

    #[test]
    fn test_install_and_scan_platform() {
        let temp = TempDir::new().unwrap();
        let store = FsInstallStore::new(temp.path());

        store.install_platform("arduino", &avr_platform("1.8.6")).unwrap();

        let manifest = temp
            .path()
            .join("packages/arduino/hardware/avr/1.8.6/installed.json");
        assert!(manifest.exists());

        let state = store.scan().unwrap();
        assert_eq!(state.platforms.len(), 1);
        assert_eq!(state.platforms[0].package, "arduino");
        assert_eq!(state.platforms[0].platform.version.as_str(), "1.8.6");
        assert!(state.tools.is_empty());
    }

    #[test]
    fn test_scan_distinguishes_tools_and_libraries() {
        let temp = TempDir::new().unwrap();
        let store = FsInstallStore::new(temp.path());

        store
            .install_tool(
                "arduino",
                &IndexTool {
                    name: "avrdude".to_string(),
                    version: ReleaseVersion::from("6.3.0-arduino17"),
                    dependencies: vec![],
                },
            )
            .unwrap();
        store
            .install_library(&IndexLibrary {
                name: "Servo".to_string(),
                version: ReleaseVersion::from("1.1.8"),
                author: None,
                sentence: None,
            })
            .unwrap();

        let state = store.scan().unwrap();
        assert!(state.platforms.is_empty());
        assert_eq!(state.tools[0].tool.name, "avrdude");
        assert_eq!(state.libraries[0].name, "Servo");
    }

    #[test]
    fn test_remove_platform_prunes_empty_dirs() {
        let temp = TempDir::new().unwrap();
        let store = FsInstallStore::new(temp.path());
        store.install_platform("arduino", &avr_platform("1.8.6")).unwrap();

        store
            .remove_platform(&PlatformId::new("arduino", "avr"), &ReleaseVersion::from("1.8.6"))
            .unwrap();

        assert!(!temp.path().join("packages/arduino").exists());
        assert!(store.scan().unwrap().platforms.is_empty());
    }

    #[test]
    fn test_corrupt_manifest_is_reported() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("packages/arduino/hardware/avr/1.8.6");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("installed.json"), "not json").unwrap();

        let store = FsInstallStore::new(temp.path());
        assert!(matches!(
            store.scan(),
            Err(StoreError::InvalidManifest { .. })
        ));
    }
}
