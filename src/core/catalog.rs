//! Package catalog
//!
//! The [`Catalog`] is the in-memory model of every package, platform, tool
//! and library known from the package index, together with which releases are
//! currently installed. It is an explicit object: callers own it and pass it by
//! reference into the lifecycle and attach operations.
//!
//! Enumeration order is deterministic. Packages, platforms, tools and
//! libraries are keyed in `BTreeMap`s, releases are ordered by version, and
//! boards within a release are ordered by board id.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use crate::error::CatalogError;
use crate::infra::store::InstallStore;

use super::dependencies;
use super::fqbn::Fqbn;
use super::index::{
    HexId, IndexBoard, IndexDocument, IndexLibrary, IndexPlatform, IndexTool, IndexToolDependency,
    IndexUsbId,
};
use super::version::ReleaseVersion;

/// Identity of a platform: `(package, architecture)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformId {
    pub package: String,
    pub architecture: String,
}

impl PlatformId {
    pub fn new(package: &str, architecture: &str) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.architecture)
    }
}

/// Identity of a tool: `(package, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolId {
    pub package: String,
    pub name: String,
}

impl ToolId {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.name)
    }
}

/// A declared `(package, tool, version)` dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolDependency {
    pub tool: ToolId,
    pub version: ReleaseVersion,
}

impl fmt::Display for ToolDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tool, self.version)
    }
}

impl From<&IndexToolDependency> for ToolDependency {
    fn from(dep: &IndexToolDependency) -> Self {
        Self {
            tool: ToolId::new(&dep.packager, &dep.name),
            version: dep.version.clone(),
        }
    }
}

impl From<&ToolDependency> for IndexToolDependency {
    fn from(dep: &ToolDependency) -> Self {
        Self {
            packager: dep.tool.package.clone(),
            name: dep.tool.name.clone(),
            version: dep.version.clone(),
        }
    }
}

/// A USB vendor/product id pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsbId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}:{:#06x}", self.vendor_id, self.product_id)
    }
}

/// A board provided by a platform release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub platform: PlatformId,
    pub id: String,
    pub name: String,
    pub usb_ids: Vec<UsbId>,
}

impl Board {
    /// Fully qualified board name
    pub fn fqbn(&self) -> Fqbn {
        Fqbn::new(&self.platform.package, &self.platform.architecture, &self.id)
    }

    /// Whether the board enumerates with this vendor/product id pair
    pub fn has_usb_id(&self, vendor_id: u16, product_id: u16) -> bool {
        self.usb_ids
            .iter()
            .any(|id| id.vendor_id == vendor_id && id.product_id == product_id)
    }
}

/// One version of a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRelease {
    pub platform: PlatformId,
    pub name: String,
    pub version: ReleaseVersion,
    pub tool_dependencies: Vec<ToolDependency>,
    pub boards: Vec<Board>,
}

impl PlatformRelease {
    fn from_index(package: &str, entry: &IndexPlatform) -> Self {
        let platform = PlatformId::new(package, &entry.architecture);
        let mut boards: Vec<Board> = entry
            .boards
            .iter()
            .map(|board| Board {
                platform: platform.clone(),
                id: board.id.clone(),
                name: board.name.clone(),
                usb_ids: board
                    .usb_ids
                    .iter()
                    .map(|id| UsbId {
                        vendor_id: id.vid.0,
                        product_id: id.pid.0,
                    })
                    .collect(),
            })
            .collect();
        boards.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            platform,
            name: entry.name.clone(),
            version: entry.version.clone(),
            tool_dependencies: entry.tool_dependencies.iter().map(ToolDependency::from).collect(),
            boards,
        }
    }

    /// Whether this release directly declares the given tool release
    pub fn declares(&self, tool: &ToolRelease) -> bool {
        self.tool_dependencies
            .iter()
            .any(|dep| dep.tool == tool.tool && dep.version == tool.version)
    }
}

impl From<&PlatformRelease> for IndexPlatform {
    fn from(release: &PlatformRelease) -> Self {
        Self {
            architecture: release.platform.architecture.clone(),
            name: release.name.clone(),
            version: release.version.clone(),
            tool_dependencies: release.tool_dependencies.iter().map(Into::into).collect(),
            boards: release
                .boards
                .iter()
                .map(|board| IndexBoard {
                    id: board.id.clone(),
                    name: board.name.clone(),
                    usb_ids: board
                        .usb_ids
                        .iter()
                        .map(|id| IndexUsbId {
                            vid: HexId(id.vendor_id),
                            pid: HexId(id.product_id),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for PlatformRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.platform, self.version)
    }
}

/// One version of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRelease {
    pub tool: ToolId,
    pub version: ReleaseVersion,
    pub dependencies: Vec<ToolDependency>,
}

impl ToolRelease {
    fn from_index(package: &str, entry: &IndexTool) -> Self {
        Self {
            tool: ToolId::new(package, &entry.name),
            version: entry.version.clone(),
            dependencies: entry.dependencies.iter().map(ToolDependency::from).collect(),
        }
    }
}

impl From<&ToolRelease> for IndexTool {
    fn from(release: &ToolRelease) -> Self {
        Self {
            name: release.tool.name.clone(),
            version: release.version.clone(),
            dependencies: release.dependencies.iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ToolRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tool, self.version)
    }
}

/// One version of a library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRelease {
    pub name: String,
    pub version: ReleaseVersion,
    pub author: Option<String>,
    pub sentence: Option<String>,
}

impl From<&IndexLibrary> for LibraryRelease {
    fn from(entry: &IndexLibrary) -> Self {
        Self {
            name: entry.name.clone(),
            version: entry.version.clone(),
            author: entry.author.clone(),
            sentence: entry.sentence.clone(),
        }
    }
}

impl From<&LibraryRelease> for IndexLibrary {
    fn from(release: &LibraryRelease) -> Self {
        Self {
            name: release.name.clone(),
            version: release.version.clone(),
            author: release.author.clone(),
            sentence: release.sentence.clone(),
        }
    }
}

impl fmt::Display for LibraryRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A platform and all its known releases
#[derive(Debug, Clone)]
pub struct Platform {
    pub id: PlatformId,
    pub releases: BTreeMap<ReleaseVersion, PlatformRelease>,
    installed: Option<ReleaseVersion>,
}

impl Platform {
    fn new(id: PlatformId) -> Self {
        Self {
            id,
            releases: BTreeMap::new(),
            installed: None,
        }
    }

    /// The installed release, if any
    pub fn installed_release(&self) -> Option<&PlatformRelease> {
        self.installed.as_ref().and_then(|v| self.releases.get(v))
    }

    /// The newest release in the catalog
    pub fn latest_release(&self) -> Option<&PlatformRelease> {
        self.releases.values().next_back()
    }
}

/// A tool and all its known releases
#[derive(Debug, Clone)]
pub struct Tool {
    pub id: ToolId,
    pub releases: BTreeMap<ReleaseVersion, ToolRelease>,
    installed: BTreeSet<ReleaseVersion>,
}

impl Tool {
    fn new(id: ToolId) -> Self {
        Self {
            id,
            releases: BTreeMap::new(),
            installed: BTreeSet::new(),
        }
    }

    /// Whether the given version is installed
    pub fn is_installed(&self, version: &ReleaseVersion) -> bool {
        self.installed.contains(version)
    }

    /// Installed releases, oldest first
    pub fn installed_releases(&self) -> impl Iterator<Item = &ToolRelease> {
        self.installed.iter().filter_map(|v| self.releases.get(v))
    }
}

/// A library and all its known releases
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    pub releases: BTreeMap<ReleaseVersion, LibraryRelease>,
    installed: Option<ReleaseVersion>,
}

impl Library {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            releases: BTreeMap::new(),
            installed: None,
        }
    }

    /// The installed release, if any
    pub fn installed_release(&self) -> Option<&LibraryRelease> {
        self.installed.as_ref().and_then(|v| self.releases.get(v))
    }

    /// The newest release in the catalog
    pub fn latest_release(&self) -> Option<&LibraryRelease> {
        self.releases.values().next_back()
    }
}

/// A vendor package
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub maintainer: Option<String>,
    pub platforms: BTreeMap<String, Platform>,
    pub tools: BTreeMap<String, Tool>,
}

impl Package {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            maintainer: None,
            platforms: BTreeMap::new(),
            tools: BTreeMap::new(),
        }
    }
}

/// Catalog of packages, tools and libraries plus their installed state
#[derive(Debug)]
pub struct Catalog {
    packages: BTreeMap<String, Package>,
    libraries: BTreeMap<String, Library>,
    store: Box<dyn InstallStore>,
}

impl Catalog {
    /// Create a catalog from an index document and read installed state from the store
    pub fn new(index: &IndexDocument, store: Box<dyn InstallStore>) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            packages: BTreeMap::new(),
            libraries: BTreeMap::new(),
            store,
        };
        for package in &index.packages {
            let entry = catalog.package_entry(&package.name);
            if package.maintainer.is_some() {
                entry.maintainer.clone_from(&package.maintainer);
            }
            for platform in &package.platforms {
                catalog.add_platform_release(&package.name, platform);
            }
            for tool in &package.tools {
                catalog.add_tool_release(&package.name, tool);
            }
        }
        for library in &index.libraries {
            catalog.add_library_release(library);
        }
        catalog.reindex()?;
        Ok(catalog)
    }

    /// Load the package index from a TOML file
    ///
    /// A missing index yields an empty catalog holding only what is installed.
    pub fn load(index_path: &Path, store: Box<dyn InstallStore>) -> Result<Self, CatalogError> {
        let index = if index_path.exists() {
            let content =
                std::fs::read_to_string(index_path).map_err(|e| CatalogError::ReadIndex {
                    path: index_path.to_path_buf(),
                    error: e.to_string(),
                })?;
            IndexDocument::from_toml(&content).map_err(|e| CatalogError::ParseIndex {
                path: index_path.to_path_buf(),
                error: e.to_string(),
            })?
        } else {
            tracing::debug!("No package index at {}", index_path.display());
            IndexDocument::default()
        };
        Self::new(&index, store)
    }

    /// Rebuild installed flags from the install store
    ///
    /// Installed releases missing from the index are added to the catalog
    /// from their install manifests.
    pub fn reindex(&mut self) -> Result<(), CatalogError> {
        let state = self.store.scan()?;

        for package in self.packages.values_mut() {
            for platform in package.platforms.values_mut() {
                platform.installed = None;
            }
            for tool in package.tools.values_mut() {
                tool.installed.clear();
            }
        }
        for library in self.libraries.values_mut() {
            library.installed = None;
        }

        for manifest in &state.platforms {
            let release = self.add_platform_release(&manifest.package, &manifest.platform);
            let id = release.platform.clone();
            let version = release.version.clone();
            if let Some(platform) = self.platform_mut(&id) {
                if let Some(previous) = platform.installed.replace(version) {
                    tracing::warn!(
                        "Multiple releases of {} installed, ignoring {}",
                        id,
                        previous
                    );
                }
            }
        }
        for manifest in &state.tools {
            let release = self.add_tool_release(&manifest.package, &manifest.tool);
            let id = release.tool.clone();
            let version = release.version.clone();
            if let Some(tool) = self.tool_mut(&id) {
                tool.installed.insert(version);
            }
        }
        for manifest in &state.libraries {
            self.add_library_release(manifest);
            if let Some(library) = self.libraries.get_mut(&manifest.name) {
                library.installed = Some(manifest.version.clone());
            }
        }

        tracing::debug!(
            platforms = state.platforms.len(),
            tools = state.tools.len(),
            libraries = state.libraries.len(),
            "Catalog reindexed"
        );
        Ok(())
    }

    /// The install store backing this catalog
    pub fn store(&self) -> &dyn InstallStore {
        self.store.as_ref()
    }

    /// All packages, ordered by name
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Look up a platform
    pub fn platform(&self, id: &PlatformId) -> Option<&Platform> {
        self.packages.get(&id.package)?.platforms.get(&id.architecture)
    }

    /// Look up a tool
    pub fn tool(&self, id: &ToolId) -> Option<&Tool> {
        self.packages.get(&id.package)?.tools.get(&id.name)
    }

    /// Look up a library
    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.get(name)
    }

    /// Installed platform releases in package, architecture order
    pub fn installed_platform_releases(&self) -> impl Iterator<Item = &PlatformRelease> {
        self.packages
            .values()
            .flat_map(|package| package.platforms.values())
            .filter_map(Platform::installed_release)
    }

    /// Whether the given tool release is installed
    pub fn is_tool_installed(&self, release: &ToolRelease) -> bool {
        self.tool(&release.tool)
            .is_some_and(|tool| tool.is_installed(&release.version))
    }

    /// Whether any installed platform release still needs this tool release
    ///
    /// Platforms count as needing a tool when it appears anywhere in their
    /// dependency closure, not only in their direct declarations.
    pub fn is_tool_required(&self, release: &ToolRelease) -> bool {
        self.installed_platform_releases()
            .any(|platform| dependencies::requires_tool(self, platform, release))
    }

    /// Boards of installed platforms that enumerate with the given USB ids
    pub fn find_boards_with_vid_pid(&self, vendor_id: u16, product_id: u16) -> Vec<&Board> {
        self.installed_boards()
            .filter(|board| board.has_usb_id(vendor_id, product_id))
            .collect()
    }

    /// Boards of installed platforms with the given board id
    pub fn find_boards_with_id(&self, id: &str) -> Vec<&Board> {
        self.installed_boards().filter(|board| board.id == id).collect()
    }

    /// Boards of all installed platforms in deterministic order
    pub fn installed_boards(&self) -> impl Iterator<Item = &Board> {
        self.installed_platform_releases()
            .flat_map(|release| release.boards.iter())
    }

    pub(crate) fn set_platform_installed(&mut self, id: &PlatformId, version: Option<ReleaseVersion>) {
        if let Some(platform) = self.platform_mut(id) {
            platform.installed = version;
        }
    }

    pub(crate) fn set_tool_installed(&mut self, release: &ToolRelease, installed: bool) {
        if let Some(tool) = self.tool_mut(&release.tool) {
            if installed {
                tool.installed.insert(release.version.clone());
            } else {
                tool.installed.remove(&release.version);
            }
        }
    }

    pub(crate) fn set_library_installed(&mut self, name: &str, version: Option<ReleaseVersion>) {
        if let Some(library) = self.libraries.get_mut(name) {
            library.installed = version;
        }
    }

    fn platform_mut(&mut self, id: &PlatformId) -> Option<&mut Platform> {
        self.packages
            .get_mut(&id.package)?
            .platforms
            .get_mut(&id.architecture)
    }

    fn tool_mut(&mut self, id: &ToolId) -> Option<&mut Tool> {
        self.packages.get_mut(&id.package)?.tools.get_mut(&id.name)
    }

    fn package_entry(&mut self, name: &str) -> &mut Package {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Package::new(name))
    }

    fn add_platform_release(&mut self, package: &str, entry: &IndexPlatform) -> &PlatformRelease {
        let release = PlatformRelease::from_index(package, entry);
        let platform = self
            .package_entry(package)
            .platforms
            .entry(entry.architecture.clone())
            .or_insert_with(|| Platform::new(release.platform.clone()));
        platform
            .releases
            .entry(release.version.clone())
            .or_insert(release)
    }

    fn add_tool_release(&mut self, package: &str, entry: &IndexTool) -> &ToolRelease {
        let release = ToolRelease::from_index(package, entry);
        let tool = self
            .package_entry(package)
            .tools
            .entry(entry.name.clone())
            .or_insert_with(|| Tool::new(release.tool.clone()));
        tool.releases
            .entry(release.version.clone())
            .or_insert(release)
    }

    fn add_library_release(&mut self, entry: &IndexLibrary) {
        self.libraries
            .entry(entry.name.clone())
            .or_insert_with(|| Library::new(&entry.name))
            .releases
            .entry(entry.version.clone())
            .or_insert_with(|| LibraryRelease::from(entry));
    }
}
