//! Error types for boardman
//!
//! Domain-specific error types using thiserror. Lower layers (resolver,
//! dependency walker, install store, sketch metadata) each have their own
//! enum; [`CommandError`] is the taxonomy surfaced by the request handlers.

use std::path::PathBuf;
use thiserror::Error;

/// Reference resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Platform, tool or library unknown to the catalog
    #[error("{kind} '{reference}' not found")]
    Unknown { kind: ReleaseKind, reference: String },

    /// Exact version requested but not present in the catalog
    #[error("{kind} '{reference}' not found")]
    VersionNotFound { kind: ReleaseKind, reference: String },

    /// Known to the catalog but no release is installed
    #[error("{kind} '{reference}' is not installed")]
    NotInstalled { kind: ReleaseKind, reference: String },
}

impl ResolveError {
    /// The textual reference that could not be resolved
    pub fn reference(&self) -> &str {
        match self {
            Self::Unknown { reference, .. }
            | Self::VersionNotFound { reference, .. }
            | Self::NotInstalled { reference, .. } => reference,
        }
    }
}

/// What kind of release a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Platform,
    Tool,
    Library,
}

impl std::fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform => f.write_str("platform"),
            Self::Tool => f.write_str("tool"),
            Self::Library => f.write_str("library"),
        }
    }
}

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// A declared tool dependency cannot be located in the catalog
    #[error("Can't find dependency '{dependency}' required by '{required_by}'")]
    Unresolved {
        required_by: String,
        dependency: String,
        #[source]
        source: ResolveError,
    },

    /// Tool releases depend on each other in a loop
    #[error("Circular tool dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Install store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Installed manifest is not valid
    #[error("Invalid install manifest '{path}': {error}")]
    InvalidManifest { path: PathBuf, error: String },
}

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Package index could not be read
    #[error("Failed to read package index '{path}': {error}")]
    ReadIndex { path: PathBuf, error: String },

    /// Package index is not valid TOML
    #[error("Failed to parse package index '{path}': {error}")]
    ParseIndex { path: PathBuf, error: String },

    /// Installed state could not be scanned
    #[error("Failed to scan installed packages: {0}")]
    Store(#[from] StoreError),
}

/// Sketch metadata errors
#[derive(Error, Debug)]
pub enum SketchError {
    /// Sketch path is not a directory
    #[error("Sketch path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Metadata file could not be read
    #[error("Failed to read sketch metadata '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Metadata file is not valid JSON
    #[error("Failed to parse sketch metadata '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Metadata file could not be written
    #[error("Failed to write sketch metadata '{path}': {error}")]
    Write { path: PathBuf, error: String },
}

/// Device discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// A device source failed to enumerate
    #[error("Device source '{source_name}' failed: {error}")]
    Enumeration { source_name: String, error: String },
}

/// Errors surfaced by the lifecycle and attach request handlers
#[derive(Error, Debug)]
pub enum CommandError {
    /// Unknown catalog instance
    #[error("Invalid instance {id}")]
    InvalidInstance { id: u32 },

    /// Platform reference could not be resolved
    #[error("Platform '{platform}' not found")]
    PlatformNotFound {
        platform: String,
        #[source]
        source: ResolveError,
    },

    /// Tool or other catalog entry could not be resolved
    #[error("{message}")]
    NotFound {
        message: String,
        #[source]
        source: ResolveError,
    },

    /// Dependencies of a platform could not be resolved
    #[error("Can't find dependencies for platform {platform}")]
    DependencyResolution {
        platform: String,
        #[source]
        source: DependencyError,
    },

    /// Removing installed files failed; state is not rolled back
    #[error("{message}")]
    FailedUninstall {
        message: String,
        #[source]
        source: StoreError,
    },

    /// Writing installed files failed
    #[error("{message}")]
    FailedInstall {
        message: String,
        #[source]
        source: StoreError,
    },

    /// Malformed locator, unsupported scheme, or no matching board
    #[error("{message}")]
    InvalidArgument { message: String },

    /// Sketch metadata could not be persisted
    #[error("{message}")]
    PermissionDenied {
        message: String,
        #[source]
        source: SketchError,
    },

    /// Malformed library reference
    #[error("Invalid library '{reference}': {reason}")]
    InvalidLibrary { reference: String, reason: String },

    /// Sketch could not be opened
    #[error("Can't open sketch: {0}")]
    CantOpenSketch(#[source] SketchError),

    /// Catalog reindex failed
    #[error("Failed to reindex catalog: {0}")]
    Reindex(#[source] CatalogError),
}
