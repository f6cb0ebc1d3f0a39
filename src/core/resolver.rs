//! Reference resolution
//!
//! Turns loosely specified platform, tool and library references into
//! concrete catalog releases. A reference with an explicit version must match
//! that version exactly; a reference without one resolves to the installed
//! release. There is no fallback to the nearest or latest version.

use std::fmt;
use std::str::FromStr;

use crate::error::{ReleaseKind, ResolveError};

use super::catalog::{Catalog, LibraryRelease, PlatformId, PlatformRelease, ToolId, ToolRelease};
use super::version::ReleaseVersion;

/// Reference parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reference '{input}': {reason}")]
pub struct ReferenceParseError {
    pub input: String,
    pub reason: &'static str,
}

/// Request-side locator of a platform: `package:architecture[@version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReference {
    pub package: String,
    pub architecture: String,
    pub version: Option<ReleaseVersion>,
}

/// Request-side locator of a tool: `package:name[@version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReference {
    pub package: String,
    pub name: String,
    pub version: Option<ReleaseVersion>,
}

/// Request-side locator of a library: `name[@version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReference {
    pub name: String,
    pub version: Option<ReleaseVersion>,
}

impl PlatformReference {
    pub fn new(package: &str, architecture: &str, version: Option<&str>) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            version: version.map(ReleaseVersion::from),
        }
    }

    pub fn id(&self) -> PlatformId {
        PlatformId::new(&self.package, &self.architecture)
    }
}

impl ToolReference {
    pub fn new(package: &str, name: &str, version: Option<&str>) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
            version: version.map(ReleaseVersion::from),
        }
    }

    pub fn id(&self) -> ToolId {
        ToolId::new(&self.package, &self.name)
    }
}

impl LibraryReference {
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            version: version.map(ReleaseVersion::from),
        }
    }
}

fn split_version(input: &str) -> Result<(&str, Option<ReleaseVersion>), ReferenceParseError> {
    match input.split_once('@') {
        Some((_, "")) => Err(ReferenceParseError {
            input: input.to_string(),
            reason: "empty version after '@'",
        }),
        Some((head, version)) => Ok((head, Some(ReleaseVersion::from(version)))),
        None => Ok((input, None)),
    }
}

fn split_pair(input: &str) -> Result<(String, String, Option<ReleaseVersion>), ReferenceParseError> {
    let (head, version) = split_version(input)?;
    match head.split_once(':') {
        Some((package, name)) if !package.is_empty() && !name.is_empty() && !name.contains(':') => {
            Ok((package.to_string(), name.to_string(), version))
        }
        _ => Err(ReferenceParseError {
            input: input.to_string(),
            reason: "expected package:name[@version]",
        }),
    }
}

impl FromStr for PlatformReference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (package, architecture, version) = split_pair(s.trim())?;
        Ok(Self {
            package,
            architecture,
            version,
        })
    }
}

impl FromStr for ToolReference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (package, name, version) = split_pair(s.trim())?;
        Ok(Self {
            package,
            name,
            version,
        })
    }
}

impl FromStr for LibraryReference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = split_version(s.trim())?;
        if name.trim().is_empty() {
            return Err(ReferenceParseError {
                input: s.to_string(),
                reason: "empty library name",
            });
        }
        Ok(Self {
            name: name.trim().to_string(),
            version,
        })
    }
}

fn fmt_versioned(f: &mut fmt::Formatter<'_>, head: &str, version: Option<&ReleaseVersion>) -> fmt::Result {
    match version {
        Some(version) => write!(f, "{head}@{version}"),
        None => f.write_str(head),
    }
}

impl fmt::Display for PlatformReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_versioned(f, &format!("{}:{}", self.package, self.architecture), self.version.as_ref())
    }
}

impl fmt::Display for ToolReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_versioned(f, &format!("{}:{}", self.package, self.name), self.version.as_ref())
    }
}

impl fmt::Display for LibraryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_versioned(f, &self.name, self.version.as_ref())
    }
}

/// Resolve a platform reference to a catalog release
pub fn resolve_platform<'a>(
    catalog: &'a Catalog,
    reference: &PlatformReference,
) -> Result<&'a PlatformRelease, ResolveError> {
    let platform = catalog
        .platform(&reference.id())
        .ok_or_else(|| ResolveError::Unknown {
            kind: ReleaseKind::Platform,
            reference: reference.to_string(),
        })?;

    match &reference.version {
        Some(version) => platform
            .releases
            .get(version)
            .ok_or_else(|| ResolveError::VersionNotFound {
                kind: ReleaseKind::Platform,
                reference: reference.to_string(),
            }),
        None => platform
            .installed_release()
            .ok_or_else(|| ResolveError::NotInstalled {
                kind: ReleaseKind::Platform,
                reference: reference.to_string(),
            }),
    }
}

/// Resolve a tool reference to a catalog release
pub fn resolve_tool<'a>(
    catalog: &'a Catalog,
    reference: &ToolReference,
) -> Result<&'a ToolRelease, ResolveError> {
    let tool = catalog
        .tool(&reference.id())
        .ok_or_else(|| ResolveError::Unknown {
            kind: ReleaseKind::Tool,
            reference: reference.to_string(),
        })?;

    match &reference.version {
        Some(version) => tool
            .releases
            .get(version)
            .ok_or_else(|| ResolveError::VersionNotFound {
                kind: ReleaseKind::Tool,
                reference: reference.to_string(),
            }),
        // Several versions of a tool may be installed; the newest wins.
        None => tool
            .installed_releases()
            .last()
            .ok_or_else(|| ResolveError::NotInstalled {
                kind: ReleaseKind::Tool,
                reference: reference.to_string(),
            }),
    }
}

/// Resolve a library reference to a catalog release
pub fn resolve_library<'a>(
    catalog: &'a Catalog,
    reference: &LibraryReference,
) -> Result<&'a LibraryRelease, ResolveError> {
    let library = catalog
        .library(&reference.name)
        .ok_or_else(|| ResolveError::Unknown {
            kind: ReleaseKind::Library,
            reference: reference.to_string(),
        })?;

    match &reference.version {
        Some(version) => library
            .releases
            .get(version)
            .ok_or_else(|| ResolveError::VersionNotFound {
                kind: ReleaseKind::Library,
                reference: reference.to_string(),
            }),
        None => library
            .installed_release()
            .ok_or_else(|| ResolveError::NotInstalled {
                kind: ReleaseKind::Library,
                reference: reference.to_string(),
            }),
    }
}
