//! Release version handling
//!
//! Catalog versions are mostly semver (`1.8.6`, `7.3.0-atmel3.6.1-arduino7`)
//! but vendors also publish things like `1.0` or `2020.01.22`. A
//! [`ReleaseVersion`] keeps the raw string for exact matching and orders
//! semver-parsable versions by semver precedence.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A release version as published in the package index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ReleaseVersion {
    raw: String,
    parsed: Option<Version>,
}

impl ReleaseVersion {
    /// Create a version from its textual form
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = Version::parse(&raw).ok();
        Self { raw, parsed }
    }

    /// The version exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the version follows semver
    pub fn is_semver(&self) -> bool {
        self.parsed.is_some()
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ReleaseVersion {}

impl std::hash::Hash for ReleaseVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for ReleaseVersion {
    // Semver versions sort before free-form ones; ties fall back to the raw text
    // so the order stays consistent with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for ReleaseVersion {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ReleaseVersion {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ReleaseVersion> for String {
    fn from(version: ReleaseVersion) -> Self {
        version.raw
    }
}

impl FromStr for ReleaseVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
