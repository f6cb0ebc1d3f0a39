//! Package index format
//!
//! The package index (`package_index.toml`) lists every package, platform
//! release, tool release and library the catalog knows about. The same entry
//! types are written into the install store as manifests of what is installed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::version::ReleaseVersion;

/// Top-level package index document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    /// Vendor packages
    #[serde(default)]
    pub packages: Vec<IndexPackage>,

    /// Libraries
    #[serde(default)]
    pub libraries: Vec<IndexLibrary>,
}

/// A vendor package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPackage {
    /// Package name (e.g., "arduino")
    pub name: String,

    /// Maintainer
    #[serde(default)]
    pub maintainer: Option<String>,

    /// Platform releases, one entry per version
    #[serde(default)]
    pub platforms: Vec<IndexPlatform>,

    /// Tool releases, one entry per version
    #[serde(default)]
    pub tools: Vec<IndexTool>,
}

/// One release of a platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPlatform {
    /// Architecture (e.g., "avr")
    pub architecture: String,

    /// Human readable platform name
    #[serde(default)]
    pub name: String,

    /// Release version
    pub version: ReleaseVersion,

    /// Tools this release needs
    #[serde(default)]
    pub tool_dependencies: Vec<IndexToolDependency>,

    /// Boards this release provides
    #[serde(default)]
    pub boards: Vec<IndexBoard>,
}

/// One release of a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexTool {
    /// Tool name (e.g., "avr-gcc")
    pub name: String,

    /// Release version
    pub version: ReleaseVersion,

    /// Further tools this release needs
    #[serde(default)]
    pub dependencies: Vec<IndexToolDependency>,
}

/// A `(packager, name, version)` tool dependency tuple
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexToolDependency {
    /// Package that owns the tool
    pub packager: String,

    /// Tool name
    pub name: String,

    /// Exact version required
    pub version: ReleaseVersion,
}

/// A board provided by a platform release
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexBoard {
    /// Board id, the last FQBN segment (e.g., "uno")
    pub id: String,

    /// Human readable name
    pub name: String,

    /// USB identifiers the board enumerates with
    #[serde(default)]
    pub usb_ids: Vec<IndexUsbId>,
}

/// A USB vendor/product id pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexUsbId {
    /// Vendor id
    pub vid: HexId,

    /// Product id
    pub pid: HexId,
}

/// One release of a library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexLibrary {
    /// Library name
    pub name: String,

    /// Release version
    pub version: ReleaseVersion,

    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// One-line description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
}

/// 16-bit identifier written as a hex string (`"0x2341"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexId(pub u16);

impl HexId {
    /// Parse `0x2341`, `0X2341` or `2341`
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u16::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| format!("invalid hex id '{s}': {e}"))
    }
}

impl TryFrom<String> for HexId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexId> for String {
    fn from(id: HexId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl IndexDocument {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_parses_correctly() {
        let toml_content = r#"
[[packages]]
name = "arduino"
maintainer = "Arduino"

[[packages.platforms]]
architecture = "avr"
name = "Arduino AVR Boards"
version = "1.8.6"
tool_dependencies = [
    { packager = "arduino", name = "avr-gcc", version = "7.3.0-atmel3.6.1-arduino7" },
]

[[packages.platforms.boards]]
id = "uno"
name = "Arduino Uno"
usb_ids = [{ vid = "0x2341", pid = "0x0043" }, { vid = "0x2341", pid = "0x0001" }]

[[packages.tools]]
name = "avr-gcc"
version = "7.3.0-atmel3.6.1-arduino7"

[[libraries]]
name = "Servo"
version = "1.1.8"
"#;

        let index = IndexDocument::from_toml(toml_content).unwrap();
        assert_eq!(index.packages.len(), 1);
        let package = &index.packages[0];
        assert_eq!(package.platforms[0].tool_dependencies[0].name, "avr-gcc");
        assert_eq!(package.platforms[0].boards[0].usb_ids[0].vid, HexId(0x2341));
        assert_eq!(package.platforms[0].boards[0].usb_ids[0].pid, HexId(0x0043));
        assert_eq!(index.libraries[0].version.as_str(), "1.1.8");
    }

    #[test]
    fn test_hex_id_accepts_prefixless_and_uppercase() {
        assert_eq!(HexId::parse("2341").unwrap(), HexId(0x2341));
        assert_eq!(HexId::parse("0X00AB").unwrap(), HexId(0xab));
        assert!(HexId::parse("0xZZ").is_err());
        assert!(HexId::parse("0x12345").is_err());
    }

    #[test]
    fn test_hex_id_display() {
        assert_eq!(HexId(0x43).to_string(), "0x0043");
    }

    #[test]
    fn test_invalid_usb_id_is_rejected() {
        let toml_content = r#"
[[packages]]
name = "arduino"

[[packages.platforms]]
architecture = "avr"
version = "1.8.6"

[[packages.platforms.boards]]
id = "uno"
name = "Arduino Uno"
usb_ids = [{ vid = "zz", pid = "0x0043" }]
"#;
        assert!(IndexDocument::from_toml(toml_content).is_err());
    }
}
