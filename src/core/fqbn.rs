//! Fully qualified board names
//!
//! An FQBN is `package:architecture:board_id`, optionally followed by a fourth
//! segment of comma separated `option=value` pairs
//! (`arduino:avr:nano:cpu=atmega328old`).

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// FQBN parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FqbnError {
    /// Wrong number of `:` separated segments
    #[error("invalid fqbn '{fqbn}': expected package:architecture:board[:options]")]
    Segments { fqbn: String },

    /// A segment is empty or contains unsupported characters
    #[error("invalid fqbn '{fqbn}': invalid {segment} '{value}'")]
    InvalidSegment {
        fqbn: String,
        segment: &'static str,
        value: String,
    },

    /// A board option is malformed
    #[error("invalid fqbn '{fqbn}': invalid config option '{option}'")]
    InvalidOption { fqbn: String, option: String },
}

/// A parsed fully qualified board name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fqbn {
    pub package: String,
    pub architecture: String,
    pub board_id: String,
    pub config: BTreeMap<String, String>,
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid segment regex"))
}

fn option_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9=._-]*$").expect("valid option regex"))
}

impl Fqbn {
    /// Create an FQBN without config options
    pub fn new(package: &str, architecture: &str, board_id: &str) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            board_id: board_id.to_string(),
            config: BTreeMap::new(),
        }
    }
}

impl FromStr for Fqbn {
    type Err = FqbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(FqbnError::Segments { fqbn: s.to_string() });
        }

        for (segment, value) in ["package", "architecture", "board id"].into_iter().zip(&parts) {
            if !segment_regex().is_match(value) {
                return Err(FqbnError::InvalidSegment {
                    fqbn: s.to_string(),
                    segment,
                    value: (*value).to_string(),
                });
            }
        }

        let mut config = BTreeMap::new();
        if let Some(options) = parts.get(3) {
            for option in options.split(',') {
                let invalid = || FqbnError::InvalidOption {
                    fqbn: s.to_string(),
                    option: option.to_string(),
                };
                let (key, value) = option.split_once('=').ok_or_else(invalid)?;
                if !segment_regex().is_match(key) || !option_value_regex().is_match(value) {
                    return Err(invalid());
                }
                config.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self {
            package: parts[0].to_string(),
            architecture: parts[1].to_string(),
            board_id: parts[2].to_string(),
            config,
        })
    }
}

impl fmt::Display for Fqbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package, self.architecture, self.board_id)?;
        if !self.config.is_empty() {
            let options: Vec<String> = self
                .config
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, ":{}", options.join(","))?;
        }
        Ok(())
    }
}
