//! Default configuration values

use std::time::Duration;

/// Settle window used when the attach timeout cannot be parsed
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between discovery scans
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound for a single network endpoint probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Package index file name inside the data directory
pub const INDEX_FILE: &str = "package_index.toml";

/// Global configuration file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Install manifest of platform and tool releases
pub const INSTALLED_MANIFEST: &str = "installed.json";

/// Install manifest of libraries
pub const LIBRARY_MANIFEST: &str = "library.json";

/// Sketch metadata file name inside a sketch directory
pub const SKETCH_METADATA_FILE: &str = "sketch.json";

/// Scheme assumed for locators written without one
pub const SERIAL_SCHEME: &str = "serial";

/// Root of the tty class in sysfs
pub const SYSFS_TTY_CLASS: &str = "/sys/class/tty";
