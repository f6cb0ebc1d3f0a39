//! Common test utilities and helpers
//!
//! Integration tests share a sample package index and a temporary
//! environment with separate data, config and sketch directories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use boardman::core::catalog::Catalog;
use boardman::core::index::IndexDocument;
use boardman::infra::store::FsInstallStore;

/// Sample package index
///
/// `arduino:avr` and `arduino:megaavr` share `avr-gcc` and `avrdude`;
/// `avrdude` pulls in `libusb`. `arduino:broken` asks for a `picotool`
/// version the index does not carry.
pub const SAMPLE_INDEX: &str = r#"
[[packages]]
name = "arduino"
maintainer = "Arduino"

[[packages.platforms]]
architecture = "avr"
name = "Arduino AVR Boards"
version = "1.8.6"
tool_dependencies = [
    { packager = "arduino", name = "avr-gcc", version = "7.3.0" },
    { packager = "arduino", name = "avrdude", version = "6.3.0" },
]

[[packages.platforms.boards]]
id = "mega"
name = "Arduino Mega or Mega 2560"
usb_ids = [{ vid = "0x2341", pid = "0x0042" }]

[[packages.platforms.boards]]
id = "uno"
name = "Arduino Uno"
usb_ids = [{ vid = "0x2341", pid = "0x0043" }, { vid = "0x2341", pid = "0x0001" }]

[[packages.platforms]]
architecture = "megaavr"
name = "Arduino megaAVR Boards"
version = "1.8.8"
tool_dependencies = [
    { packager = "arduino", name = "avr-gcc", version = "7.3.0" },
    { packager = "arduino", name = "avrdude", version = "6.3.0" },
]

[[packages.platforms.boards]]
id = "uno2018"
name = "Arduino Uno WiFi Rev2"
usb_ids = [{ vid = "0x03eb", pid = "0x2145" }]

[[packages.platforms]]
architecture = "broken"
name = "Broken Boards"
version = "1.0.0"
tool_dependencies = [{ packager = "arduino", name = "picotool", version = "1.0" }]

[[packages.tools]]
name = "avr-gcc"
version = "7.3.0"

[[packages.tools]]
name = "avrdude"
version = "6.3.0"
dependencies = [{ packager = "arduino", name = "libusb", version = "1.0.26" }]

[[packages.tools]]
name = "libusb"
version = "1.0.26"

[[packages.tools]]
name = "picotool"
version = "2.0"

[[packages]]
name = "esp8266"

[[packages.platforms]]
architecture = "esp8266"
name = "ESP8266 Boards"
version = "3.1.2"
tool_dependencies = [{ packager = "esp8266", name = "xtensa-lx106-elf-gcc", version = "3.1.0" }]

[[packages.platforms.boards]]
id = "nodemcuv2"
name = "NodeMCU 1.0 (ESP-12E Module)"

[[packages.tools]]
name = "xtensa-lx106-elf-gcc"
version = "3.1.0"

[[libraries]]
name = "Servo"
version = "1.1.8"
author = "Michael Margolis, Arduino"

[[libraries]]
name = "Servo"
version = "1.2.1"
author = "Michael Margolis, Arduino"
"#;

/// Temporary boardman environment
pub struct TestEnv {
    pub data: TempDir,
    pub config: TempDir,
    pub sketch: TempDir,
}

impl TestEnv {
    /// Create an environment with the sample index in the data directory
    pub fn new() -> Self {
        let env = Self {
            data: TempDir::new().expect("Failed to create data directory"),
            config: TempDir::new().expect("Failed to create config directory"),
            sketch: TempDir::new().expect("Failed to create sketch directory"),
        };
        std::fs::write(env.data.path().join("package_index.toml"), SAMPLE_INDEX)
            .expect("Failed to write package index");
        env
    }

    pub fn data_path(&self) -> PathBuf {
        self.data.path().to_path_buf()
    }

    pub fn sketch_path(&self) -> PathBuf {
        self.sketch.path().to_path_buf()
    }

    /// Catalog over the sample index and this environment's install store
    pub fn catalog(&self) -> Catalog {
        let index = IndexDocument::from_toml(SAMPLE_INDEX).expect("Failed to parse sample index");
        Catalog::new(&index, Box::new(FsInstallStore::new(self.data.path())))
            .expect("Failed to create catalog")
    }

    /// Write `config.toml` in the config directory
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config.path().join("config.toml"), content).expect("Failed to write config");
    }

    /// Run the boardman binary against this environment
    pub fn run(&self, args: &[&str]) -> Output {
        run_boardman(self.data.path(), self.config.path(), self.sketch.path(), args)
    }

    /// Whether a file exists below the data directory
    pub fn data_file_exists(&self, relative: &str) -> bool {
        self.data.path().join(relative).exists()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to run the boardman binary with isolated directories
pub fn run_boardman(data: &Path, config: &Path, cwd: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_boardman"));
    cmd.current_dir(cwd)
        .env("BOARDMAN_DATA_DIR", data)
        .env("BOARDMAN_CONFIG_DIR", config)
        .env_remove("RUST_LOG");
    for arg in args {
        cmd.arg(arg);
    }
    cmd.output().expect("Failed to execute boardman")
}
