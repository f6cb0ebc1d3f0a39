//! CLI command implementations
//!
//! Each command group is implemented in its own submodule.

pub mod board;
pub mod library;
pub mod platform;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::core::catalog::Catalog;
use crate::core::discovery::DiscoveryMonitor;
use crate::core::global_config::GlobalConfig;
use crate::core::instance::Instances;
use crate::infra::dirs::BoardmanDirs;
use crate::infra::network::NetworkProbeSource;
use crate::infra::serial::SysfsSerialSource;
use crate::infra::store::FsInstallStore;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage board platforms
    Core {
        #[command(subcommand)]
        command: CoreCommands,
    },

    /// Manage libraries
    Lib {
        #[command(subcommand)]
        command: LibCommands,
    },

    /// Attach sketches and list boards
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },
}

/// Platform subcommands
#[derive(Subcommand, Debug)]
pub enum CoreCommands {
    /// Install a platform and the tools it needs
    Install {
        /// Platform reference (package:architecture[@version])
        platform: String,
    },

    /// Uninstall a platform and the tools no other platform needs
    Uninstall {
        /// Platform reference (package:architecture[@version])
        platform: String,
    },

    /// List installed platforms
    List,
}

/// Library subcommands
#[derive(Subcommand, Debug)]
pub enum LibCommands {
    /// Install a library
    Install {
        /// Library reference (name[@version])
        library: String,
    },

    /// Uninstall a library
    Uninstall {
        /// Library reference (name[@version])
        library: String,
    },
}

/// Board subcommands
#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Attach a sketch to a board
    Attach {
        /// FQBN, serial port or network address of the board
        uri: String,

        /// Sketch directory (defaults to the current directory)
        #[arg(short, long)]
        sketch: Option<PathBuf>,

        /// How long to search for the board (e.g. 5s, 1500ms)
        #[arg(short, long)]
        timeout: Option<String>,
    },

    /// List boards of installed platforms
    List,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, quiet: bool) -> Result<()> {
        let mut session = Session::open()?;
        match self {
            Self::Core { command } => match command {
                CoreCommands::Install { platform: reference } => {
                    platform::execute_install(&mut session, &reference, quiet)
                }
                CoreCommands::Uninstall { platform: reference } => {
                    platform::execute_uninstall(&mut session, &reference, quiet)
                }
                CoreCommands::List => platform::execute_list(&session),
            },
            Self::Lib { command } => match command {
                LibCommands::Install { library: reference } => {
                    library::execute_install(&mut session, &reference, quiet)
                }
                LibCommands::Uninstall { library: reference } => {
                    library::execute_uninstall(&mut session, &reference, quiet)
                }
            },
            Self::Board { command } => match command {
                BoardCommands::Attach {
                    uri,
                    sketch,
                    timeout,
                } => {
                    let sketch = match sketch {
                        Some(path) => path,
                        None => std::env::current_dir()?,
                    };
                    board::execute_attach(&session, &uri, sketch, timeout, quiet).await
                }
                BoardCommands::List => board::execute_list(&session),
            },
        }
    }
}

/// Configuration and catalog instance shared by the commands of one run
#[derive(Debug)]
pub struct Session {
    pub config: GlobalConfig,
    pub instances: Instances,
    pub instance_id: u32,
}

impl Session {
    /// Load configuration and open a catalog over the data directory
    pub fn open() -> Result<Self> {
        let dirs = BoardmanDirs::new();
        let config = GlobalConfig::load(&dirs).context("Failed to load global configuration")?;

        let index_path = config.index_path(&dirs);
        let store = FsInstallStore::new(&dirs.data_dir());
        let catalog = Catalog::load(&index_path, Box::new(store))
            .with_context(|| format!("Failed to load package index '{}'", index_path.display()))?;
        tracing::debug!(data_dir = %dirs.data_dir().display(), "Catalog loaded");

        let mut instances = Instances::new();
        let instance_id = instances.create(catalog);
        Ok(Self {
            config,
            instances,
            instance_id,
        })
    }

    /// The session's catalog
    pub fn catalog(&self) -> Result<&Catalog> {
        Ok(self.instances.get(self.instance_id)?)
    }

    /// Discovery monitor over sysfs serial ports and configured endpoints
    pub fn monitor(&self) -> DiscoveryMonitor {
        DiscoveryMonitor::new(self.config.discovery_interval())
            .with_source(SysfsSerialSource::default())
            .with_source(NetworkProbeSource::new(
                self.config.discovery.network.clone(),
                self.config.probe_timeout(),
            ))
    }
}
