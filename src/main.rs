//! Boardman CLI - board platform, tool and library manager
//!
//! Entry point for the boardman command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use boardman::cli::output::display_error;
use boardman::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
