//! Board subcommand implementations
//!
//! Implements `boardman board attach` and `boardman board list`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::output::{status, SpinnerProgress};
use crate::core::attach::{board_attach, BoardAttachRequest};

use super::Session;

/// Execute the board attach command
///
/// Without `--timeout` the settle duration comes from the global
/// configuration, falling back to the built-in default.
pub async fn execute_attach(
    session: &Session,
    uri: &str,
    sketch_path: PathBuf,
    timeout: Option<String>,
    quiet: bool,
) -> Result<()> {
    let request = BoardAttachRequest {
        instance_id: session.instance_id,
        sketch_path,
        board_uri: uri.to_string(),
        search_timeout: timeout.unwrap_or_else(|| session.config.settle_timeout().to_string()),
    };
    let monitor = session.monitor();

    let mut progress = SpinnerProgress::new(&format!("Searching for board at {uri}"), quiet);
    let result = board_attach(&session.instances, &monitor, &request, &mut progress).await;
    progress.finish();
    let response = result.with_context(|| format!("Failed to attach board '{uri}'"))?;

    if !quiet {
        println!(
            "{} Sketch {} attached to {}",
            status::SUCCESS,
            request.sketch_path.display(),
            response.fqbn
        );
    }
    Ok(())
}

/// Execute the board list command
///
/// Lists the boards provided by installed platforms.
pub fn execute_list(session: &Session) -> Result<()> {
    let boards: Vec<_> = session.catalog()?.installed_boards().collect();

    if boards.is_empty() {
        println!("No boards available. Install a platform with 'boardman core install'.");
        return Ok(());
    }

    for board in &boards {
        print!("  {:<32} {}", board.fqbn().to_string(), board.name);
        if !board.usb_ids.is_empty() {
            let ids: Vec<String> = board.usb_ids.iter().map(ToString::to_string).collect();
            print!("  [{}]", ids.join(", "));
        }
        println!();
    }
    println!();
    println!("{} board(s) available.", boards.len());

    Ok(())
}
