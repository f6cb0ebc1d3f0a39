//! CLI implementation for `boardman lib` commands

use anyhow::{Context, Result};

use crate::cli::output::{status, SpinnerProgress};
use crate::core::install::install_library;
use crate::core::resolver::LibraryReference;
use crate::core::uninstall::{library_uninstall, LibraryUninstallOutcome, LibraryUninstallRequest};

use super::Session;

/// Execute `lib install`
pub fn execute_install(session: &mut Session, reference: &str, quiet: bool) -> Result<()> {
    let reference: LibraryReference = reference.parse()?;
    let catalog = session.instances.get_mut(session.instance_id)?;

    let mut progress = SpinnerProgress::new(&format!("Installing {reference}"), quiet);
    let result = install_library(catalog, &reference, &mut progress);
    progress.finish();
    result.with_context(|| format!("Failed to install library '{reference}'"))?;

    if !quiet {
        println!("{} Installed {reference}", status::SUCCESS);
    }
    Ok(())
}

/// Execute `lib uninstall`
pub fn execute_uninstall(session: &mut Session, reference: &str, quiet: bool) -> Result<()> {
    let (name, version) = match reference.split_once('@') {
        Some((name, version)) => (name, Some(version.to_string())),
        None => (reference, None),
    };
    let request = LibraryUninstallRequest {
        instance_id: session.instance_id,
        name: name.to_string(),
        version,
    };

    let mut progress = SpinnerProgress::new(&format!("Uninstalling {reference}"), quiet);
    let result = library_uninstall(&mut session.instances, &request, &mut progress);
    progress.finish();
    let outcome = result.with_context(|| format!("Failed to uninstall library '{reference}'"))?;

    if !quiet {
        match outcome {
            LibraryUninstallOutcome::Uninstalled { library } => {
                println!("{} Uninstalled {library}", status::SUCCESS);
            }
            LibraryUninstallOutcome::NotInstalled { name } => {
                println!("{} Library {name} is not installed", status::INFO);
            }
        }
    }
    Ok(())
}
