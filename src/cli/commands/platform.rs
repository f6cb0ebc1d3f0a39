//! CLI implementation for `boardman core` commands

use anyhow::{Context, Result};

use crate::cli::output::{status, SpinnerProgress};
use crate::core::install::install_platform;
use crate::core::resolver::PlatformReference;
use crate::core::uninstall::{platform_uninstall, PlatformUninstallRequest};

use super::Session;

/// Execute `core install`
pub fn execute_install(session: &mut Session, reference: &str, quiet: bool) -> Result<()> {
    let reference: PlatformReference = reference.parse()?;
    let catalog = session.instances.get_mut(session.instance_id)?;

    let mut progress = SpinnerProgress::new(&format!("Installing {reference}"), quiet);
    let result = install_platform(catalog, &reference, &mut progress);
    progress.finish();
    let report = result.with_context(|| format!("Failed to install platform '{reference}'"))?;

    if !quiet {
        println!("{} Installed {}", status::SUCCESS, report.platform);
        for tool in &report.installed_tools {
            println!("  Installed tool {tool}");
        }
        if let Some(previous) = &report.replaced {
            println!("  Replaced {previous}");
        }
    }
    Ok(())
}

/// Execute `core uninstall`
///
/// The platform counts as uninstalled even when some of its tools could not
/// be removed; those are reported as warnings.
pub fn execute_uninstall(session: &mut Session, reference: &str, quiet: bool) -> Result<()> {
    let reference: PlatformReference = reference.parse()?;
    let request = PlatformUninstallRequest {
        instance_id: session.instance_id,
        package: reference.package.clone(),
        architecture: reference.architecture.clone(),
        version: reference.version.as_ref().map(ToString::to_string),
    };

    let mut progress = SpinnerProgress::new(&format!("Uninstalling {reference}"), quiet);
    let result = platform_uninstall(&mut session.instances, &request, &mut progress);
    progress.finish();
    let report = result.with_context(|| format!("Failed to uninstall platform '{reference}'"))?;

    for failure in &report.failed_tools {
        eprintln!(
            "{} Could not remove tool {}: {}",
            status::WARNING,
            failure.tool,
            failure.error
        );
    }
    if !quiet {
        println!("{} Uninstalled {}", status::SUCCESS, report.platform);
        for tool in &report.removed_tools {
            println!("  Removed tool {tool}");
        }
        for tool in &report.kept_tools {
            println!("  Kept tool {tool} (still required)");
        }
    }
    Ok(())
}

/// Execute `core list`
pub fn execute_list(session: &Session) -> Result<()> {
    let catalog = session.catalog()?;
    let installed: Vec<_> = catalog.installed_platform_releases().collect();

    if installed.is_empty() {
        println!("No platforms installed.");
        return Ok(());
    }

    for release in installed {
        let latest = catalog
            .platform(&release.platform)
            .and_then(|platform| platform.latest_release())
            .filter(|latest| latest.version != release.version);
        match latest {
            Some(latest) => println!(
                "{}  {}  {} (latest {})",
                release.platform, release.version, release.name, latest.version
            ),
            None => println!("{}  {}  {}", release.platform, release.version, release.name),
        }
    }
    Ok(())
}
