//! Platform, tool and library installation
//!
//! Installing records a catalog release in the install store. Fetching and
//! unpacking archives is handled by the download layer before these run.
//! A platform install first installs every missing tool of its dependency
//! closure, and replaces any other installed release of the same platform.

use crate::error::{CommandError, ReleaseKind, ResolveError};

use super::catalog::{Catalog, LibraryRelease, PlatformRelease, ToolRelease};
use super::dependencies::dependencies_of;
use super::index::{IndexLibrary, IndexPlatform, IndexTool};
use super::progress::{ProgressEvent, ProgressSink};
use super::resolver::{
    resolve_library, resolve_platform, resolve_tool, LibraryReference, PlatformReference,
    ToolReference,
};
use super::uninstall::{uninstall_platform_release, uninstall_tool_release};

/// Outcome of a platform install
#[derive(Debug, Default)]
pub struct PlatformInstallReport {
    /// The installed platform release
    pub platform: String,
    /// Tools installed along with it
    pub installed_tools: Vec<String>,
    /// Previously installed release that was replaced
    pub replaced: Option<String>,
}

/// Install a platform release and its missing tools
///
/// A reference without a version installs the newest catalog release.
pub fn install_platform(
    catalog: &mut Catalog,
    reference: &PlatformReference,
    sink: &mut dyn ProgressSink,
) -> Result<PlatformInstallReport, CommandError> {
    let (release, tools, previous) = {
        let release = if reference.version.is_some() {
            resolve_platform(catalog, reference)
        } else {
            catalog
                .platform(&reference.id())
                .and_then(|platform| platform.latest_release())
                .ok_or_else(|| ResolveError::Unknown {
                    kind: ReleaseKind::Platform,
                    reference: reference.to_string(),
                })
        }
        .map_err(|source| CommandError::PlatformNotFound {
            platform: reference.to_string(),
            source,
        })?;

        let deps = dependencies_of(catalog, release).map_err(|source| {
            CommandError::DependencyResolution {
                platform: release.to_string(),
                source,
            }
        })?;
        let tools: Vec<ToolRelease> = deps.tools.into_iter().cloned().collect();
        let previous = catalog
            .platform(&release.platform)
            .and_then(|platform| platform.installed_release())
            .cloned();
        (release.clone(), tools, previous)
    };

    let mut report = PlatformInstallReport {
        platform: release.to_string(),
        ..PlatformInstallReport::default()
    };

    if previous.as_ref() == Some(&release) {
        sink.on_progress(ProgressEvent::completed(format!(
            "Platform {release} already installed"
        )));
        return Ok(report);
    }

    for tool in &tools {
        if catalog.is_tool_installed(tool) {
            continue;
        }
        install_tool_release(catalog, tool, sink)?;
        report.installed_tools.push(tool.to_string());
    }

    if let Some(previous) = &previous {
        replace_platform_release(catalog, previous, sink)?;
        report.replaced = Some(previous.to_string());
    }

    install_platform_release(catalog, &release, sink)?;

    if let Some(previous) = &previous {
        remove_unneeded_tools(catalog, previous, sink);
    }

    Ok(report)
}

/// Install a single tool release
pub fn install_tool(
    catalog: &mut Catalog,
    reference: &ToolReference,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    let release = resolve_tool(catalog, reference)
        .map_err(|source| CommandError::NotFound {
            message: format!("Tool '{reference}' not found"),
            source,
        })?
        .clone();

    if catalog.is_tool_installed(&release) {
        sink.on_progress(ProgressEvent::completed(format!("Tool {release} already installed")));
        return Ok(());
    }
    install_tool_release(catalog, &release, sink)
}

/// Install a library release, replacing any other installed version
///
/// A reference without a version installs the newest catalog release.
pub fn install_library(
    catalog: &mut Catalog,
    reference: &LibraryReference,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    let release: LibraryRelease = if reference.version.is_some() {
        resolve_library(catalog, reference)
    } else {
        catalog
            .library(&reference.name)
            .and_then(|library| library.latest_release())
            .ok_or_else(|| ResolveError::Unknown {
                kind: ReleaseKind::Library,
                reference: reference.to_string(),
            })
    }
    .map_err(|source| CommandError::NotFound {
        message: format!("Library '{reference}' not found"),
        source,
    })?
    .clone();

    let previous = catalog
        .library(&release.name)
        .and_then(|library| library.installed_release())
        .cloned();
    if previous.as_ref() == Some(&release) {
        sink.on_progress(ProgressEvent::completed(format!(
            "Library {release} already installed"
        )));
        return Ok(());
    }

    tracing::info!(library = %release, "Installing library");
    if let Some(previous) = previous {
        sink.on_progress(ProgressEvent::named(format!("Replacing {previous} with {release}")));
        catalog
            .store()
            .remove_library(&previous.name)
            .map_err(|source| CommandError::FailedUninstall {
                message: format!("Error uninstalling library {previous}"),
                source,
            })?;
    }

    sink.on_progress(ProgressEvent::named(format!("Installing {release}")));
    catalog
        .store()
        .install_library(&IndexLibrary::from(&release))
        .map_err(|source| CommandError::FailedInstall {
            message: format!("Error installing library {release}"),
            source,
        })?;
    catalog.set_library_installed(&release.name, Some(release.version.clone()));

    sink.on_progress(ProgressEvent::completed(format!("Library {release} installed")));
    Ok(())
}

fn install_tool_release(
    catalog: &mut Catalog,
    release: &ToolRelease,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    tracing::info!(tool = %release, "Installing tool");
    sink.on_progress(ProgressEvent::named(format!("Installing {release}")));

    catalog
        .store()
        .install_tool(&release.tool.package, &IndexTool::from(release))
        .map_err(|source| CommandError::FailedInstall {
            message: format!("Error installing tool {release}"),
            source,
        })?;
    catalog.set_tool_installed(release, true);

    sink.on_progress(ProgressEvent::completed(format!("Tool {release} installed")));
    Ok(())
}

fn install_platform_release(
    catalog: &mut Catalog,
    release: &PlatformRelease,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    tracing::info!(platform = %release, "Installing platform");
    sink.on_progress(ProgressEvent::named(format!("Installing {release}")));

    catalog
        .store()
        .install_platform(&release.platform.package, &IndexPlatform::from(release))
        .map_err(|source| CommandError::FailedInstall {
            message: format!("Error installing platform {release}"),
            source,
        })?;
    catalog.set_platform_installed(&release.platform, Some(release.version.clone()));

    sink.on_progress(ProgressEvent::completed(format!("Platform {release} installed")));
    Ok(())
}

fn replace_platform_release(
    catalog: &mut Catalog,
    previous: &PlatformRelease,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    tracing::info!(platform = %previous, "Replacing installed release");
    uninstall_platform_release(catalog, previous, sink)
}

// Best-effort cleanup of tools the replaced release needed and nothing needs now.
fn remove_unneeded_tools(catalog: &mut Catalog, previous: &PlatformRelease, sink: &mut dyn ProgressSink) {
    let tools: Vec<ToolRelease> = match dependencies_of(catalog, previous) {
        Ok(deps) => deps.tools.into_iter().cloned().collect(),
        Err(e) => {
            tracing::warn!(platform = %previous, "Skipping tool cleanup: {}", e);
            return;
        }
    };

    for tool in &tools {
        if catalog.is_tool_installed(tool) && !catalog.is_tool_required(tool) {
            if let Err(e) = uninstall_tool_release(catalog, tool, sink) {
                tracing::warn!(tool = %tool, "Tool cleanup failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{PlatformId, ToolId};
    use crate::core::index::IndexDocument;
    use crate::core::progress::{NoProgress, ProgressLog};
    use crate::infra::store::FsInstallStore;
    use tempfile::TempDir;

    const INDEX: &str = r#"
[[packages]]
name = "arduino"

[[packages.platforms]]
architecture = "avr"
version = "1.8.5"
tool_dependencies = [{ packager = "arduino", name = "avr-gcc", version = "5.4.0" }]

[[packages.platforms]]
architecture = "avr"
version = "1.8.6"
tool_dependencies = [{ packager = "arduino", name = "avr-gcc", version = "7.3.0" }]

[[packages.tools]]
name = "avr-gcc"
version = "5.4.0"

[[packages.tools]]
name = "avr-gcc"
version = "7.3.0"

[[libraries]]
name = "Servo"
version = "1.1.7"

[[libraries]]
name = "Servo"
version = "1.1.8"
"#;

    fn catalog(temp: &TempDir) -> Catalog {
        let index = IndexDocument::from_toml(INDEX).unwrap();
        Catalog::new(&index, Box::new(FsInstallStore::new(temp.path()))).unwrap()
    }

    fn installed_version(catalog: &Catalog) -> Option<String> {
        catalog
            .platform(&PlatformId::new("arduino", "avr"))
            .and_then(|p| p.installed_release())
            .map(|r| r.version.to_string())
    }

    #[test]
    fn test_install_latest_with_tools() {
        let temp = TempDir::new().unwrap();
        let mut catalog = catalog(&temp);
        let mut log = ProgressLog::new();

        let report = install_platform(&mut catalog, &PlatformReference::new("arduino", "avr", None), &mut log).unwrap();

        assert_eq!(report.platform, "arduino:avr@1.8.6");
        assert_eq!(report.installed_tools, vec!["arduino:avr-gcc@7.3.0"]);
        assert_eq!(installed_version(&catalog).as_deref(), Some("1.8.6"));
        assert!(log.last().unwrap().completed);

        // Installed state survives a reindex from disk
        catalog.reindex().unwrap();
        assert_eq!(installed_version(&catalog).as_deref(), Some("1.8.6"));
    }

    #[test]
    fn test_install_replaces_previous_release_and_its_tools() {
        let temp = TempDir::new().unwrap();
        let mut catalog = catalog(&temp);
        install_platform(&mut catalog, &PlatformReference::new("arduino", "avr", Some("1.8.5")), &mut NoProgress).unwrap();

        let report = install_platform(&mut catalog, &PlatformReference::new("arduino", "avr", Some("1.8.6")), &mut NoProgress).unwrap();

        assert_eq!(report.replaced.as_deref(), Some("arduino:avr@1.8.5"));
        assert_eq!(installed_version(&catalog).as_deref(), Some("1.8.6"));
        let gcc = catalog.tool(&ToolId::new("arduino", "avr-gcc")).unwrap();
        assert!(!gcc.is_installed(&"5.4.0".into()));
        assert!(gcc.is_installed(&"7.3.0".into()));
    }

    #[test]
    fn test_install_unknown_platform() {
        let temp = TempDir::new().unwrap();
        let mut catalog = catalog(&temp);
        let err = install_platform(&mut catalog, &PlatformReference::new("esp32", "esp32", None), &mut NoProgress).unwrap_err();
        assert!(matches!(err, CommandError::PlatformNotFound { .. }));
    }

    #[test]
    fn test_install_library_replaces_version() {
        let temp = TempDir::new().unwrap();
        let mut catalog = catalog(&temp);
        install_library(&mut catalog, &LibraryReference::new("Servo", Some("1.1.7")), &mut NoProgress).unwrap();
        install_library(&mut catalog, &LibraryReference::new("Servo", None), &mut NoProgress).unwrap();

        let servo = catalog.library("Servo").unwrap();
        assert_eq!(servo.installed_release().unwrap().version.as_str(), "1.1.8");
    }

    #[test]
    fn test_install_tool_directly() {
        let temp = TempDir::new().unwrap();
        let mut catalog = catalog(&temp);
        install_tool(&mut catalog, &ToolReference::new("arduino", "avr-gcc", Some("5.4.0")), &mut NoProgress).unwrap();
        let gcc = catalog.tool(&ToolId::new("arduino", "avr-gcc")).unwrap();
        assert!(gcc.is_installed(&"5.4.0".into()));

        let err = install_tool(&mut catalog, &ToolReference::new("arduino", "avr-gcc", Some("9.9.9")), &mut NoProgress).unwrap_err();
        assert!(matches!(err, CommandError::NotFound { .. }));
    }
}
