//! Platform and library removal
//!
//! Uninstalling a platform removes its files, then removes each tool of its
//! dependency closure that no other installed platform still needs. The
//! cascade is best-effort: a tool that fails to uninstall is recorded in the
//! report and the remaining tools are still processed. Nothing is rolled back.

use crate::error::{CommandError, ResolveError};

use super::catalog::{Catalog, PlatformRelease, ToolRelease};
use super::dependencies::dependencies_of;
use super::instance::Instances;
use super::progress::{ProgressEvent, ProgressSink};
use super::resolver::{resolve_library, resolve_platform, LibraryReference, PlatformReference};

/// Request to uninstall a platform from a catalog instance
#[derive(Debug, Clone)]
pub struct PlatformUninstallRequest {
    pub instance_id: u32,
    pub package: String,
    pub architecture: String,
    pub version: Option<String>,
}

/// Request to uninstall a library from a catalog instance
#[derive(Debug, Clone)]
pub struct LibraryUninstallRequest {
    pub instance_id: u32,
    pub name: String,
    pub version: Option<String>,
}

/// A tool that could not be removed during a platform uninstall
#[derive(Debug)]
pub struct ToolUninstallFailure {
    pub tool: String,
    pub error: CommandError,
}

/// Outcome of a platform uninstall
///
/// The platform itself was removed; tools are split by what happened to them.
#[derive(Debug, Default)]
pub struct PlatformUninstallReport {
    /// The removed platform release
    pub platform: String,
    /// Tools removed because nothing else needs them
    pub removed_tools: Vec<String>,
    /// Tools kept because another installed platform needs them
    pub kept_tools: Vec<String>,
    /// Tools whose removal failed
    pub failed_tools: Vec<ToolUninstallFailure>,
}

impl PlatformUninstallReport {
    /// Platform removed and every unneeded tool removed
    pub fn is_clean(&self) -> bool {
        self.failed_tools.is_empty()
    }
}

/// Outcome of a library uninstall
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryUninstallOutcome {
    /// The library release was removed
    Uninstalled { library: String },
    /// Nothing matching the reference was installed
    NotInstalled { name: String },
}

/// Handle a platform uninstall request
pub fn platform_uninstall(
    instances: &mut Instances,
    request: &PlatformUninstallRequest,
    sink: &mut dyn ProgressSink,
) -> Result<PlatformUninstallReport, CommandError> {
    let catalog = instances.get_mut(request.instance_id)?;
    let reference = PlatformReference::new(
        &request.package,
        &request.architecture,
        request.version.as_deref(),
    );
    uninstall_platform(catalog, &reference, sink)
}

/// Handle a library uninstall request
pub fn library_uninstall(
    instances: &mut Instances,
    request: &LibraryUninstallRequest,
    sink: &mut dyn ProgressSink,
) -> Result<LibraryUninstallOutcome, CommandError> {
    let catalog = instances.get_mut(request.instance_id)?;
    if request.name.trim().is_empty() {
        return Err(CommandError::InvalidLibrary {
            reference: request.name.clone(),
            reason: "empty library name".to_string(),
        });
    }
    if let Some(version) = &request.version {
        if version.is_empty() || version.contains(char::is_whitespace) {
            return Err(CommandError::InvalidLibrary {
                reference: format!("{}@{version}", request.name),
                reason: format!("invalid version '{version}'"),
            });
        }
    }
    let reference = LibraryReference::new(request.name.trim(), request.version.as_deref());
    uninstall_library(catalog, &reference, sink)
}

/// Uninstall a platform release and the tools only it needed
pub fn uninstall_platform(
    catalog: &mut Catalog,
    reference: &PlatformReference,
    sink: &mut dyn ProgressSink,
) -> Result<PlatformUninstallReport, CommandError> {
    let (platform, tools) = {
        let release = resolve_platform(catalog, reference).map_err(|source| {
            CommandError::PlatformNotFound {
                platform: reference.to_string(),
                source,
            }
        })?;

        let installed = catalog
            .platform(&release.platform)
            .and_then(|platform| platform.installed_release())
            .is_some_and(|installed| installed.version == release.version);
        if !installed {
            return Err(CommandError::PlatformNotFound {
                platform: reference.to_string(),
                source: ResolveError::NotInstalled {
                    kind: crate::error::ReleaseKind::Platform,
                    reference: release.to_string(),
                },
            });
        }

        let deps = dependencies_of(catalog, release).map_err(|source| {
            CommandError::DependencyResolution {
                platform: release.to_string(),
                source,
            }
        })?;
        let tools: Vec<ToolRelease> = deps.tools.into_iter().cloned().collect();
        (release.clone(), tools)
    };

    uninstall_platform_release(catalog, &platform, sink)?;

    let mut report = PlatformUninstallReport {
        platform: platform.to_string(),
        ..PlatformUninstallReport::default()
    };
    for tool in &tools {
        if !catalog.is_tool_installed(tool) {
            tracing::debug!(tool = %tool, "Tool already absent");
            continue;
        }
        if catalog.is_tool_required(tool) {
            tracing::info!(tool = %tool, "Tool still required by another platform");
            report.kept_tools.push(tool.to_string());
            continue;
        }
        match uninstall_tool_release(catalog, tool, sink) {
            Ok(()) => report.removed_tools.push(tool.to_string()),
            Err(error) => report.failed_tools.push(ToolUninstallFailure {
                tool: tool.to_string(),
                error,
            }),
        }
    }

    catalog.reindex().map_err(CommandError::Reindex)?;
    Ok(report)
}

/// Uninstall a library
///
/// A library that is not installed is not an error: the sink receives a
/// completed "not installed" event and [`LibraryUninstallOutcome::NotInstalled`]
/// is returned.
pub fn uninstall_library(
    catalog: &mut Catalog,
    reference: &LibraryReference,
    sink: &mut dyn ProgressSink,
) -> Result<LibraryUninstallOutcome, CommandError> {
    let installed = resolve_library(catalog, reference).ok().filter(|release| {
        catalog
            .library(&release.name)
            .and_then(|library| library.installed_release())
            .is_some_and(|installed| installed.version == release.version)
    });

    let Some(release) = installed.cloned() else {
        sink.on_progress(ProgressEvent::completed(format!(
            "Library {} is not installed",
            reference.name
        )));
        return Ok(LibraryUninstallOutcome::NotInstalled {
            name: reference.name.clone(),
        });
    };

    tracing::info!(library = %release, "Uninstalling library");
    sink.on_progress(ProgressEvent::named(format!("Uninstalling {release}")));

    catalog
        .store()
        .remove_library(&release.name)
        .map_err(|source| CommandError::FailedUninstall {
            message: format!("Error uninstalling library {release}"),
            source,
        })?;
    catalog.set_library_installed(&release.name, None);

    sink.on_progress(ProgressEvent::completed(format!("Library {release} uninstalled")));
    Ok(LibraryUninstallOutcome::Uninstalled {
        library: release.to_string(),
    })
}

pub(crate) fn uninstall_platform_release(
    catalog: &mut Catalog,
    release: &PlatformRelease,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    tracing::info!(platform = %release, "Uninstalling platform");
    sink.on_progress(ProgressEvent::named(format!("Uninstalling {release}")));

    if let Err(source) = catalog.store().remove_platform(&release.platform, &release.version) {
        tracing::error!(platform = %release, "Error uninstalling: {}", source);
        return Err(CommandError::FailedUninstall {
            message: format!("Error uninstalling platform {release}"),
            source,
        });
    }
    catalog.set_platform_installed(&release.platform, None);

    tracing::info!(platform = %release, "Platform uninstalled");
    sink.on_progress(ProgressEvent::completed(format!("Platform {release} uninstalled")));
    Ok(())
}

pub(crate) fn uninstall_tool_release(
    catalog: &mut Catalog,
    release: &ToolRelease,
    sink: &mut dyn ProgressSink,
) -> Result<(), CommandError> {
    tracing::info!(tool = %release, "Uninstalling tool");
    sink.on_progress(ProgressEvent::named(format!(
        "Uninstalling {release}, tool is no more required"
    )));

    if let Err(source) = catalog.store().remove_tool(&release.tool, &release.version) {
        tracing::warn!(tool = %release, "Error uninstalling: {}", source);
        sink.on_progress(ProgressEvent::completed(format!(
            "Error uninstalling tool {release}: {source}"
        )));
        return Err(CommandError::FailedUninstall {
            message: format!("Error uninstalling tool {release}"),
            source,
        });
    }
    catalog.set_tool_installed(release, false);

    tracing::info!(tool = %release, "Tool uninstalled");
    sink.on_progress(ProgressEvent::completed(format!("Tool {release} uninstalled")));
    Ok(())
}
