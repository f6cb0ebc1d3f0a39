//! Integration tests for dependency walking and reference resolution

mod common;

use boardman::core::catalog::{Catalog, PlatformId};
use boardman::core::dependencies::dependencies_of;
use boardman::core::index::IndexDocument;
use boardman::core::install::install_platform;
use boardman::core::progress::NoProgress;
use boardman::core::resolver::{resolve_platform, PlatformReference};
use boardman::error::{CommandError, DependencyError, ResolveError};
use boardman::infra::store::FsInstallStore;
use common::TestEnv;
use tempfile::TempDir;

fn release<'a>(catalog: &'a Catalog, reference: &str) -> &'a boardman::core::catalog::PlatformRelease {
    let reference: PlatformReference = reference.parse().unwrap();
    let platform = catalog.platform(&reference.id()).unwrap();
    platform.releases.get(reference.version.as_ref().unwrap()).unwrap()
}

#[test]
fn test_closure_includes_transitive_tools_once() {
    let env = TestEnv::new();
    let catalog = env.catalog();

    let deps = dependencies_of(&catalog, release(&catalog, "arduino:avr@1.8.6")).unwrap();
    let tools: Vec<String> = deps.tools.iter().map(ToString::to_string).collect();

    assert_eq!(tools.len(), 3);
    for expected in [
        "arduino:avr-gcc@7.3.0",
        "arduino:avrdude@6.3.0",
        "arduino:libusb@1.0.26",
    ] {
        assert!(tools.contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn test_missing_tool_version_fails_resolution() {
    let env = TestEnv::new();
    let mut catalog = env.catalog();

    let err = dependencies_of(&catalog, release(&catalog, "arduino:broken@1.0.0")).unwrap_err();
    match &err {
        DependencyError::Unresolved {
            dependency, source, ..
        } => {
            assert_eq!(dependency, "arduino:picotool@1.0");
            assert!(matches!(source, ResolveError::VersionNotFound { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let reference: PlatformReference = "arduino:broken@1.0.0".parse().unwrap();
    let err = install_platform(&mut catalog, &reference, &mut NoProgress).unwrap_err();
    assert!(matches!(err, CommandError::DependencyResolution { .. }));
    assert!(catalog
        .platform(&PlatformId::new("arduino", "broken"))
        .unwrap()
        .installed_release()
        .is_none());
}

#[test]
fn test_circular_tool_dependencies_are_reported() {
    let index = IndexDocument::from_toml(
        r#"
[[packages]]
name = "loop"

[[packages.platforms]]
architecture = "ring"
version = "1.0.0"
tool_dependencies = [{ packager = "loop", name = "a", version = "1" }]

[[packages.tools]]
name = "a"
version = "1"
dependencies = [{ packager = "loop", name = "b", version = "1" }]

[[packages.tools]]
name = "b"
version = "1"
dependencies = [{ packager = "loop", name = "a", version = "1" }]
"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();
    let catalog = Catalog::new(&index, Box::new(FsInstallStore::new(temp.path()))).unwrap();

    let err = dependencies_of(&catalog, release(&catalog, "loop:ring@1.0.0")).unwrap_err();
    assert!(matches!(err, DependencyError::CircularDependency { .. }));
}

#[test]
fn test_unversioned_reference_resolves_installed_release() {
    let env = TestEnv::new();
    let mut catalog = env.catalog();
    let unversioned: PlatformReference = "arduino:avr".parse().unwrap();

    assert!(matches!(
        resolve_platform(&catalog, &unversioned),
        Err(ResolveError::NotInstalled { .. })
    ));

    install_platform(&mut catalog, &unversioned, &mut NoProgress).unwrap();
    let resolved = resolve_platform(&catalog, &unversioned).unwrap();
    assert_eq!(resolved.to_string(), "arduino:avr@1.8.6");
}

#[test]
fn test_tool_requirement_tracks_installed_platforms() {
    let env = TestEnv::new();
    let mut catalog = env.catalog();
    let libusb = {
        let deps = dependencies_of(&catalog, release(&catalog, "arduino:avr@1.8.6")).unwrap();
        deps.tools
            .into_iter()
            .find(|tool| tool.tool.name == "libusb")
            .unwrap()
            .clone()
    };
    assert!(!catalog.is_tool_required(&libusb));

    install_platform(&mut catalog, &"arduino:megaavr".parse().unwrap(), &mut NoProgress).unwrap();
    assert!(catalog.is_tool_required(&libusb));
    assert!(catalog.is_tool_installed(&libusb));
}
