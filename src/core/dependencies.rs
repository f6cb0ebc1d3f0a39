//! Dependency walking
//!
//! Computes the tool releases a platform release needs. Every declared
//! `(package, tool, version)` tuple is resolved exactly; tools that declare
//! further tools are walked recursively. The walk is all-or-nothing: one
//! unresolvable tuple fails the whole computation.

use std::collections::HashSet;

use crate::error::DependencyError;

use super::catalog::{Catalog, PlatformRelease, ToolDependency, ToolRelease};
use super::resolver::{resolve_tool, ToolReference};

/// A platform release together with its full tool closure
#[derive(Debug, Clone)]
pub struct PlatformDependencies<'a> {
    pub platform: &'a PlatformRelease,
    /// Tool releases in first-visit order, without duplicates
    pub tools: Vec<&'a ToolRelease>,
}

/// Compute every tool release required by a platform release
pub fn dependencies_of<'a>(
    catalog: &'a Catalog,
    platform: &'a PlatformRelease,
) -> Result<PlatformDependencies<'a>, DependencyError> {
    let mut walker = Walker {
        catalog,
        visited: HashSet::new(),
        path: Vec::new(),
        tools: Vec::new(),
    };

    for dependency in &platform.tool_dependencies {
        walker.visit(&platform.to_string(), dependency)?;
    }

    Ok(PlatformDependencies {
        platform,
        tools: walker.tools,
    })
}

/// Whether a platform release needs the given tool release
///
/// Falls back to the platform's direct declarations when its closure cannot
/// be computed, so a broken index never makes a tool look unused when the
/// platform names it explicitly.
pub fn requires_tool(catalog: &Catalog, platform: &PlatformRelease, tool: &ToolRelease) -> bool {
    match dependencies_of(catalog, platform) {
        Ok(deps) => deps
            .tools
            .iter()
            .any(|t| t.tool == tool.tool && t.version == tool.version),
        Err(e) => {
            tracing::debug!(platform = %platform, "Dependency walk failed: {}", e);
            platform.declares(tool)
        }
    }
}

struct Walker<'a> {
    catalog: &'a Catalog,
    visited: HashSet<ToolDependency>,
    path: Vec<String>,
    tools: Vec<&'a ToolRelease>,
}

impl Walker<'_> {
    fn visit(&mut self, required_by: &str, dependency: &ToolDependency) -> Result<(), DependencyError> {
        let label = dependency.to_string();
        if self.path.contains(&label) {
            let mut cycle = self.path.clone();
            cycle.push(label);
            return Err(DependencyError::CircularDependency { cycle });
        }
        if self.visited.contains(dependency) {
            return Ok(());
        }

        let reference = ToolReference {
            package: dependency.tool.package.clone(),
            name: dependency.tool.name.clone(),
            version: Some(dependency.version.clone()),
        };
        let release = resolve_tool(self.catalog, &reference).map_err(|source| {
            DependencyError::Unresolved {
                required_by: required_by.to_string(),
                dependency: label.clone(),
                source,
            }
        })?;

        self.path.push(label.clone());
        for nested in &release.dependencies {
            self.visit(&label, nested)?;
        }
        self.path.pop();

        self.visited.insert(dependency.clone());
        self.tools.push(release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::PlatformId;
    use crate::core::index::IndexDocument;
    use crate::core::resolver::{resolve_platform, PlatformReference};
    use crate::error::ResolveError;
    use crate::infra::store::FsInstallStore;
    use tempfile::TempDir;

    fn catalog(temp: &TempDir, index: &str) -> Catalog {
        let index = IndexDocument::from_toml(index).unwrap();
        Catalog::new(&index, Box::new(FsInstallStore::new(temp.path()))).unwrap()
    }

    fn platform<'a>(catalog: &'a Catalog, version: &str) -> &'a PlatformRelease {
        resolve_platform(catalog, &PlatformReference::new("test", "arch", Some(version))).unwrap()
    }

    #[test]
    fn test_direct_dependencies() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(
            &temp,
            r#"
[[packages]]
name = "test"

[[packages.platforms]]
architecture = "arch"
version = "1.0.0"
tool_dependencies = [
    { packager = "test", name = "gcc", version = "7.3.0" },
    { packager = "test", name = "uploader", version = "1.2.0" },
]

[[packages.tools]]
name = "gcc"
version = "7.3.0"

[[packages.tools]]
name = "uploader"
version = "1.2.0"
"#,
        );

        let deps = dependencies_of(&catalog, platform(&catalog, "1.0.0")).unwrap();
        let names: Vec<_> = deps.tools.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["test:gcc@7.3.0", "test:uploader@1.2.0"]);
        assert_eq!(deps.platform.platform, PlatformId::new("test", "arch"));
    }

    #[test]
    fn test_exact_version_required() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(
            &temp,
            r#"
[[packages]]
name = "test"

[[packages.platforms]]
architecture = "arch"
version = "1.0.0"
tool_dependencies = [{ packager = "test", name = "T", version = "1.0" }]

[[packages.tools]]
name = "T"
version = "2.0"
"#,
        );

        let err = dependencies_of(&catalog, platform(&catalog, "1.0.0")).unwrap_err();
        match err {
            DependencyError::Unresolved { dependency, source, .. } => {
                assert_eq!(dependency, "test:T@1.0");
                assert!(matches!(source, ResolveError::VersionNotFound { .. }));
            }
            e => panic!("Expected Unresolved, got: {e:?}"),
        }
    }

    #[test]
    fn test_transitive_dependencies_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(
            &temp,
            r#"
[[packages]]
name = "test"

[[packages.platforms]]
architecture = "arch"
version = "1.0.0"
tool_dependencies = [
    { packager = "test", name = "a", version = "1.0.0" },
    { packager = "test", name = "b", version = "1.0.0" },
]

[[packages.tools]]
name = "a"
version = "1.0.0"
dependencies = [{ packager = "test", name = "shared", version = "1.0.0" }]

[[packages.tools]]
name = "b"
version = "1.0.0"
dependencies = [{ packager = "test", name = "shared", version = "1.0.0" }]

[[packages.tools]]
name = "shared"
version = "1.0.0"
"#,
        );

        let deps = dependencies_of(&catalog, platform(&catalog, "1.0.0")).unwrap();
        let names: Vec<_> = deps.tools.iter().map(|t| t.tool.name.as_str()).collect();
        assert_eq!(names, vec!["shared", "a", "b"]);
    }

    #[test]
    fn test_circular_tool_dependency_detection() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(
            &temp,
            r#"
[[packages]]
name = "test"

[[packages.platforms]]
architecture = "arch"
version = "1.0.0"
tool_dependencies = [{ packager = "test", name = "a", version = "1.0.0" }]

[[packages.tools]]
name = "a"
version = "1.0.0"
dependencies = [{ packager = "test", name = "b", version = "1.0.0" }]

[[packages.tools]]
name = "b"
version = "1.0.0"
dependencies = [{ packager = "test", name = "a", version = "1.0.0" }]
"#,
        );

        let err = dependencies_of(&catalog, platform(&catalog, "1.0.0")).unwrap_err();
        match err {
            DependencyError::CircularDependency { cycle } => {
                assert_eq!(cycle, vec!["test:a@1.0.0", "test:b@1.0.0", "test:a@1.0.0"]);
            }
            e => panic!("Expected CircularDependency, got: {e:?}"),
        }
    }

    #[test]
    fn test_requires_tool_falls_back_to_declarations() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(
            &temp,
            r#"
[[packages]]
name = "test"

[[packages.platforms]]
architecture = "arch"
version = "1.0.0"
tool_dependencies = [
    { packager = "test", name = "gcc", version = "7.3.0" },
    { packager = "test", name = "missing", version = "1.0.0" },
]

[[packages.tools]]
name = "gcc"
version = "7.3.0"
"#,
        );

        let gcc = resolve_tool(&catalog, &ToolReference::new("test", "gcc", Some("7.3.0"))).unwrap();
        assert!(requires_tool(&catalog, platform(&catalog, "1.0.0"), gcc));
    }
}
