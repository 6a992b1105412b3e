//! Cargo project discovery for the compiled-runtime variant.
//!
//! Targets come from `cargo metadata --no-deps`, so every layout Cargo
//! itself accepts is handled:
//!
//! - explicit `[[bin]]` entries and `autobins = false`
//! - `src/main.rs`, `src/bin/*.rs` and `src/bin/<name>/main.rs`
//! - `version.workspace = true` and other inherited `[package]` fields

use std::path::{Path, PathBuf};

use cargo_metadata::{MetadataCommand, TargetKind};

/// A binary target in a Cargo package.
///
/// # Examples
///
/// ```
/// use funcpack_core::CargoBinary;
/// use std::path::PathBuf;
///
/// let bin = CargoBinary {
///     name: "my-handler".to_owned(),
///     src_path: PathBuf::from("src/main.rs"),
/// };
/// assert_eq!(bin.name, "my-handler");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoBinary {
    /// Binary name (used with `cargo build --bin <name>`)
    pub name: String,
    /// Absolute path to the target's root source file
    pub src_path: PathBuf,
}

/// Cargo package metadata needed to build and bundle one binary.
#[derive(Debug, Clone)]
pub struct CargoProject {
    /// Package name from `[package].name`
    pub name: String,
    /// Resolved version, including workspace inheritance
    pub version: String,
    /// Absolute path to the package's `Cargo.toml`
    pub manifest_path: PathBuf,
    /// Directory holding `manifest_path`
    pub package_dir: PathBuf,
    /// Root of the enclosing workspace (the package dir for standalone packages)
    pub workspace_root: PathBuf,
    /// All binary targets in this package
    pub binaries: Vec<CargoBinary>,
    /// The binary selected for bundling.
    ///
    /// **Invariant:** must match a name in [`binaries`](Self::binaries).
    pub default_binary: String,
}

impl CargoProject {
    /// Discover the Cargo package whose manifest lives in `package_dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::CargoMetadata`](crate::Error::CargoMetadata) if `cargo metadata` fails (no manifest, cargo missing)
    /// - [`Error::NoPackageInDir`](crate::Error::NoPackageInDir) for a virtual workspace manifest
    /// - [`Error::NoBinaryTarget`](crate::Error::NoBinaryTarget) if the package has no binary targets
    /// - [`Error::MultipleBinaries`](crate::Error::MultipleBinaries) if multiple binaries exist and none is selected
    pub fn discover(package_dir: &Path) -> crate::Result<Self> {
        let manifest_path = package_dir.join("Cargo.toml");
        tracing::debug!(path = %manifest_path.display(), "running cargo metadata");

        let metadata = MetadataCommand::new()
            .manifest_path(&manifest_path)
            .no_deps()
            .exec()
            .map_err(|e| crate::Error::CargoMetadata {
                manifest_path: manifest_path.clone(),
                detail: e.to_string(),
            })?;

        let workspace_root = PathBuf::from(metadata.workspace_root.as_std_path());
        let canonical_dir =
            package_dir
                .canonicalize()
                .map_err(|e| crate::Error::ProjectDirResolve {
                    path: package_dir.to_path_buf(),
                    source: e,
                })?;

        let package = metadata
            .packages
            .iter()
            .find(|p| {
                p.manifest_path
                    .as_std_path()
                    .parent()
                    .and_then(|d| match d.canonicalize() {
                        Ok(c) => Some(c),
                        Err(e) => {
                            tracing::warn!(
                                path = %d.display(),
                                error = %e,
                                "cannot canonicalize package dir; skipping package"
                            );
                            None
                        }
                    })
                    .is_some_and(|d| d == canonical_dir)
            })
            .ok_or_else(|| crate::Error::NoPackageInDir {
                dir: canonical_dir.clone(),
                workspace_members: metadata
                    .packages
                    .iter()
                    .filter(|p| metadata.workspace_members.contains(&p.id))
                    .map(|p| p.name.to_string())
                    .collect(),
            })?;

        let mut binaries: Vec<CargoBinary> = package
            .targets
            .iter()
            .filter(|t| t.kind.contains(&TargetKind::Bin))
            .map(|t| CargoBinary {
                name: t.name.clone(),
                src_path: PathBuf::from(t.src_path.as_std_path()),
            })
            .collect();
        binaries.sort_by(|a, b| a.name.cmp(&b.name));

        let name = package.name.to_string();
        let default_binary =
            Self::resolve_default_binary(&binaries, package.default_run.as_deref(), &name)?;

        let manifest_path = PathBuf::from(package.manifest_path.as_std_path());
        let package_dir = manifest_path
            .parent()
            .map_or_else(|| canonical_dir.clone(), Path::to_path_buf);

        tracing::debug!(
            name = %name,
            version = %package.version,
            binary = %default_binary,
            binaries = binaries.len(),
            workspace_root = %workspace_root.display(),
            "cargo project discovered"
        );

        Ok(Self {
            name,
            version: package.version.to_string(),
            manifest_path,
            package_dir,
            workspace_root,
            binaries,
            default_binary,
        })
    }

    /// Select the binary to bundle.
    ///
    /// Priority:
    /// 1. `default-run` from Cargo.toml (explicit user choice)
    /// 2. Single binary (unambiguous)
    /// 3. Binary matching the package name (Cargo convention)
    /// 4. Error with guidance
    fn resolve_default_binary(
        binaries: &[CargoBinary],
        default_run: Option<&str>,
        package_name: &str,
    ) -> crate::Result<String> {
        if let Some(name) = default_run
            && binaries.iter().any(|b| b.name == name)
        {
            return Ok(name.to_owned());
        }

        match binaries {
            [] => Err(crate::Error::NoBinaryTarget {
                package: package_name.to_owned(),
            }),
            [only] => Ok(only.name.clone()),
            _ => {
                if binaries.iter().any(|b| b.name == package_name) {
                    return Ok(package_name.to_owned());
                }
                Err(crate::Error::MultipleBinaries {
                    names: binaries.iter().map(|b| b.name.clone()).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(name: &str) -> CargoBinary {
        CargoBinary {
            name: name.to_owned(),
            src_path: PathBuf::from(format!("src/bin/{name}.rs")),
        }
    }

    #[test]
    fn resolve_single_binary() {
        let bins = vec![bin("handler")];
        let result = CargoProject::resolve_default_binary(&bins, None, "my-pkg");
        assert_eq!(result.unwrap(), "handler");
    }

    #[test]
    fn resolve_default_run_takes_priority() {
        let bins = vec![bin("api"), bin("worker")];
        let result = CargoProject::resolve_default_binary(&bins, Some("worker"), "my-pkg");
        assert_eq!(result.unwrap(), "worker");
    }

    #[test]
    fn resolve_multiple_prefers_package_name() {
        let bins = vec![bin("my-pkg"), bin("worker")];
        let result = CargoProject::resolve_default_binary(&bins, None, "my-pkg");
        assert_eq!(result.unwrap(), "my-pkg");
    }

    #[test]
    fn resolve_no_binaries_errors() {
        let err = CargoProject::resolve_default_binary(&[], None, "lib-only")
            .unwrap_err()
            .to_string();
        assert!(err.contains("no binary target"), "got: {err}");
    }

    #[test]
    fn resolve_ambiguous_multiple_errors() {
        let bins = vec![bin("api"), bin("worker")];
        let err = CargoProject::resolve_default_binary(&bins, None, "my-pkg")
            .unwrap_err()
            .to_string();
        assert!(err.contains("api"), "got: {err}");
        assert!(err.contains("worker"), "got: {err}");
    }

    #[test]
    fn resolve_default_run_ignored_if_not_in_binaries() {
        let bins = vec![bin("api")];
        let result = CargoProject::resolve_default_binary(&bins, Some("ghost"), "my-pkg");
        assert_eq!(result.unwrap(), "api");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Strategy: valid crate name (lowercase ascii + hyphens, 1-20 chars)
        fn crate_name() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9-]{0,19}".prop_filter("no trailing hyphen", |s| !s.ends_with('-'))
        }

        fn bin_names(max: usize) -> impl Strategy<Value = Vec<String>> {
            proptest::collection::hash_set(crate_name(), 0..=max)
                .prop_map(|s| s.into_iter().collect::<Vec<_>>())
        }

        proptest! {
            #[test]
            fn default_run_in_binaries_always_selected(
                extra_names in bin_names(4),
                chosen in crate_name(),
            ) {
                let mut names: Vec<String> = extra_names
                    .into_iter()
                    .filter(|n| *n != chosen)
                    .collect();
                names.push(chosen.clone());
                let bins: Vec<CargoBinary> = names.iter().map(|n| bin(n)).collect();

                let result = CargoProject::resolve_default_binary(&bins, Some(&chosen), "unrelated-pkg");
                prop_assert_eq!(result.unwrap(), chosen);
            }

            #[test]
            fn result_is_always_from_binaries(
                names in bin_names(5).prop_filter("non-empty", |v| !v.is_empty()),
                default_run in proptest::option::of(crate_name()),
                pkg_name in crate_name(),
            ) {
                let bins: Vec<CargoBinary> = names.iter().map(|n| bin(n)).collect();
                let result = CargoProject::resolve_default_binary(&bins, default_run.as_deref(), &pkg_name);
                if let Ok(selected) = result {
                    prop_assert!(names.contains(&selected));
                }
            }
        }
    }
}
