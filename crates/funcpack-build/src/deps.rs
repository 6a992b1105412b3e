//! Dependency sets and the `node_modules` indirection.
//!
//! Each resolve installs into a fresh `node_modules_<mode>` directory next
//! to the package manifest, then repoints the `node_modules` link at it.
//! The two sets are never merged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use funcpack_core::{ExclusionPolicy, PackageManifest};

use crate::error::{DependencyError, VersionError};
use crate::runner::{CommandRunner, CommandSpec, RunError};

/// Name the project's code uses to find its dependencies.
pub const DEPENDENCY_LINK: &str = "node_modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyMode {
    /// Full graph including build-only tools.
    Dev,
    /// Runtime subset shipped inside function bundles.
    Prod,
}

impl DependencyMode {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Dev => "node_modules_dev",
            Self::Prod => "node_modules_prod",
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Prod
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageManager {
    Yarn,
    Npm,
}

impl PackageManager {
    fn detect(project_dir: &Path) -> Self {
        if project_dir.join("yarn.lock").is_file() {
            Self::Yarn
        } else {
            Self::Npm
        }
    }

    fn program(self) -> &'static str {
        match self {
            Self::Yarn => "yarn",
            Self::Npm => "npm",
        }
    }
}

/// Installs dependency sets and swaps the active one.
pub struct DependencyResolver<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    manifest_name: &'a str,
    policy: &'a ExclusionPolicy,
    env: BTreeMap<String, String>,
}

impl<'a, R: CommandRunner + ?Sized> DependencyResolver<'a, R> {
    pub fn new(runner: &'a R, manifest_name: &'a str, policy: &'a ExclusionPolicy) -> Self {
        Self {
            runner,
            manifest_name,
            policy,
            env: BTreeMap::new(),
        }
    }

    /// Extra environment for the package manager (runtime pin, `PATH`).
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Install `mode`'s dependency set and make it the active one.
    ///
    /// In [`DependencyMode::Prod`] the package manifest is first rewritten
    /// in place with the exclusion policy applied. Returns the set directory.
    pub fn resolve(
        &self,
        project_dir: &Path,
        mode: DependencyMode,
        cache_dir: &Path,
    ) -> Result<PathBuf, DependencyError> {
        let manifest_path = project_dir.join(self.manifest_name);
        if !manifest_path.is_file() {
            return Err(DependencyError::MissingManifest(manifest_path));
        }

        if mode.is_production() {
            let manifest = PackageManifest::load(&manifest_path)?;
            manifest
                .for_production(self.policy)
                .write(&manifest_path)?;
            tracing::info!(
                manifest = %manifest_path.display(),
                policy_version = self.policy.version,
                "rewrote package manifest for production"
            );
        }

        let set_dir = project_dir.join(mode.dir_name());
        remove_entry(&set_dir)?;

        let manager = PackageManager::detect(project_dir);
        let cache = usable_cache(&cache_dir.join(manager.program()));
        tracing::info!(
            manager = manager.program(),
            mode = ?mode,
            cache = ?cache,
            "installing dependencies"
        );

        match manager {
            PackageManager::Yarn => self.install_yarn(project_dir, &set_dir, mode, cache.as_deref())?,
            PackageManager::Npm => self.install_npm(project_dir, &set_dir, mode, cache.as_deref())?,
        }

        if !set_dir.exists() {
            // nothing to install still yields an (empty) set
            std::fs::create_dir_all(&set_dir).map_err(|e| DependencyError::Io {
                path: set_dir.clone(),
                source: e,
            })?;
        }

        activate(project_dir, mode)?;
        Ok(set_dir)
    }

    fn install_yarn(
        &self,
        project_dir: &Path,
        set_dir: &Path,
        mode: DependencyMode,
        cache: Option<&Path>,
    ) -> Result<(), DependencyError> {
        let mut spec = CommandSpec::new("yarn", project_dir)
            .args(["install", "--prefer-offline", "--non-interactive"])
            .arg("--modules-folder")
            .arg(set_dir.to_string_lossy())
            .arg(format!("--production={}", mode.is_production()))
            .envs(&self.env);
        // the production manifest no longer matches the lockfile
        if !mode.is_production() {
            spec = spec.arg("--frozen-lockfile");
        }
        if let Some(cache) = cache {
            spec = spec.arg("--cache-folder").arg(cache.to_string_lossy());
        }
        if mode.is_production() {
            spec.env.insert("NODE_ENV".to_owned(), "production".to_owned());
        }

        self.run("yarn", &spec)
    }

    fn install_npm(
        &self,
        project_dir: &Path,
        set_dir: &Path,
        mode: DependencyMode,
        cache: Option<&Path>,
    ) -> Result<(), DependencyError> {
        let staging = project_dir.join(format!(".{}_staging", mode.dir_name()));
        remove_entry(&staging)?;
        std::fs::create_dir_all(&staging).map_err(|e| DependencyError::Io {
            path: staging.clone(),
            source: e,
        })?;

        let lockfile = project_dir.join("package-lock.json");
        let has_lock = lockfile.is_file();
        copy_into(&project_dir.join(self.manifest_name), &staging.join("package.json"))?;
        if has_lock {
            copy_into(&lockfile, &staging.join("package-lock.json"))?;
        } else {
            tracing::warn!(
                project = %project_dir.display(),
                "no lockfile; performing a full dependency resolution"
            );
        }

        let subcommand = if has_lock && !mode.is_production() {
            "ci"
        } else {
            "install"
        };
        let mut spec = CommandSpec::new("npm", &staging)
            .args([subcommand, "--no-audit", "--no-fund"])
            .envs(&self.env);
        if mode.is_production() {
            spec = spec.arg("--omit=dev");
            spec.env.insert("NODE_ENV".to_owned(), "production".to_owned());
        }
        if let Some(cache) = cache {
            spec = spec.arg("--cache").arg(cache.to_string_lossy());
        }

        self.run("npm", &spec)?;

        let installed = staging.join(DEPENDENCY_LINK);
        if installed.exists() {
            std::fs::rename(&installed, set_dir).map_err(|e| DependencyError::Io {
                path: set_dir.to_path_buf(),
                source: e,
            })?;
        }
        remove_entry(&staging)
    }

    fn run(&self, manager: &str, spec: &CommandSpec) -> Result<(), DependencyError> {
        self.runner
            .run(spec)
            .map_err(|e| install_error(manager, e))
    }
}

/// Map a package-manager run failure to a [`DependencyError`].
pub fn install_error(manager: &str, err: RunError) -> DependencyError {
    match err {
        RunError::Spawn { source, .. } => DependencyError::Spawn {
            manager: manager.to_owned(),
            source,
        },
        RunError::Exit {
            code, output_tail, ..
        } => DependencyError::Install {
            manager: manager.to_owned(),
            exit_code: code,
            output_tail,
        },
    }
}

/// Repoint `<project>/node_modules` at `mode`'s set (remove, then link).
pub fn activate(project_dir: &Path, mode: DependencyMode) -> Result<(), DependencyError> {
    let link = project_dir.join(DEPENDENCY_LINK);
    remove_entry(&link)?;

    let target = PathBuf::from(mode.dir_name());
    link_dir(&target, &link).map_err(|e| DependencyError::Link {
        link: link.clone(),
        target: target.clone(),
        source: e,
    })?;

    tracing::debug!(link = %link.display(), target = %target.display(), "activated dependency set");
    Ok(())
}

/// Check the installed framework's major version against `[min, max]`.
///
/// Reads `<project>/node_modules/<package>/package.json`. Returns the
/// installed version string.
pub fn check_framework_version(
    project_dir: &Path,
    package: &str,
    min: u64,
    max: u64,
) -> Result<String, VersionError> {
    let path = project_dir
        .join(DEPENDENCY_LINK)
        .join(package)
        .join("package.json");
    let unknown = || VersionError::FrameworkVersionUnknown {
        package: package.to_owned(),
        path: path.clone(),
    };

    let manifest = std::fs::read_to_string(&path).map_err(|_| unknown())?;
    let doc: serde_json::Value = serde_json::from_str(&manifest).map_err(|_| unknown())?;
    let version = doc
        .get("version")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(unknown)?
        .to_owned();
    let major: u64 = version
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .split('.')
        .next()
        // arch-lint: allow(no-silent-result-drop) reason="an unparsable major is reported as FrameworkVersionUnknown"
        .and_then(|m| m.parse().ok())
        .ok_or_else(unknown)?;

    if major < min || major > max {
        return Err(VersionError::FrameworkOutOfRange {
            package: package.to_owned(),
            version,
            min,
            max,
        });
    }

    tracing::info!(package, version = %version, "framework version accepted");
    Ok(version)
}

/// Create `dir` if needed; a broken cache is recreated once, then skipped.
fn usable_cache(dir: &Path) -> Option<PathBuf> {
    if dir.is_dir() || std::fs::create_dir_all(dir).is_ok() {
        return Some(dir.to_path_buf());
    }

    tracing::warn!(cache = %dir.display(), "package cache unusable; recreating");
    // arch-lint: allow(no-silent-result-drop) reason="recreate is best-effort; failure is handled by the create below"
    let _ = remove_entry(dir);
    match std::fs::create_dir_all(dir) {
        Ok(()) => Some(dir.to_path_buf()),
        Err(e) => {
            tracing::warn!(cache = %dir.display(), error = %e, "continuing without package cache");
            None
        }
    }
}

/// Remove a file, link or directory if present. Links are not followed.
fn remove_entry(path: &Path) -> Result<(), DependencyError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(DependencyError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| DependencyError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn copy_into(from: &Path, to: &Path) -> Result<(), DependencyError> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| DependencyError::Io {
            path: to.to_path_buf(),
            source: e,
        })
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pkg(dir: &Path, version: &str) {
        let pkg_dir = dir.join("node_modules_dev/nuxt");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join("package.json"),
            format!(r#"{{"name":"nuxt","version":"{version}"}}"#),
        )
        .unwrap();
        activate(dir, DependencyMode::Dev).unwrap();
    }

    #[test]
    fn framework_version_in_range() {
        let tmp = TempDir::new().unwrap();
        write_pkg(tmp.path(), "2.17.3");
        assert_eq!(
            check_framework_version(tmp.path(), "nuxt", 2, 2).unwrap(),
            "2.17.3"
        );
    }

    #[test]
    fn framework_version_out_of_range() {
        let tmp = TempDir::new().unwrap();
        write_pkg(tmp.path(), "3.8.0");
        let err = check_framework_version(tmp.path(), "nuxt", 2, 2).unwrap_err();
        assert!(matches!(err, VersionError::FrameworkOutOfRange { .. }));
    }

    #[test]
    fn framework_version_missing_package() {
        let tmp = TempDir::new().unwrap();
        let err = check_framework_version(tmp.path(), "nuxt", 2, 2).unwrap_err();
        assert!(matches!(err, VersionError::FrameworkVersionUnknown { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn activate_replaces_previous_link() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("node_modules_dev")).unwrap();
        std::fs::create_dir_all(tmp.path().join("node_modules_prod")).unwrap();

        activate(tmp.path(), DependencyMode::Dev).unwrap();
        activate(tmp.path(), DependencyMode::Prod).unwrap();

        let target = std::fs::read_link(tmp.path().join(DEPENDENCY_LINK)).unwrap();
        assert_eq!(target, PathBuf::from("node_modules_prod"));
    }

    #[test]
    fn broken_cache_is_recreated() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("yarn");
        std::fs::write(&cache, "not a directory").unwrap();

        assert_eq!(usable_cache(&cache), Some(cache.clone()));
        assert!(cache.is_dir());
    }
}
