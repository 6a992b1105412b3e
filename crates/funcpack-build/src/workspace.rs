//! Per-build work directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Allocates a fresh set of work directories for every build.
#[derive(Debug, Clone)]
pub struct Provisioner {
    parent: Option<PathBuf>,
    cache_dir: PathBuf,
}

impl Provisioner {
    /// `parent` holds the per-build directories (system temp when `None`);
    /// `cache_dir` is the package cache shared across builds.
    pub fn new(parent: Option<PathBuf>, cache_dir: PathBuf) -> Self {
        Self { parent, cache_dir }
    }

    /// Create a new, empty, uniquely named work directory tree.
    ///
    /// The returned [`WorkPaths`] removes its directories when dropped.
    pub fn allocate(&self) -> std::io::Result<WorkPaths> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("funcpack-");
        let root = match &self.parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let src = root.path().join("src");
        let out = root.path().join("out");
        std::fs::create_dir(&src)?;
        std::fs::create_dir(&out)?;
        std::fs::create_dir_all(&self.cache_dir)?;

        tracing::debug!(
            root = %root.path().display(),
            cache = %self.cache_dir.display(),
            "allocated work directories"
        );

        Ok(WorkPaths {
            root,
            src,
            out,
            cache: self.cache_dir.clone(),
        })
    }
}

/// Directories exclusively owned by one build invocation.
#[derive(Debug)]
pub struct WorkPaths {
    root: TempDir,
    src: PathBuf,
    out: PathBuf,
    cache: PathBuf,
}

impl WorkPaths {
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Materialized source tree.
    pub fn src(&self) -> &Path {
        &self.src
    }

    /// Scratch space for build outputs that live outside the source tree.
    pub fn out(&self) -> &Path {
        &self.out
    }

    /// Shared package cache. Not removed with the work directories.
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    /// Remove the work directories now, reporting failures.
    pub fn close(self) -> std::io::Result<()> {
        self.root.close()
    }
}
