//! Artifact collection: glob, re-root, reference.

use std::path::{Path, PathBuf};

use funcpack_core::{ArtifactMap, ContentRef};
use walkdir::WalkDir;
use wax::{CandidatePath, Glob, Pattern};

use crate::error::PackagingError;

/// The four disjoint namespaces of a build's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AreaKind {
    /// Project static assets, served as-is.
    Static,
    /// Built client assets under the public path.
    Client,
    /// Built server code loaded by the function.
    Server,
    /// Production dependency tree.
    Dependencies,
}

/// One logical source area of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Area {
    /// Files under `root` matching `pattern`, re-rooted at `prefix`.
    Tree {
        kind: AreaKind,
        pattern: String,
        root: PathBuf,
        prefix: String,
        /// A missing `root` is an error rather than an empty area.
        required: bool,
    },
    /// A single file re-rooted at `dest`.
    File {
        kind: AreaKind,
        path: PathBuf,
        dest: String,
    },
}

impl Area {
    pub fn tree(kind: AreaKind, pattern: &str, root: PathBuf, prefix: &str) -> Self {
        Self::Tree {
            kind,
            pattern: pattern.to_owned(),
            root,
            prefix: prefix.to_owned(),
            required: false,
        }
    }

    /// Mark a tree area as required.
    pub fn required(self) -> Self {
        match self {
            Self::Tree {
                kind,
                pattern,
                root,
                prefix,
                ..
            } => Self::Tree {
                kind,
                pattern,
                root,
                prefix,
                required: true,
            },
            file @ Self::File { .. } => file,
        }
    }

    pub fn kind(&self) -> AreaKind {
        match self {
            Self::Tree { kind, .. } | Self::File { kind, .. } => *kind,
        }
    }

    pub fn collect(&self) -> Result<ArtifactMap, PackagingError> {
        match self {
            Self::Tree {
                pattern,
                root,
                prefix,
                required: true,
                ..
            } => collect_required(pattern, root, prefix),
            Self::Tree {
                pattern,
                root,
                prefix,
                ..
            } => collect(pattern, root, prefix),
            Self::File { path, dest, .. } => {
                if std::fs::symlink_metadata(path).is_err() {
                    return Err(PackagingError::MissingOutput(path.clone()));
                }
                let content = ContentRef::from_path(path).map_err(|e| PackagingError::Read {
                    path: path.clone(),
                    source: e,
                })?;
                let mut map = ArtifactMap::new();
                map.insert(dest.clone(), content)?;
                Ok(map)
            }
        }
    }
}

/// Map every file under `root` matching `pattern` to `prefix/<relative path>`.
///
/// Symlinks are recorded as links and never followed; file modes are kept.
/// A missing `root` yields an empty map.
pub fn collect(pattern: &str, root: &Path, prefix: &str) -> Result<ArtifactMap, PackagingError> {
    if std::fs::symlink_metadata(root).is_err() {
        tracing::debug!(root = %root.display(), "collect root absent; nothing to collect");
        return Ok(ArtifactMap::new());
    }
    collect_required(pattern, root, prefix)
}

/// Like [`collect`], but a missing `root` is a [`PackagingError::MissingOutput`].
pub fn collect_required(
    pattern: &str,
    root: &Path,
    prefix: &str,
) -> Result<ArtifactMap, PackagingError> {
    if std::fs::symlink_metadata(root).is_err() {
        return Err(PackagingError::MissingOutput(root.to_path_buf()));
    }

    let glob = Glob::new(pattern).map_err(|e| PackagingError::InvalidGlob {
        pattern: pattern.to_owned(),
        detail: e.to_string(),
    })?;

    let mut map = ArtifactMap::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| PackagingError::Walk {
            root: root.to_path_buf(),
            detail: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            // arch-lint: allow(no-silent-result-drop) reason="walkdir yields paths below root; the prefix always strips"
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if glob.matched(&CandidatePath::from(relative.as_str())).is_none() {
            continue;
        }

        let content = ContentRef::from_path(entry.path()).map_err(|e| PackagingError::Read {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        map.insert(join_prefix(prefix, &relative), content)?;
    }

    tracing::debug!(
        root = %root.display(),
        pattern,
        prefix,
        files = map.len(),
        "collected artifacts"
    );
    Ok(map)
}

/// Join a deployable prefix and a relative path with exactly one `/`.
pub fn join_prefix(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = relative.trim_start_matches('/');
    if prefix.is_empty() {
        relative.to_owned()
    } else {
        format!("{prefix}/{relative}")
    }
}
