//! Declarative source trees.
//!
//! A [`FileManifest`] maps POSIX-style relative paths to content references.
//! It is the pipeline's only input representation of source: the CLI builds
//! one from a directory (via `git ls-files` when possible) or loads one from
//! a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use walkdir::WalkDir;

use crate::artifact::{ContentRef, DEFAULT_FILE_MODE};

/// Directories never taken into a manifest built from disk.
const ALWAYS_EXCLUDED: &[&str] = &[".git", ".funcpack", "node_modules"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    files: BTreeMap<String, ContentRef>,
}

/// One entry of a JSON manifest file.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntryRepr {
    Data {
        data: String,
        #[serde(default)]
        mode: Option<u32>,
    },
    File {
        file: PathBuf,
    },
}

impl FileManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, path: impl Into<String>, content: ContentRef) {
        self.files.insert(path.into(), content);
    }

    /// Builder-style helper for inline text/bytes.
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, ContentRef::inline(bytes));
        self
    }

    pub fn get(&self, path: &str) -> Option<&ContentRef> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentRef)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Load a JSON manifest: `{"<path>": {"data": "..."} | {"file": "..."}}`.
    ///
    /// Relative `file` references resolve against the manifest's directory.
    pub fn load_json(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let raw: BTreeMap<String, EntryRepr> =
            serde_json::from_str(&content).map_err(|e| crate::Error::ManifestParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let base = path.parent().unwrap_or(Path::new("."));
        let mut manifest = Self::new();
        for (rel, entry) in raw {
            let content = match entry {
                EntryRepr::Data { data, mode } => ContentRef::Inline {
                    bytes: data.into_bytes(),
                    mode: mode.unwrap_or(DEFAULT_FILE_MODE),
                },
                EntryRepr::File { file } => {
                    let resolved = base.join(file);
                    ContentRef::from_path(&resolved).map_err(|e| crate::Error::ManifestRead {
                        path: resolved.clone(),
                        source: e,
                    })?
                }
            };
            manifest.insert(rel, content);
        }

        tracing::debug!(path = %path.display(), files = manifest.len(), "loaded file manifest");
        Ok(manifest)
    }

    /// Build a manifest referencing the files of a project directory.
    ///
    /// Inside a git work tree the file list comes from `git ls-files`
    /// (tracked + untracked-not-ignored); otherwise the directory is walked.
    pub fn from_dir(dir: &Path) -> crate::Result<Self> {
        let files = if is_git_work_tree(dir) {
            git_ls_files(dir)?
        } else {
            walk_files(dir)?
        };

        let mut manifest = Self::new();
        for relative_path in files {
            if is_excluded(&relative_path) {
                continue;
            }
            let src = dir.join(&relative_path);
            // git lists deleted-but-tracked files too
            if std::fs::symlink_metadata(&src).is_err() {
                tracing::debug!(path = %src.display(), "listed file missing on disk; skipping");
                continue;
            }
            let content = ContentRef::from_path(&src).map_err(|e| crate::Error::ManifestRead {
                path: src.clone(),
                source: e,
            })?;
            manifest.insert(to_posix(&relative_path), content);
        }

        tracing::debug!(dir = %dir.display(), files = manifest.len(), "collected source manifest");
        Ok(manifest)
    }
}

fn is_excluded(relative_path: &Path) -> bool {
    relative_path
        .components()
        .next()
        .is_some_and(|c| ALWAYS_EXCLUDED.iter().any(|ex| c.as_os_str() == *ex))
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_git_work_tree(dir: &Path) -> bool {
    match Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
    {
        Ok(output) => output.status.success(),
        Err(e) => {
            tracing::debug!(error = %e, "git unavailable; walking directory instead");
            false
        }
    }
}

/// Returns the list of files git considers part of the project:
/// tracked files + untracked files that are not .gitignored.
fn git_ls_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["ls-files", "--cached", "--others", "--exclude-standard"])
        .current_dir(dir)
        .output()
        .map_err(|e| crate::Error::SourceListing {
            dir: dir.to_path_buf(),
            detail: format!("failed to execute git ls-files: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(crate::Error::SourceListing {
            dir: dir.to_path_buf(),
            detail: format!(
                "git ls-files exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn walk_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let rel = e.path().strip_prefix(dir).unwrap_or(e.path());
            !is_excluded(rel)
        });
    for entry in walker {
        let entry = entry.map_err(|e| crate::Error::SourceListing {
            dir: dir.to_path_buf(),
            detail: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        files.push(rel.to_path_buf());
    }
    Ok(files)
}
