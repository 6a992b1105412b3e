//! Content references and the deployable-path → content mapping.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Default mode for regular files without recorded permissions.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for executables produced by the pipeline (launchers, binaries).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Where the bytes of one file come from.
///
/// Collection and packaging only ever move these around; the referenced
/// content is never transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    /// Bytes held in memory, e.g. a generated launcher.
    Inline { bytes: Vec<u8>, mode: u32 },
    /// An existing file on disk.
    File { path: PathBuf, mode: u32 },
    /// A symbolic link, kept as a link rather than followed.
    Symlink { target: PathBuf },
}

impl ContentRef {
    pub fn inline(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Inline {
            bytes: bytes.into(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    /// Reference an on-disk entry without following it if it is a link.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.file_type().is_symlink() {
            return Ok(Self::Symlink {
                target: std::fs::read_link(path)?,
            });
        }
        Ok(Self::File {
            path: path.to_path_buf(),
            mode: file_mode(&meta),
        })
    }

    pub fn mode(&self) -> u32 {
        match self {
            Self::Inline { mode, .. } | Self::File { mode, .. } => *mode,
            Self::Symlink { .. } => 0o777,
        }
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink { .. })
    }

    /// Read the referenced bytes. Links yield their target path.
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match self {
            Self::Inline { bytes, .. } => Ok(bytes.clone()),
            Self::File { path, .. } => std::fs::read(path),
            Self::Symlink { target } => Ok(target.to_string_lossy().into_owned().into_bytes()),
        }
    }

    /// Write the content to `dest`, creating parent directories.
    pub fn write_to(&self, dest: &Path) -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match self {
            Self::Inline { bytes, mode } => {
                std::fs::write(dest, bytes)?;
                set_mode(dest, *mode)
            }
            Self::File { path, mode } => {
                std::fs::copy(path, dest)?;
                set_mode(dest, *mode)
            }
            Self::Symlink { target } => make_symlink(target, dest),
        }
    }
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> u32 {
    DEFAULT_FILE_MODE
}

#[cfg(unix)]
fn set_mode(dest: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_dest: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "cannot create symlink {} -> {} on this platform",
            dest.display(),
            target.display()
        ),
    ))
}

/// Two artifact areas produced the same deployable path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("artifact path collision at {0}")]
pub struct Collision(pub String);

/// Mapping from final deployable path (POSIX, relative) to content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMap {
    entries: BTreeMap<String, ContentRef>,
}

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, refusing to overwrite an existing path.
    pub fn insert(&mut self, path: impl Into<String>, content: ContentRef) -> Result<(), Collision> {
        let path = path.into();
        if self.entries.contains_key(&path) {
            return Err(Collision(path));
        }
        self.entries.insert(path, content);
        Ok(())
    }

    /// Move every entry of `other` into `self`.
    ///
    /// Fails on the first path present in both maps; `self` keeps the
    /// entries merged up to that point.
    pub fn merge(&mut self, other: ArtifactMap) -> Result<(), Collision> {
        for (path, content) in other.entries {
            self.insert(path, content)?;
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&ContentRef> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentRef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for ArtifactMap {
    type Item = (String, ContentRef);
    type IntoIter = std::collections::btree_map::IntoIter<String, ContentRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
