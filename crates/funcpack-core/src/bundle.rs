use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::{ArtifactMap, ContentRef};

/// Everything a remote executor needs to run one function.
///
/// **Invariant:** every file the handler loads at execution time is a key
/// in [`files`](Self::files).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBundle {
    /// Logical entry-point name, e.g. `index`.
    pub name: String,
    /// Handler reference understood by the runtime, e.g. `launcher.launcher`.
    pub handler: String,
    /// Runtime identifier, e.g. `nodejs20.x` or `provided.al2`.
    pub runtime: String,
    pub env: BTreeMap<String, String>,
    pub files: ArtifactMap,
}

/// Metadata written next to a packaged archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionMeta<'a> {
    pub name: &'a str,
    pub handler: &'a str,
    pub runtime: &'a str,
    pub env: &'a BTreeMap<String, String>,
    pub digest: &'a str,
    pub files: usize,
}

/// A bundle packed into an archive ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedFunction {
    pub bundle: FunctionBundle,
    pub archive: Vec<u8>,
    /// Hex-encoded SHA-256 of `archive`.
    pub digest: String,
}

impl PackagedFunction {
    pub fn meta(&self) -> FunctionMeta<'_> {
        FunctionMeta {
            name: &self.bundle.name,
            handler: &self.bundle.handler,
            runtime: &self.bundle.runtime,
            env: &self.bundle.env,
            digest: &self.digest,
            files: self.bundle.files.len(),
        }
    }
}

/// One named pipeline output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Static(ContentRef),
    Function(Box<PackagedFunction>),
}

impl Output {
    pub fn as_function(&self) -> Option<&PackagedFunction> {
        match self {
            Self::Function(f) => Some(f),
            Self::Static(_) => None,
        }
    }

    pub fn as_static(&self) -> Option<&ContentRef> {
        match self {
            Self::Static(c) => Some(c),
            Self::Function(_) => None,
        }
    }
}
