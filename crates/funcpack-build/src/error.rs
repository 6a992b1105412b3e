use std::fmt;
use std::path::PathBuf;

use funcpack_core::Collision;

/// Materialization or project-configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("manifest path {path:?} escapes the source root")]
    PathEscape { path: String },

    #[error("manifest path {path:?} is not a valid relative path")]
    InvalidPath { path: String },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("entrypoint {0:?} is not part of the file manifest")]
    MissingEntrypoint(String),

    #[error("no framework config in {dir}; looked for {}", candidates.join(", "))]
    MissingConfig {
        dir: PathBuf,
        candidates: Vec<String>,
    },

    #[error("cannot read framework config {path}: {detail}")]
    ConfigSyntax { path: PathBuf, detail: String },

    #[error("framework config {field} = {value:?} must be a relative path inside the project")]
    ConfigPath { field: &'static str, value: String },

    #[error("function name {0:?} must be a single non-empty path segment")]
    EntryName(String),

    #[error("no framework dependency declared; expected one of {}", candidates.join(", "))]
    MissingFramework { candidates: Vec<String> },

    #[error(transparent)]
    Project(#[from] funcpack_core::Error),
}

/// Dependency installation or dependency-set swap failure.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("dependency manifest not found at {0}")]
    MissingManifest(PathBuf),

    #[error("{manager} could not be started")]
    Spawn {
        manager: String,
        source: std::io::Error,
    },

    #[error("{manager} install exited with {}{}", exit_label(*exit_code), tail_suffix(output_tail))]
    Install {
        manager: String,
        exit_code: Option<i32>,
        output_tail: Vec<String>,
    },

    #[error("failed to prepare {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to point {link} at {target}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] funcpack_core::Error),
}

/// The external build command did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum BuildToolError {
    #[error("build tool `{tool}` could not be started")]
    NotFound {
        tool: String,
        source: std::io::Error,
    },

    #[error("build tool `{tool}` exited with {}{}", exit_label(Some(*exit_code)), tail_suffix(output_tail))]
    Failed {
        tool: String,
        /// `-1` when the process was terminated by a signal
        exit_code: i32,
        output_tail: Vec<String>,
    },
}

impl BuildToolError {
    pub fn tool(&self) -> &str {
        match self {
            Self::NotFound { tool, .. } | Self::Failed { tool, .. } => tool,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NotFound { .. } => None,
            Self::Failed { exit_code, .. } => Some(*exit_code),
        }
    }
}

/// Collection or bundling invariant violated.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("invalid glob {pattern:?}: {detail}")]
    InvalidGlob { pattern: String, detail: String },

    #[error("failed to walk {root}: {detail}")]
    Walk { root: PathBuf, detail: String },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Collision(#[from] Collision),

    #[error("expected build output {0} does not exist")]
    MissingOutput(PathBuf),

    #[error("bundle '{entry}' is missing {}", missing.join(", "))]
    IncompleteBundle { entry: String, missing: Vec<String> },

    #[error("failed to write archive: {detail}")]
    Archive { detail: String },
}

/// Runtime or framework version outside the supported range.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("runtime version {requested:?} is not supported; supported: {}", supported.join(", "))]
    UnsupportedRuntime {
        requested: String,
        supported: Vec<String>,
    },

    #[error("{package}@{version} is not supported; supported major versions: {min}..={max}")]
    FrameworkOutOfRange {
        package: String,
        version: String,
        min: u64,
        max: u64,
    },

    #[error("cannot determine the installed version of {package} from {path}")]
    FrameworkVersionUnknown { package: String, path: PathBuf },
}

/// Any failure of a single pipeline phase.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("failed to allocate work directories")]
    Workspace { source: std::io::Error },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    BuildTool(#[from] BuildToolError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Provision,
    Materialize,
    ResolveDev,
    Build,
    ResolveProd,
    Collect,
    Assemble,
    Emit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Provision => "provision",
            Self::Materialize => "materialize",
            Self::ResolveDev => "resolve (dev)",
            Self::Build => "build",
            Self::ResolveProd => "resolve (prod)",
            Self::Collect => "collect",
            Self::Assemble => "assemble",
            Self::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// A pipeline run aborted at `phase`.
#[derive(Debug, thiserror::Error)]
#[error("{phase} phase failed")]
pub struct PipelineError {
    pub phase: Phase,
    #[source]
    pub source: PhaseError,
}

impl PipelineError {
    pub fn new(phase: Phase, source: impl Into<PhaseError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(-1) | None => "a signal".to_owned(),
        Some(code) => format!("code {code}"),
    }
}

fn tail_suffix(tail: &[String]) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n{}", tail.join("\n"))
    }
}
