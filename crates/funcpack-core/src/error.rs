use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Source manifests ──
    #[error("failed to read file manifest {path}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse file manifest {path}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to list source files in {dir}: {detail}")]
    SourceListing { dir: PathBuf, detail: String },

    // ── Project manifests ──
    #[error("failed to read {path}")]
    ProjectManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    ProjectManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    PackageJsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize package manifest")]
    PackageJsonWrite { source: serde_json::Error },

    #[error("cargo metadata failed for {manifest_path}: {detail}")]
    CargoMetadata {
        manifest_path: PathBuf,
        detail: String,
    },

    #[error("failed to resolve project directory {path}")]
    ProjectDirResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "no package found in {dir}; workspace members: {}",
        workspace_members.join(", ")
    )]
    NoPackageInDir {
        dir: PathBuf,
        workspace_members: Vec<String>,
    },

    #[error("no binary target in package '{package}'; funcpack requires a binary to bundle")]
    NoBinaryTarget { package: String },

    #[error(
        "multiple binary targets found: {}; set `default-run` in Cargo.toml to select one",
        names.join(", ")
    )]
    MultipleBinaries { names: Vec<String> },
}
