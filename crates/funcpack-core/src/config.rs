use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::framework::FrameworkProfile;

/// funcpack.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncpackConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub framework: FrameworkProfile,
    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Which pipeline variant packages the project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// JavaScript framework built with its own build tool.
    #[default]
    Js,
    /// Rust binary built with cargo.
    Cargo,
}

impl Variant {
    pub fn default_entrypoint(self) -> &'static str {
        match self {
            Self::Js => "package.json",
            Self::Cargo => "Cargo.toml",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (defaults to the package manifest name)
    pub name: Option<String>,
    #[serde(default)]
    pub variant: Variant,
    /// Manifest path marking the project root, relative to the source tree
    pub entrypoint: Option<String>,
}

impl ProjectConfig {
    pub fn entrypoint(&self) -> &str {
        self.entrypoint
            .as_deref()
            .unwrap_or(self.variant.default_entrypoint())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Shared package cache reused across builds
    pub cache_dir: Option<PathBuf>,
    /// Parent directory for per-build work directories (system temp when unset)
    pub work_dir: Option<PathBuf>,
    /// Extra globs bundled into every function (relative to the project root)
    #[serde(default)]
    pub include_files: Vec<String>,
    /// Environment variables set on every function
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildSettings {
    /// Configured cache directory, or `<user cache dir>/funcpack`.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("funcpack")
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Platform CLI that uploads a directory and prints JSON event lines
    #[serde(default = "default_deploy_command")]
    pub command: Vec<String>,
    /// Pre-provided bearer token (takes precedence over every other source)
    pub token: Option<String>,
    /// Endpoint issuing bearer tokens
    pub token_endpoint: Option<String>,
    /// Local credentials file (`{"token": "..."}`)
    pub credentials_file: Option<PathBuf>,
    /// Tokens are reacquired after this many uses
    #[serde(default = "default_token_reuse_limit")]
    pub token_reuse_limit: u32,
    #[serde(default = "default_token_fetch_retries")]
    pub token_fetch_retries: u32,
    #[serde(default = "default_token_retry_delay_ms")]
    pub token_retry_delay_ms: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            command: default_deploy_command(),
            token: None,
            token_endpoint: None,
            credentials_file: None,
            token_reuse_limit: default_token_reuse_limit(),
            token_fetch_retries: default_token_fetch_retries(),
            token_retry_delay_ms: default_token_retry_delay_ms(),
        }
    }
}

impl DeployConfig {
    /// Configured credentials file, or `<user config dir>/funcpack/auth.json`.
    pub fn resolved_credentials_file(&self) -> Option<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| dirs::config_dir().map(|d| d.join("funcpack").join("auth.json")))
    }
}

impl FuncpackConfig {
    /// Load from funcpack.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join("funcpack.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

fn default_deploy_command() -> Vec<String> {
    vec![
        "platform".to_owned(),
        "deploy".to_owned(),
        "--events=json".to_owned(),
    ]
}

fn default_token_reuse_limit() -> u32 {
    10
}

fn default_token_fetch_retries() -> u32 {
    3
}

fn default_token_retry_delay_ms() -> u64 {
    500
}
