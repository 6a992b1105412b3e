//! Framework profile (how to drive a JS framework) and the framework's own
//! build configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the JS variant recognizes, builds, and slims one framework family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkProfile {
    /// Candidate config module names, first existing one wins
    #[serde(default = "default_config_files")]
    pub config_files: Vec<String>,
    /// Package manifest file name
    #[serde(default = "default_package_manifest")]
    pub package_manifest: String,
    /// Build command; `{config}` expands to the config file path
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
    /// Supported framework major versions (inclusive)
    #[serde(default = "default_major")]
    pub min_major: u64,
    #[serde(default = "default_major")]
    pub max_major: u64,
    /// Framework package name → launcher suffix
    #[serde(default = "default_framework_packages")]
    pub framework_packages: BTreeMap<String, String>,
    #[serde(default)]
    pub exclusion: ExclusionPolicy,
}

impl Default for FrameworkProfile {
    fn default() -> Self {
        Self {
            config_files: default_config_files(),
            package_manifest: default_package_manifest(),
            build_command: default_build_command(),
            min_major: default_major(),
            max_major: default_major(),
            framework_packages: default_framework_packages(),
            exclusion: ExclusionPolicy::default(),
        }
    }
}

/// Build-only packages removed from the production dependency declaration.
///
/// The policy is versioned so that a change in the excluded set is an
/// explicit, reviewable event rather than a silent behavior change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    #[serde(default = "default_policy_version")]
    pub version: u32,
    /// Package → runtime-only replacement (keeps the version spec)
    #[serde(default = "default_replacements")]
    pub replace: BTreeMap<String, String>,
    /// Packages removed without replacement
    #[serde(default)]
    pub drop: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            version: default_policy_version(),
            replace: default_replacements(),
            drop: Vec::new(),
        }
    }
}

fn default_config_files() -> Vec<String> {
    vec!["nuxt.config.js".to_owned(), "nuxt.config.ts".to_owned()]
}

fn default_package_manifest() -> String {
    "package.json".to_owned()
}

fn default_build_command() -> Vec<String> {
    ["nuxt", "build", "--standalone", "--no-lock", "--config-file", "{config}"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_major() -> u64 {
    2
}

fn default_framework_packages() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("nuxt".to_owned(), String::new()),
        ("nuxt-edge".to_owned(), "-edge".to_owned()),
    ])
}

fn default_policy_version() -> u32 {
    1
}

fn default_replacements() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("nuxt".to_owned(), "nuxt-start".to_owned()),
        ("nuxt-edge".to_owned(), "nuxt-start-edge".to_owned()),
    ])
}

/// The few framework configuration fields the pipeline reads.
///
/// Anything else in the framework config is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Static assets directory, relative to the project root
    pub static_dir: String,
    /// URL prefix of built client assets, e.g. `/_nuxt/`
    pub public_path: String,
    /// Build output directory, relative to the project root
    pub build_dir: String,
    /// One function bundle per entry point
    pub entry_points: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            static_dir: "static".to_owned(),
            public_path: "/_nuxt/".to_owned(),
            build_dir: ".nuxt".to_owned(),
            entry_points: vec!["index".to_owned()],
        }
    }
}

impl BuildConfig {
    /// Extract recognized fields from a parsed config object.
    ///
    /// Missing fields and fields of an unexpected type fall back to defaults.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let string_at = |pointer: &str| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let entry_points = value
            .pointer("/lambdaNames")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .or_else(|| string_at("/lambdaName").map(|n| vec![n]))
            .unwrap_or(defaults.entry_points);

        Self {
            static_dir: string_at("/dir/static").unwrap_or(defaults.static_dir),
            public_path: string_at("/build/publicPath").unwrap_or(defaults.public_path),
            build_dir: string_at("/buildDir").unwrap_or(defaults.build_dir),
            entry_points,
        }
    }

    /// The default (first) entry point.
    pub fn default_entry(&self) -> &str {
        self.entry_points.first().map_or("index", String::as_str)
    }

    /// Public path without leading/trailing slashes, used as an artifact prefix.
    pub fn public_prefix(&self) -> &str {
        self.public_path.trim_matches('/')
    }
}
