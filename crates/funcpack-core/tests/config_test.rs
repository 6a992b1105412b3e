use funcpack_core::{FuncpackConfig, Variant};
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_no_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = FuncpackConfig::load(tmp.path()).unwrap();

    assert!(config.project.name.is_none());
    assert_eq!(config.project.variant, Variant::Js);
    assert_eq!(config.project.entrypoint(), "package.json");
    assert!(config.build.cache_dir.is_none());
    assert!(config.build.include_files.is_empty());
    assert!(config.build.env.is_empty());
    assert_eq!(
        config.framework.config_files,
        vec!["nuxt.config.js", "nuxt.config.ts"]
    );
    assert_eq!(config.framework.min_major, 2);
    assert_eq!(config.framework.max_major, 2);
    assert_eq!(config.framework.exclusion.version, 1);
    assert_eq!(config.deploy.token_reuse_limit, 10);
    assert_eq!(config.deploy.token_fetch_retries, 3);
    assert_eq!(config.deploy.token_retry_delay_ms, 500);
    assert!(config.deploy.token.is_none());
}

#[test]
fn load_parses_full_config() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[project]
name = "storefront"
variant = "js"
entrypoint = "web/package.json"

[build]
cache_dir = "/var/cache/funcpack"
include_files = ["package.json", "locales/**"]

[build.env]
API_BASE = "https://api.example.com"

[framework]
config_files = ["project.config.js"]
package_manifest = "pkg.json"
build_command = ["nuxt", "build", "--config-file", "{config}"]
min_major = 2
max_major = 3

[framework.exclusion]
version = 2
replace = { nuxt = "nuxt-start" }
drop = ["@nuxt/typescript-build"]

[deploy]
command = ["platform-cli", "deploy", "--json"]
token_endpoint = "https://auth.example.com/token"
credentials_file = "/home/me/.platform/auth.json"
token_reuse_limit = 5
token_fetch_retries = 2
token_retry_delay_ms = 100
"#;
    std::fs::write(tmp.path().join("funcpack.toml"), toml).unwrap();

    let config = FuncpackConfig::load(tmp.path()).unwrap();

    assert_eq!(config.project.name.as_deref(), Some("storefront"));
    assert_eq!(config.project.entrypoint(), "web/package.json");
    assert_eq!(
        config.build.resolved_cache_dir(),
        std::path::PathBuf::from("/var/cache/funcpack")
    );
    assert_eq!(config.build.include_files, vec!["package.json", "locales/**"]);
    assert_eq!(config.build.env["API_BASE"], "https://api.example.com");
    assert_eq!(config.framework.package_manifest, "pkg.json");
    assert_eq!(config.framework.max_major, 3);
    assert_eq!(config.framework.exclusion.version, 2);
    assert_eq!(config.framework.exclusion.drop, vec!["@nuxt/typescript-build"]);
    assert_eq!(config.deploy.command, vec!["platform-cli", "deploy", "--json"]);
    assert_eq!(config.deploy.token_reuse_limit, 5);
    assert_eq!(
        config.deploy.resolved_credentials_file(),
        Some(std::path::PathBuf::from("/home/me/.platform/auth.json"))
    );
}

#[test]
fn load_cargo_variant_defaults_entrypoint() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("funcpack.toml"),
        "[project]\nvariant = \"cargo\"\n",
    )
    .unwrap();

    let config = FuncpackConfig::load(tmp.path()).unwrap();
    assert_eq!(config.project.variant, Variant::Cargo);
    assert_eq!(config.project.entrypoint(), "Cargo.toml");
}

#[test]
fn load_partial_framework_section_fills_defaults() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("funcpack.toml"),
        "[framework]\nconfig_files = [\"nuxt.config.mjs\"]\n",
    )
    .unwrap();

    let config = FuncpackConfig::load(tmp.path()).unwrap();
    assert_eq!(config.framework.config_files, vec!["nuxt.config.mjs"]);
    assert_eq!(config.framework.package_manifest, "package.json");
    assert_eq!(config.framework.exclusion.replace["nuxt-edge"], "nuxt-start-edge");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("funcpack.toml"), "not valid {{{{ toml").unwrap();

    let err = FuncpackConfig::load(tmp.path()).unwrap_err().to_string();
    assert!(err.contains("parse"));
}

#[test]
fn load_unknown_variant_is_an_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("funcpack.toml"),
        "[project]\nvariant = \"cobol\"\n",
    )
    .unwrap();

    assert!(FuncpackConfig::load(tmp.path()).is_err());
}
