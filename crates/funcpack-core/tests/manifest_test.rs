use funcpack_core::{ContentRef, FileManifest};
use tempfile::TempDir;

#[test]
fn load_json_inline_and_file_entries() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("logo.svg"), "<svg/>").unwrap();
    std::fs::write(
        tmp.path().join("manifest.json"),
        r##"{
            "package.json": { "data": "{\"name\":\"site\"}" },
            "bin/run.sh": { "data": "#!/bin/sh", "mode": 493 },
            "static/logo.svg": { "file": "logo.svg" }
        }"##,
    )
    .unwrap();

    let manifest = FileManifest::load_json(&tmp.path().join("manifest.json")).unwrap();

    assert_eq!(manifest.len(), 3);
    assert_eq!(
        manifest.get("package.json").unwrap().read_bytes().unwrap(),
        b"{\"name\":\"site\"}"
    );
    assert_eq!(manifest.get("bin/run.sh").unwrap().mode(), 0o755);
    assert!(matches!(
        manifest.get("static/logo.svg"),
        Some(ContentRef::File { .. })
    ));
}

#[test]
fn load_json_missing_referenced_file_errors() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("manifest.json"),
        r#"{ "a.txt": { "file": "does-not-exist.txt" } }"#,
    )
    .unwrap();

    assert!(FileManifest::load_json(&tmp.path().join("manifest.json")).is_err());
}

#[test]
fn load_json_malformed_errors() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("manifest.json"), "[1, 2").unwrap();

    let err = FileManifest::load_json(&tmp.path().join("manifest.json"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("parse"), "got: {err}");
}

#[test]
fn from_dir_skips_always_excluded_directories() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("pages")).unwrap();
    std::fs::create_dir_all(tmp.path().join("node_modules/vue")).unwrap();
    std::fs::create_dir_all(tmp.path().join(".funcpack")).unwrap();
    std::fs::write(tmp.path().join("package.json"), "{}").unwrap();
    std::fs::write(tmp.path().join("pages/index.vue"), "<template/>").unwrap();
    std::fs::write(tmp.path().join("node_modules/vue/index.js"), "").unwrap();
    std::fs::write(tmp.path().join(".funcpack/launcher.js"), "").unwrap();

    let manifest = FileManifest::from_dir(tmp.path()).unwrap();

    assert!(manifest.contains("package.json"));
    assert!(manifest.contains("pages/index.vue"));
    assert!(!manifest.contains("node_modules/vue/index.js"));
    assert!(!manifest.contains(".funcpack/launcher.js"));
}
