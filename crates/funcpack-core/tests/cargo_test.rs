use funcpack_core::CargoProject;
use tempfile::TempDir;

fn write(dir: &std::path::Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn names(project: &CargoProject) -> Vec<&str> {
    project.binaries.iter().map(|b| b.name.as_str()).collect()
}

#[test]
fn discover_single_package() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"my-api\"\nversion = \"1.2.3\"\nedition = \"2021\"\n",
    );
    write(tmp.path(), "src/main.rs", "fn main() {}\n");

    let project = CargoProject::discover(tmp.path()).unwrap();
    let root = tmp.path().canonicalize().unwrap();
    assert_eq!(project.name, "my-api");
    assert_eq!(project.version, "1.2.3");
    assert_eq!(project.default_binary, "my-api");
    assert_eq!(names(&project), vec!["my-api"]);
    assert_eq!(project.manifest_path, root.join("Cargo.toml"));
    assert_eq!(project.package_dir, root);
    assert_eq!(project.workspace_root, root);
}

#[test]
fn uses_bin_name_when_present() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        r#"[package]
name = "my-lib"
version = "0.1.0"
edition = "2021"

[[bin]]
name = "my-handler"
path = "src/main.rs"
"#,
    );
    write(tmp.path(), "src/main.rs", "fn main() {}\n");

    let project = CargoProject::discover(tmp.path()).unwrap();
    assert_eq!(project.name, "my-lib");
    assert_eq!(project.default_binary, "my-handler");
    assert_eq!(names(&project), vec!["my-handler"]);
}

#[test]
fn auto_discovers_src_bin_targets() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"multi\"\nversion = \"0.1.0\"\nedition = \"2021\"\ndefault-run = \"worker\"\n",
    );
    write(tmp.path(), "src/bin/api.rs", "fn main() {}\n");
    write(tmp.path(), "src/bin/worker.rs", "fn main() {}\n");

    let project = CargoProject::discover(tmp.path()).unwrap();
    assert_eq!(names(&project), vec!["api", "worker"]);
    assert_eq!(project.default_binary, "worker");
}

#[test]
fn discovers_binary_in_src_bin_subdirectory() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"svc\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write(tmp.path(), "src/bin/api/main.rs", "fn main() {}\n");

    let project = CargoProject::discover(tmp.path()).unwrap();
    assert_eq!(names(&project), vec!["api"]);
    assert_eq!(project.default_binary, "api");
    assert!(project.binaries[0].src_path.ends_with("src/bin/api/main.rs"));
}

#[test]
fn workspace_member_inherits_package_fields() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[workspace]\nmembers = [\"svc\"]\nresolver = \"2\"\n\n[workspace.package]\nversion = \"2.4.0\"\nedition = \"2021\"\n",
    );
    write(
        tmp.path(),
        "svc/Cargo.toml",
        "[package]\nname = \"svc\"\nversion.workspace = true\nedition.workspace = true\n",
    );
    write(tmp.path(), "svc/src/main.rs", "fn main() {}\n");

    let project = CargoProject::discover(&tmp.path().join("svc")).unwrap();
    assert_eq!(project.version, "2.4.0");
    assert_eq!(project.default_binary, "svc");
    assert_eq!(project.workspace_root, tmp.path().canonicalize().unwrap());
}

#[test]
fn ambiguous_binaries_error() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"multi\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write(tmp.path(), "src/bin/api.rs", "fn main() {}\n");
    write(tmp.path(), "src/bin/worker.rs", "fn main() {}\n");

    let err = CargoProject::discover(tmp.path()).unwrap_err().to_string();
    assert!(err.contains("default-run"), "got: {err}");
}

#[test]
fn library_only_package_errors() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"just-a-lib\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write(tmp.path(), "src/lib.rs", "pub fn f() {}\n");

    let err = CargoProject::discover(tmp.path()).unwrap_err().to_string();
    assert!(err.contains("no binary target"), "got: {err}");
}

#[test]
fn virtual_workspace_manifest_lists_members() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[workspace]\nmembers = [\"a\"]\nresolver = \"2\"\n",
    );
    write(
        tmp.path(),
        "a/Cargo.toml",
        "[package]\nname = \"a\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write(tmp.path(), "a/src/main.rs", "fn main() {}\n");

    let err = CargoProject::discover(tmp.path()).unwrap_err().to_string();
    assert!(err.contains("no package found"), "got: {err}");
    assert!(err.contains("workspace members: a"), "got: {err}");
}

#[test]
fn missing_manifest_errors() {
    let tmp = TempDir::new().unwrap();
    let err = CargoProject::discover(tmp.path()).unwrap_err().to_string();
    assert!(err.contains("cargo metadata failed"), "got: {err}");
}
