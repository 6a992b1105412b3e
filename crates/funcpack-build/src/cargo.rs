//! Compiled-runtime packager for Cargo projects.
//!
//! The release binary is shipped as `bootstrap` on a custom runtime. It is
//! statically linked, so the production resolve has nothing to install.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use funcpack_core::{ArtifactMap, BuildSettings, CargoProject, RoutingManifest};

use crate::assemble::BundleInputs;
use crate::collect::{Area, AreaKind};
use crate::deps::{DependencyMode, install_error};
use crate::error::{PhaseError, SourceError};
use crate::invoke::BuildInvoker;
use crate::pipeline::{Collected, Packager};
use crate::routes;
use crate::runner::{CommandRunner, CommandSpec, SystemRunner};
use crate::workspace::WorkPaths;

pub const BOOTSTRAP: &str = "bootstrap";
pub const RUNTIME: &str = "provided.al2";
pub const ENTRY: &str = "index";

pub struct CargoPackager<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl Default for CargoPackager<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl CargoPackager<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner::new())
    }
}

impl<R: CommandRunner> CargoPackager<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Routing manifest a build would emit; the same for every project.
    pub fn preview_routes(&self) -> RoutingManifest {
        routes::emit_catch_all(ENTRY)
    }
}

#[derive(Debug, Clone)]
pub struct CargoPlan {
    pub project: CargoProject,
    pub project_dir: PathBuf,
    pub target_dir: PathBuf,
    pub tool_env: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub include_files: Vec<String>,
}

impl CargoPlan {
    fn manifest_arg(&self) -> String {
        self.project.manifest_path.to_string_lossy().into_owned()
    }
}

impl<R: CommandRunner> Packager for CargoPackager<R> {
    type Plan = CargoPlan;

    fn variant(&self) -> &'static str {
        "cargo"
    }

    fn root_marker(&self) -> &str {
        "Cargo.toml"
    }

    fn plan(
        &self,
        project_dir: &Path,
        paths: &WorkPaths,
        settings: &BuildSettings,
    ) -> Result<CargoPlan, PhaseError> {
        let project = CargoProject::discover(project_dir).map_err(SourceError::from)?;
        let target_dir = paths.out().join("target");

        let tool_env = BTreeMap::from([
            (
                "CARGO_HOME".to_owned(),
                paths.cache().join("cargo").to_string_lossy().into_owned(),
            ),
            (
                "CARGO_TARGET_DIR".to_owned(),
                target_dir.to_string_lossy().into_owned(),
            ),
        ]);

        tracing::info!(
            package = %project.name,
            version = %project.version,
            binary = %project.default_binary,
            "planned cargo build"
        );

        Ok(CargoPlan {
            project,
            project_dir: project_dir.to_path_buf(),
            target_dir,
            tool_env,
            env: settings.env.clone(),
            include_files: settings.include_files.clone(),
        })
    }

    fn resolve(
        &self,
        plan: &CargoPlan,
        mode: DependencyMode,
        _paths: &WorkPaths,
    ) -> Result<(), PhaseError> {
        if mode == DependencyMode::Prod {
            tracing::debug!(package = %plan.project.name, "static binary; no production dependencies");
            return Ok(());
        }

        let spec = CommandSpec::new("cargo", &plan.project_dir)
            .args(["fetch", "--manifest-path"])
            .arg(plan.manifest_arg())
            .envs(&plan.tool_env);
        self.runner
            .run(&spec)
            .map_err(|e| install_error("cargo", e))?;
        Ok(())
    }

    fn build(&self, plan: &CargoPlan, _paths: &WorkPaths) -> Result<(), PhaseError> {
        let args = vec![
            "build".to_owned(),
            "--release".to_owned(),
            "--bin".to_owned(),
            plan.project.default_binary.clone(),
            "--manifest-path".to_owned(),
            plan.manifest_arg(),
        ];
        BuildInvoker::new(&self.runner).invoke("cargo", &args, &plan.project_dir, &plan.tool_env)?;
        Ok(())
    }

    fn areas(&self, plan: &CargoPlan, _paths: &WorkPaths) -> Vec<Area> {
        vec![Area::File {
            kind: AreaKind::Server,
            path: plan
                .target_dir
                .join("release")
                .join(binary_file_name(&plan.project.default_binary)),
            dest: BOOTSTRAP.to_owned(),
        }]
    }

    fn entry_points(&self, _plan: &CargoPlan) -> Vec<String> {
        vec![ENTRY.to_owned()]
    }

    fn bundle_inputs(&self, plan: &CargoPlan, collected: &Collected, entry: &str) -> BundleInputs {
        BundleInputs {
            entry: entry.to_owned(),
            handler: BOOTSTRAP.to_owned(),
            runtime: RUNTIME.to_owned(),
            env: plan.env.clone(),
            generated: Vec::new(),
            config_files: ArtifactMap::new(),
            server: collected.server.clone(),
            dependencies: collected.dependencies.clone(),
            include_globs: plan.include_files.clone(),
            include_root: plan.project_dir.clone(),
            required: vec![BOOTSTRAP.to_owned()],
        }
    }

    fn routes(&self, _plan: &CargoPlan) -> RoutingManifest {
        self.preview_routes()
    }
}

fn binary_file_name(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}
