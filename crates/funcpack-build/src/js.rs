//! JavaScript-framework packager (Nuxt-style server-rendered apps).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use funcpack_core::{
    ArtifactMap, BuildConfig, BuildSettings, ContentRef, FrameworkProfile, PackageManifest,
    RoutingManifest,
};

use crate::assemble::BundleInputs;
use crate::collect::{Area, AreaKind};
use crate::deps::{DEPENDENCY_LINK, DependencyMode, DependencyResolver, check_framework_version};
use crate::error::{BuildToolError, PhaseError, SourceError};
use crate::invoke::{BuildInvoker, search_path_with};
use crate::jsconfig::load_build_config;
use crate::launcher::{self, HANDLER, LAUNCHER_FILE, LAUNCHER_TEMPLATE, LauncherParams};
use crate::materialize::{is_single_segment, normalize_relative};
use crate::pipeline::{Collected, Packager};
use crate::routes;
use crate::runner::{CommandRunner, SystemRunner};
use crate::runtime::{NodeRuntime, select_node};
use crate::workspace::WorkPaths;

/// Placeholder in the build command replaced by the config file path.
const CONFIG_ARG: &str = "{config}";

/// Packages a JS framework project into a launcher-fronted function.
pub struct JsPackager<R: CommandRunner = SystemRunner> {
    runner: R,
    profile: FrameworkProfile,
    launcher_template: String,
}

impl JsPackager<SystemRunner> {
    pub fn new(profile: FrameworkProfile) -> Self {
        Self::with_runner(profile, SystemRunner::new())
    }
}

impl<R: CommandRunner> JsPackager<R> {
    pub fn with_runner(profile: FrameworkProfile, runner: R) -> Self {
        Self {
            runner,
            profile,
            launcher_template: LAUNCHER_TEMPLATE.to_owned(),
        }
    }

    /// Use an ejected launcher template instead of the built-in one.
    pub fn with_launcher_template(mut self, template: impl Into<String>) -> Self {
        self.launcher_template = template.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Routing manifest for `project_dir` without building it.
    ///
    /// Reads only the framework config; the result equals the manifest a
    /// full build of the same sources emits.
    pub fn preview_routes(&self, project_dir: &Path) -> Result<RoutingManifest, SourceError> {
        let (config_file, _) = self.find_config(project_dir)?;
        let config = checked_config(load_build_config(&config_file)?)?;
        Ok(routes::emit(&config.public_path, config.default_entry()))
    }

    fn find_config(&self, project_dir: &Path) -> Result<(PathBuf, String), SourceError> {
        self.profile
            .config_files
            .iter()
            .find(|name| project_dir.join(name).is_file())
            .map(|name| (project_dir.join(name), name.replace('\\', "/")))
            .ok_or_else(|| SourceError::MissingConfig {
                dir: project_dir.to_path_buf(),
                candidates: self.profile.config_files.clone(),
            })
    }

    fn detect_framework(&self, manifest: &PackageManifest) -> Result<(String, String), SourceError> {
        self.profile
            .framework_packages
            .iter()
            .find(|(name, _)| manifest.dependency(name).is_some())
            .map(|(name, suffix)| (name.clone(), suffix.clone()))
            .ok_or_else(|| SourceError::MissingFramework {
                candidates: self.profile.framework_packages.keys().cloned().collect(),
            })
    }
}

/// Confine config-supplied paths to the project and names to one segment.
///
/// `dir.static` and `buildDir` are normalized; the asset prefix taken from
/// `build.publicPath` must already be normal.
fn checked_config(mut config: BuildConfig) -> Result<BuildConfig, SourceError> {
    let inside = |field: &'static str, value: &str| {
        normalize_relative(value).map_err(|_| SourceError::ConfigPath {
            field,
            value: value.to_owned(),
        })
    };
    config.static_dir = inside("dir.static", &config.static_dir)?;
    config.build_dir = inside("buildDir", &config.build_dir)?;

    let prefix = routes::asset_prefix(&config.public_path);
    if !prefix.is_empty() && inside("build.publicPath", &prefix)? != prefix {
        return Err(SourceError::ConfigPath {
            field: "build.publicPath",
            value: config.public_path,
        });
    }

    if let Some(bad) = config.entry_points.iter().find(|n| !is_single_segment(n)) {
        return Err(SourceError::EntryName(bad.clone()));
    }
    Ok(config)
}

/// Facts about one JS project, read after materialization.
#[derive(Debug, Clone)]
pub struct JsPlan {
    pub project_dir: PathBuf,
    pub config: BuildConfig,
    /// Config file path relative to the project root.
    pub config_path: String,
    /// Framework package found in the manifest, e.g. `nuxt`.
    pub framework: String,
    pub runtime: NodeRuntime,
    /// Environment for the package manager and build tool.
    pub tool_env: BTreeMap<String, String>,
    /// Function environment.
    pub env: BTreeMap<String, String>,
    pub include_files: Vec<String>,
    /// Config and package manifest, bundled into every function.
    pub config_files: ArtifactMap,
    pub launcher: LauncherParams,
    pub launcher_source: String,
}

impl<R: CommandRunner> Packager for JsPackager<R> {
    type Plan = JsPlan;

    fn variant(&self) -> &'static str {
        "js"
    }

    fn root_marker(&self) -> &str {
        &self.profile.package_manifest
    }

    fn plan(
        &self,
        project_dir: &Path,
        _paths: &WorkPaths,
        settings: &BuildSettings,
    ) -> Result<JsPlan, PhaseError> {
        let manifest_path = project_dir.join(&self.profile.package_manifest);
        let manifest = PackageManifest::load(&manifest_path).map_err(SourceError::from)?;

        let (config_file, config_path) = self.find_config(project_dir)?;
        let config = checked_config(load_build_config(&config_file)?)?;
        let (framework, suffix) = self.detect_framework(&manifest)?;
        let runtime = select_node(manifest.engines_node())?;

        let tool_env = BTreeMap::from([
            ("NODE_VERSION".to_owned(), runtime.version()),
            (
                "PATH".to_owned(),
                search_path_with(&[project_dir.join(DEPENDENCY_LINK).join(".bin")]),
            ),
        ]);

        let mut config_files = ArtifactMap::new();
        for (bundle_path, file) in [
            (config_path.clone(), config_file),
            (self.profile.package_manifest.clone(), manifest_path),
        ] {
            let content = ContentRef::from_path(&file).map_err(|e| SourceError::Read {
                path: file.clone(),
                source: e,
            })?;
            if config_files.insert(bundle_path, content).is_err() {
                tracing::debug!(path = %file.display(), "config file listed twice");
            }
        }

        let launcher = LauncherParams {
            framework_suffix: suffix,
            config_path: config_path.clone(),
        };
        let launcher_source = launcher.render(&self.launcher_template);

        tracing::info!(
            project = %project_dir.display(),
            config = %config_path,
            framework = %framework,
            runtime = %runtime.id(),
            entries = ?config.entry_points,
            "planned js build"
        );

        Ok(JsPlan {
            project_dir: project_dir.to_path_buf(),
            config,
            config_path,
            framework,
            runtime,
            tool_env,
            env: settings.env.clone(),
            include_files: settings.include_files.clone(),
            config_files,
            launcher,
            launcher_source,
        })
    }

    fn resolve(
        &self,
        plan: &JsPlan,
        mode: DependencyMode,
        paths: &WorkPaths,
    ) -> Result<(), PhaseError> {
        DependencyResolver::new(
            &self.runner,
            &self.profile.package_manifest,
            &self.profile.exclusion,
        )
        .with_env(plan.tool_env.clone())
        .resolve(&plan.project_dir, mode, paths.cache())?;

        if mode == DependencyMode::Dev {
            check_framework_version(
                &plan.project_dir,
                &plan.framework,
                self.profile.min_major,
                self.profile.max_major,
            )?;
        }
        Ok(())
    }

    fn build(&self, plan: &JsPlan, _paths: &WorkPaths) -> Result<(), PhaseError> {
        let mut command = self
            .profile
            .build_command
            .iter()
            .map(|arg| arg.replace(CONFIG_ARG, &plan.config_path));
        let Some(tool) = command.next() else {
            return Err(BuildToolError::NotFound {
                tool: String::new(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "framework build_command is empty",
                ),
            }
            .into());
        };
        let args: Vec<String> = command.collect();

        BuildInvoker::new(&self.runner).invoke(&tool, &args, &plan.project_dir, &plan.tool_env)?;
        Ok(())
    }

    fn areas(&self, plan: &JsPlan, _paths: &WorkPaths) -> Vec<Area> {
        let project = &plan.project_dir;
        let dist = project.join(&plan.config.build_dir).join("dist");
        let server_prefix = format!("{}/dist/server", plan.config.build_dir);

        vec![
            Area::tree(
                AreaKind::Static,
                "**",
                project.join(&plan.config.static_dir),
                &plan.config.static_dir,
            ),
            Area::tree(
                AreaKind::Client,
                "**",
                dist.join("client"),
                &routes::asset_prefix(&plan.config.public_path),
            )
            .required(),
            Area::tree(AreaKind::Server, "**", dist.join("server"), &server_prefix).required(),
            Area::tree(
                AreaKind::Dependencies,
                "**",
                project.join(DependencyMode::Prod.dir_name()),
                DEPENDENCY_LINK,
            ),
        ]
    }

    fn entry_points(&self, plan: &JsPlan) -> Vec<String> {
        plan.config.entry_points.clone()
    }

    fn bundle_inputs(&self, plan: &JsPlan, collected: &Collected, entry: &str) -> BundleInputs {
        let mut required = vec![LAUNCHER_FILE.to_owned()];
        required.extend(plan.launcher.references());

        BundleInputs {
            entry: entry.to_owned(),
            handler: HANDLER.to_owned(),
            runtime: plan.runtime.id(),
            env: plan.env.clone(),
            generated: vec![
                (
                    LAUNCHER_FILE.to_owned(),
                    ContentRef::inline(plan.launcher_source.as_bytes()),
                ),
                (launcher::BRIDGE_FILE.to_owned(), launcher::bridge()),
            ],
            config_files: plan.config_files.clone(),
            server: collected.server.clone(),
            dependencies: collected.dependencies.clone(),
            include_globs: plan.include_files.clone(),
            include_root: plan.project_dir.clone(),
            required,
        }
    }

    fn routes(&self, plan: &JsPlan) -> RoutingManifest {
        routes::emit(&plan.config.public_path, plan.config.default_entry())
    }
}
