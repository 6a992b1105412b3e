//! The build-to-package pipeline skeleton shared by every project variant.
//!
//! ```text
//! Provision → Materialize → Resolve(dev) → Build → Resolve(prod)
//!           → Collect → Assemble → Emit
//! ```
//!
//! Phases run strictly in order. Collection areas and function bundles are
//! processed concurrently inside their phase. Any failure aborts the run
//! with a [`PipelineError`] naming the phase; the work directories are
//! removed on every exit path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use funcpack_core::{ArtifactMap, BuildSettings, FileManifest, Output, RoutingManifest};

use crate::archive::{ArchiveWriter, ZipArchiveWriter, package};
use crate::assemble::{BundleInputs, assemble};
use crate::collect::{Area, AreaKind};
use crate::deps::DependencyMode;
use crate::error::{PackagingError, Phase, PhaseError, PipelineError, SourceError};
use crate::materialize::{is_single_segment, materialize, normalize_relative};
use crate::workspace::{Provisioner, WorkPaths};

/// States a pipeline run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Provisioned,
    Materialized,
    DevResolved,
    Built,
    ProdResolved,
    Collected,
    Assembled,
    Emitted,
    Failed { phase: Phase },
}

/// Variant-specific behaviour plugged into the [`Pipeline`].
pub trait Packager: Sync {
    /// Project facts read once the source tree exists.
    type Plan: Sync;

    /// Short variant name for logs.
    fn variant(&self) -> &'static str;

    /// File whose directory is the project root, e.g. `package.json`.
    fn root_marker(&self) -> &str;

    /// Read project and framework configuration from `project_dir`.
    fn plan(
        &self,
        project_dir: &Path,
        paths: &WorkPaths,
        settings: &BuildSettings,
    ) -> Result<Self::Plan, PhaseError>;

    /// Install the `mode` dependency set and make it active.
    fn resolve(
        &self,
        plan: &Self::Plan,
        mode: DependencyMode,
        paths: &WorkPaths,
    ) -> Result<(), PhaseError>;

    /// Run the framework build tool.
    fn build(&self, plan: &Self::Plan, paths: &WorkPaths) -> Result<(), PhaseError>;

    /// Source areas to collect after the production resolve.
    fn areas(&self, plan: &Self::Plan, paths: &WorkPaths) -> Vec<Area>;

    fn entry_points(&self, plan: &Self::Plan) -> Vec<String>;

    /// Everything needed to assemble the bundle for `entry`.
    fn bundle_inputs(&self, plan: &Self::Plan, collected: &Collected, entry: &str) -> BundleInputs;

    fn routes(&self, plan: &Self::Plan) -> RoutingManifest;
}

/// Collected artifacts grouped by where they end up.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Static and client assets, published as static outputs.
    pub statics: ArtifactMap,
    /// Server build output, bundled into functions.
    pub server: ArtifactMap,
    /// Production dependencies, bundled into functions.
    pub dependencies: ArtifactMap,
}

/// Input of one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub manifest: FileManifest,
    /// Manifest path marking the project root (its directory).
    pub entrypoint: String,
    pub settings: BuildSettings,
}

/// Result of a successful run.
///
/// Owns the run's work directories, which back the file references in
/// `outputs`; dropping the output removes them.
#[derive(Debug)]
pub struct BuildOutput {
    pub outputs: BTreeMap<String, Output>,
    pub routes: RoutingManifest,
    pub history: Vec<PipelineState>,
    workspace: WorkPaths,
}

impl BuildOutput {
    pub fn workspace(&self) -> &WorkPaths {
        &self.workspace
    }

    pub fn functions(&self) -> impl Iterator<Item = &funcpack_core::PackagedFunction> {
        self.outputs.values().filter_map(Output::as_function)
    }

    /// Write the deployable layout to `dir`:
    ///
    /// ```text
    /// dir/static/<path>
    /// dir/functions/<name>.zip
    /// dir/functions/<name>.json
    /// dir/routes.json
    /// ```
    ///
    /// Output from an earlier build in `dir` is removed first. Every output
    /// key is checked before anything is written: static paths must be
    /// normalized relative paths and function names single path segments.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        for (name, output) in &self.outputs {
            let contained = match output {
                Output::Static(_) => normalize_relative(name).is_ok_and(|n| n == *name),
                Output::Function(_) => is_single_segment(name),
            };
            if !contained {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("output name {name:?} would be written outside {}", dir.display()),
                ));
            }
        }

        clear_previous_output(dir)?;
        let functions = dir.join("functions");
        std::fs::create_dir_all(&functions)?;
        std::fs::create_dir_all(dir.join("static"))?;

        for (name, output) in &self.outputs {
            match output {
                Output::Static(content) => content.write_to(&dir.join("static").join(name))?,
                Output::Function(function) => {
                    std::fs::write(functions.join(format!("{name}.zip")), &function.archive)?;
                    let meta = serde_json::to_string_pretty(&function.meta())
                        .map_err(std::io::Error::other)?;
                    std::fs::write(functions.join(format!("{name}.json")), meta)?;
                }
            }
        }

        let routes = self.routes.to_json().map_err(std::io::Error::other)?;
        std::fs::write(dir.join("routes.json"), routes)?;

        tracing::info!(dir = %dir.display(), outputs = self.outputs.len(), "wrote build output");
        Ok(())
    }

    /// Remove the work directories now, reporting failures.
    pub fn close(self) -> std::io::Result<()> {
        self.workspace.close()
    }
}

/// Remove the parts of `dir` that [`BuildOutput::write_to`] owns.
fn clear_previous_output(dir: &Path) -> std::io::Result<()> {
    for sub in ["static", "functions"] {
        let path = dir.join(sub);
        if path.try_exists()? {
            std::fs::remove_dir_all(&path)?;
            tracing::debug!(path = %path.display(), "removed previous build output");
        }
    }
    let routes = dir.join("routes.json");
    if routes.try_exists()? {
        std::fs::remove_file(&routes)?;
    }
    Ok(())
}

/// Runs packagers through the phase sequence.
pub struct Pipeline {
    provisioner: Provisioner,
    archiver: Box<dyn ArchiveWriter>,
}

impl Pipeline {
    pub fn new(provisioner: Provisioner) -> Self {
        Self {
            provisioner,
            archiver: Box::new(ZipArchiveWriter),
        }
    }

    pub fn with_archiver(mut self, archiver: impl ArchiveWriter + 'static) -> Self {
        self.archiver = Box::new(archiver);
        self
    }

    pub fn run<P: Packager>(
        &self,
        packager: &P,
        request: BuildRequest,
    ) -> Result<BuildOutput, PipelineError> {
        let mut history = Vec::new();
        let result = self.run_phases(packager, request, &mut history);
        if let Err(e) = &result {
            history.push(PipelineState::Failed { phase: e.phase });
            tracing::error!(
                variant = packager.variant(),
                phase = %e.phase,
                error = %e.source,
                history = ?history,
                "pipeline failed"
            );
        }
        result
    }

    fn run_phases<P: Packager>(
        &self,
        packager: &P,
        request: BuildRequest,
        history: &mut Vec<PipelineState>,
    ) -> Result<BuildOutput, PipelineError> {
        let mut advance = |state: PipelineState| {
            tracing::info!(variant = packager.variant(), state = ?state, "pipeline advanced");
            history.push(state);
        };

        let paths = self
            .provisioner
            .allocate()
            .map_err(|e| PipelineError::new(Phase::Provision, PhaseError::Workspace { source: e }))?;
        advance(PipelineState::Provisioned);

        let project_dir = materialize_source(&request, &paths, packager.root_marker())
            .map_err(|e| PipelineError::new(Phase::Materialize, e))?;
        let plan = packager
            .plan(&project_dir, &paths, &request.settings)
            .map_err(|e| PipelineError::new(Phase::Materialize, e))?;
        advance(PipelineState::Materialized);

        packager
            .resolve(&plan, DependencyMode::Dev, &paths)
            .map_err(|e| PipelineError::new(Phase::ResolveDev, e))?;
        advance(PipelineState::DevResolved);

        packager
            .build(&plan, &paths)
            .map_err(|e| PipelineError::new(Phase::Build, e))?;
        advance(PipelineState::Built);

        packager
            .resolve(&plan, DependencyMode::Prod, &paths)
            .map_err(|e| PipelineError::new(Phase::ResolveProd, e))?;
        advance(PipelineState::ProdResolved);

        let collected = collect_areas(&packager.areas(&plan, &paths))
            .map_err(|e| PipelineError::new(Phase::Collect, e))?;
        advance(PipelineState::Collected);

        let functions = self
            .assemble_all(packager, &plan, &collected)
            .map_err(|e| PipelineError::new(Phase::Assemble, e))?;
        advance(PipelineState::Assembled);

        let routes = packager.routes(&plan);
        let outputs =
            emit_outputs(collected.statics, functions).map_err(|e| PipelineError::new(Phase::Emit, e))?;
        advance(PipelineState::Emitted);

        Ok(BuildOutput {
            outputs,
            routes,
            history: std::mem::take(history),
            workspace: paths,
        })
    }

    fn assemble_all<P: Packager>(
        &self,
        packager: &P,
        plan: &P::Plan,
        collected: &Collected,
    ) -> Result<Vec<funcpack_core::PackagedFunction>, PackagingError> {
        let entries = packager.entry_points(plan);
        let archiver = self.archiver.as_ref();

        std::thread::scope(|s| {
            let handles: Vec<_> = entries
                .iter()
                .map(|entry| {
                    s.spawn(move || {
                        let bundle = assemble(packager.bundle_inputs(plan, collected, entry))?;
                        package(bundle, archiver)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
                .collect()
        })
    }
}

/// Check the entrypoint, write the source tree, return the project root.
fn materialize_source(
    request: &BuildRequest,
    paths: &WorkPaths,
    marker: &str,
) -> Result<PathBuf, SourceError> {
    let entrypoint = normalize_relative(&request.entrypoint)?;
    let listed = request
        .manifest
        .iter()
        .any(|(path, _)| normalize_relative(path).is_ok_and(|p| p == entrypoint));
    if !listed {
        return Err(SourceError::MissingEntrypoint(request.entrypoint.clone()));
    }

    materialize(&request.manifest, paths.src())?;

    let project_dir = project_root(paths.src(), &entrypoint, marker);
    tracing::info!(project = %project_dir.display(), files = request.manifest.len(), "source materialized");
    Ok(project_dir)
}

/// Nearest directory at or above the entrypoint's that holds `marker`.
///
/// Falls back to the entrypoint's directory; never leaves `src`.
pub fn project_root(src: &Path, entrypoint: &str, marker: &str) -> PathBuf {
    let start = match Path::new(entrypoint).parent() {
        Some(parent) => src.join(parent),
        None => src.to_path_buf(),
    };
    start
        .ancestors()
        .take_while(|dir| dir.starts_with(src))
        .find(|dir| dir.join(marker).is_file())
        .unwrap_or(&start)
        .to_path_buf()
}

/// Collect every area concurrently and check the areas are disjoint.
pub fn collect_areas(areas: &[Area]) -> Result<Collected, PackagingError> {
    let results: Vec<(AreaKind, Result<ArtifactMap, PackagingError>)> = std::thread::scope(|s| {
        let handles: Vec<_> = areas
            .iter()
            .map(|area| (area.kind(), s.spawn(move || area.collect())))
            .collect();
        handles
            .into_iter()
            .map(|(kind, h)| (kind, h.join().unwrap_or_else(|p| std::panic::resume_unwind(p))))
            .collect()
    });

    let mut union = ArtifactMap::new();
    let mut collected = Collected::default();
    for (kind, result) in results {
        let map = result?;
        union.merge(map.clone())?;
        let target = match kind {
            AreaKind::Static | AreaKind::Client => &mut collected.statics,
            AreaKind::Server => &mut collected.server,
            AreaKind::Dependencies => &mut collected.dependencies,
        };
        target.merge(map)?;
    }

    tracing::info!(
        statics = collected.statics.len(),
        server = collected.server.len(),
        dependencies = collected.dependencies.len(),
        "collected artifacts"
    );
    Ok(collected)
}

fn emit_outputs(
    statics: ArtifactMap,
    functions: Vec<funcpack_core::PackagedFunction>,
) -> Result<BTreeMap<String, Output>, PackagingError> {
    let mut outputs = BTreeMap::new();
    for (path, content) in statics {
        outputs.insert(path, Output::Static(content));
    }
    for function in functions {
        let name = function.bundle.name.clone();
        if outputs.contains_key(&name) {
            return Err(funcpack_core::Collision(name).into());
        }
        outputs.insert(name, Output::Function(Box::new(function)));
    }
    Ok(outputs)
}
