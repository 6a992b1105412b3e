//! Build-to-package pipeline for funcpack.
//!
//! # Pipeline
//!
//! ```text
//! funcpack build
//!   1. Provision    ── fresh work dir (src/, out/) + shared package cache
//!   2. Materialize  ── FileManifest → src/, read framework config
//!   3. Resolve dev  ── install into node_modules_dev, link node_modules
//!   4. Build        ── framework build tool, runtime pinned, .bin on PATH
//!   5. Resolve prod ── trim manifest, install into node_modules_prod, relink
//!   6. Collect      ── static / client / server / dependency areas (parallel)
//!   7. Assemble     ── launcher + bridge + config + artifacts per entry (parallel)
//!   8. Emit         ── static outputs, zipped functions, routing manifest
//! ```
//!
//! # Variants
//!
//! - [`JsPackager`]: JS framework projects (default profile targets Nuxt 2).
//!   The config module is read declaratively, never executed.
//! - [`CargoPackager`]: Cargo binaries shipped as `bootstrap` on a custom
//!   runtime.
//!
//! # Dependency sets
//!
//! Two sibling directories, `node_modules_dev` and `node_modules_prod`, are
//! installed next to the package manifest. `node_modules` is a link that is
//! removed and recreated on every swap, so exactly one set is reachable.

pub mod archive;
pub mod assemble;
pub mod cargo;
pub mod collect;
pub mod deps;
pub mod eject;
pub mod error;
pub mod invoke;
pub mod js;
pub mod jsconfig;
pub mod launcher;
pub mod materialize;
pub mod pipeline;
pub mod routes;
pub mod runner;
pub mod runtime;
pub mod workspace;

pub use archive::{ArchiveWriter, ZipArchiveWriter};
pub use cargo::CargoPackager;
pub use error::{
    BuildToolError, DependencyError, PackagingError, Phase, PhaseError, PipelineError,
    SourceError, VersionError,
};
pub use js::JsPackager;
pub use pipeline::{BuildOutput, BuildRequest, Packager, Pipeline, PipelineState};
pub use runner::{CommandRunner, CommandSpec, RunError, SystemRunner};
pub use workspace::{Provisioner, WorkPaths};
