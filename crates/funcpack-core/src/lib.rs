//! Core types and configuration for funcpack.
//!
//! This crate defines the pipeline's data model ([`FileManifest`],
//! [`ArtifactMap`], [`FunctionBundle`], [`RoutingManifest`]), the
//! `funcpack.toml` schema ([`FuncpackConfig`]), project manifest readers
//! for the supported toolchains, and shared error types.

pub mod artifact;
pub mod bundle;
pub mod cargo;
pub mod config;
pub mod error;
pub mod framework;
pub mod manifest;
pub mod package;
pub mod routes;

pub use artifact::{ArtifactMap, Collision, ContentRef};
pub use bundle::{FunctionBundle, Output, PackagedFunction};
pub use cargo::{CargoBinary, CargoProject};
pub use config::{BuildSettings, DeployConfig, FuncpackConfig, ProjectConfig, Variant};
pub use error::{Error, Result};
pub use framework::{BuildConfig, ExclusionPolicy, FrameworkProfile};
pub use manifest::FileManifest;
pub use package::PackageManifest;
pub use routes::{Route, RoutingManifest};
