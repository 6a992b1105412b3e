use std::path::{Path, PathBuf};

use funcpack_build::{
    BuildOutput, BuildRequest, CargoPackager, JsPackager, Pipeline, Provisioner, eject as eject_mod,
};
use funcpack_core::{FileManifest, FuncpackConfig, Output, Variant};

/// Build the project and write its output directory.
pub async fn build(
    dir: PathBuf,
    manifest: Option<PathBuf>,
    entrypoint: Option<String>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let out = out.unwrap_or_else(|| default_out_dir(&dir));

    let output = tokio::task::spawn_blocking(move || {
        let config = FuncpackConfig::load(&dir)?;
        run_pipeline(&dir, &config, manifest.as_deref(), entrypoint)
    })
    .await??;

    print_summary(&output);
    output.write_to(&out)?;
    output.close()?;

    println!();
    println!("Output written to {}", out.display());
    Ok(())
}

pub(crate) fn default_out_dir(dir: &Path) -> PathBuf {
    dir.join(eject_mod::EJECT_DIR).join("output")
}

/// Run the pipeline variant selected in `config` over the project sources.
pub(crate) fn run_pipeline(
    dir: &Path,
    config: &FuncpackConfig,
    manifest: Option<&Path>,
    entrypoint: Option<String>,
) -> anyhow::Result<BuildOutput> {
    let manifest = match manifest {
        Some(path) => FileManifest::load_json(path)?,
        None => FileManifest::from_dir(dir)?,
    };
    let entrypoint = entrypoint.unwrap_or_else(|| config.project.entrypoint().to_owned());
    tracing::info!(
        variant = ?config.project.variant,
        entrypoint = %entrypoint,
        files = manifest.len(),
        "building project"
    );

    let pipeline = Pipeline::new(Provisioner::new(
        config.build.work_dir.clone(),
        config.build.resolved_cache_dir(),
    ));
    let request = BuildRequest {
        manifest,
        entrypoint,
        settings: config.build.clone(),
    };

    let output = match config.project.variant {
        Variant::Js => {
            let mut packager = JsPackager::new(config.framework.clone());
            if eject_mod::is_ejected(dir) {
                println!("Using ejected launcher from .funcpack/launcher.js");
                packager = packager.with_launcher_template(eject_mod::load_ejected_launcher(dir)?);
            }
            pipeline.run(&packager, request)?
        }
        Variant::Cargo => pipeline.run(&CargoPackager::new(), request)?,
    };
    Ok(output)
}

fn print_summary(output: &BuildOutput) {
    let statics = output
        .outputs
        .values()
        .filter(|o| matches!(o, Output::Static(_)))
        .count();
    println!("Static files: {statics}");
    for function in output.functions() {
        println!(
            "Function {}: {} on {} ({} files, sha256 {})",
            function.bundle.name,
            function.bundle.handler,
            function.bundle.runtime,
            function.bundle.files.len(),
            function.digest
        );
    }
    println!("Routes: {}", output.routes.rules.len());
}
