use std::path::Path;

use funcpack_build::pipeline::project_root;
use funcpack_build::{CargoPackager, JsPackager};
use funcpack_core::{FuncpackConfig, Variant};

/// Print the routing manifest without building.
pub fn routes(dir: &Path) -> anyhow::Result<()> {
    let config = FuncpackConfig::load(dir)?;
    let manifest = match config.project.variant {
        Variant::Js => {
            let root = project_root(
                dir,
                config.project.entrypoint(),
                &config.framework.package_manifest,
            );
            JsPackager::new(config.framework).preview_routes(&root)?
        }
        Variant::Cargo => CargoPackager::new().preview_routes(),
    };
    println!("{}", manifest.to_json()?);
    Ok(())
}
