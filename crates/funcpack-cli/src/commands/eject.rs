use std::path::Path;

use funcpack_core::{FuncpackConfig, Variant};

pub fn eject(dir: &Path) -> anyhow::Result<()> {
    let config = FuncpackConfig::load(dir)?;
    if config.project.variant != Variant::Js {
        anyhow::bail!("only the js variant has a launcher to eject");
    }

    let path = funcpack_build::eject::eject(dir)?;

    println!("Ejected launcher to {}", path.display());
    println!("You can now edit it directly. funcpack build will use this file.");
    Ok(())
}
