use std::path::PathBuf;

use funcpack_cloud::{CommandExecutor, ConfiguredTokenSource, DeployClient};
use funcpack_core::FuncpackConfig;

use super::build::{default_out_dir, run_pipeline};

/// Build, write the output directory and deploy it.
pub async fn deploy(dir: PathBuf, token: Option<String>) -> anyhow::Result<()> {
    let config = FuncpackConfig::load(&dir)?;
    let out = default_out_dir(&dir);

    println!("Building...");
    let build_dir = dir.clone();
    let build_config = config.clone();
    let output =
        tokio::task::spawn_blocking(move || run_pipeline(&build_dir, &build_config, None, None))
            .await??;
    output.write_to(&out)?;
    output.close()?;

    println!("Deploying {}...", out.display());
    let client = DeployClient::new(
        CommandExecutor::new(config.deploy.command.clone()),
        ConfiguredTokenSource::from_config(&config.deploy).with_explicit(token),
        config.deploy.token_reuse_limit,
    );
    let deployment = client.deploy(&out).await?;

    println!();
    println!("Deployed: {} ({})", deployment.url, deployment.id);
    Ok(())
}
