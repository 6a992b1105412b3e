mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "funcpack",
    about = "Package framework apps into serverless functions, static files and routes"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project and write the deployable output directory
    Build {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// JSON file manifest to build instead of the project directory
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Manifest path marking the project root (overrides funcpack.toml)
        #[arg(long)]
        entrypoint: Option<String>,
        /// Output directory (default: <dir>/.funcpack/output)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build, then hand the output to the platform and wait until it is live
    Deploy {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Bearer token (overrides every other token source)
        #[arg(long)]
        token: Option<String>,
    },
    /// Eject the function launcher for manual customization
    Eject {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Print the routing manifest the project would produce
    Routes {
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            dir,
            manifest,
            entrypoint,
            out,
        } => commands::build(dir, manifest, entrypoint, out).await?,
        Commands::Deploy { dir, token } => commands::deploy(dir, token).await?,
        Commands::Eject { dir } => commands::eject(&dir)?,
        Commands::Routes { dir } => commands::routes(&dir)?,
    }

    Ok(())
}
