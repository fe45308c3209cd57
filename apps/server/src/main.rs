//! filemirror server entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filemirror-server", version, about = "Stores mirrored files")]
struct Cli {
    /// Address to listen on (host:port).
    #[arg(long)]
    listen: Option<String>,

    /// Directory holding stored files.
    #[arg(long)]
    uploads: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting filemirror server"
    );

    let config = config::Config::load(cli.config.as_deref())?.with_overrides(cli.listen, cli.uploads);
    tracing::info!(
        listen = %config.listen,
        uploads = %config.uploads_dir.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
