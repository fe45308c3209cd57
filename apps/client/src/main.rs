//! filemirror client entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filemirror-client", version, about = "Mirrors a directory to a filemirror server")]
struct Cli {
    /// Server address (host:port).
    #[arg(long, global = true)]
    server: Option<String>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local mirror directory.
    #[arg(long, global = true)]
    downloads: Option<PathBuf>,

    /// Run the command without mirroring afterwards.
    #[arg(long, global = true)]
    no_watch: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Upload a local file.
    Upload {
        #[arg(long)]
        file: PathBuf,
        /// Remote name.
        #[arg(long)]
        name: String,
    },
    /// Download a remote file into a directory.
    Download {
        /// Remote name.
        #[arg(long)]
        file: String,
        #[arg(long)]
        path: PathBuf,
    },
    /// Delete a remote file and its mirror copy.
    Delete {
        #[arg(long)]
        file: String,
    },
    /// Rename a remote file and its mirror copy.
    Rename {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// List remote files.
    List,
    /// Only mirror the downloads directory.
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::load(cli.config.as_deref())?.with_overrides(
        cli.server,
        cli.downloads,
        cli.no_watch,
    );
    tracing::info!(
        server = %config.server,
        downloads = %config.downloads_dir.display(),
        watch = config.watch,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, cli.command))
}
