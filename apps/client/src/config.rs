//! Client configuration.
//!
//! Stored as TOML. Without `--config`, `filemirror-client.toml` in the
//! working directory is read when present; otherwise defaults apply.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use filemirror_protocol::DEFAULT_PORT;
use filemirror_sync::DEFAULT_DOWNLOADS_DIR;

pub const DEFAULT_CONFIG_FILE: &str = "filemirror-client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Server address (host:port).
    #[serde(default = "default_server")]
    pub server: String,

    /// Local mirror directory; also the watched directory.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Mirror local changes while the client runs.
    #[serde(default = "default_true")]
    pub watch: bool,
}

fn default_server() -> String {
    format!("127.0.0.1:{DEFAULT_PORT}")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOWNLOADS_DIR)
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            downloads_dir: default_downloads_dir(),
            watch: default_true(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default file if it exists, or defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Applies command-line overrides.
    pub fn with_overrides(
        mut self,
        server: Option<String>,
        downloads_dir: Option<PathBuf>,
        no_watch: bool,
    ) -> Self {
        if let Some(server) = server {
            self.server = server;
        }
        if let Some(dir) = downloads_dir {
            self.downloads_dir = dir;
        }
        if no_watch {
            self.watch = false;
        }
        self
    }
}
