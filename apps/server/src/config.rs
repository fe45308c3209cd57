//! Server configuration.
//!
//! Stored as TOML. Without `--config`, `filemirror-server.toml` in the
//! working directory is read when present; otherwise defaults apply.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use filemirror_file_store::DEFAULT_UPLOADS_DIR;
use filemirror_protocol::DEFAULT_PORT;

/// Config file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "filemirror-server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address the call listener binds.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Root directory for stored files.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

fn default_listen() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOADS_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default file if it exists, or defaults.
    ///
    /// An explicit `path` that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, listen: Option<String>, uploads_dir: Option<PathBuf>) -> Self {
        if let Some(listen) = listen {
            self.listen = listen;
        }
        if let Some(dir) = uploads_dir {
            self.uploads_dir = dir;
        }
        self
    }
}
