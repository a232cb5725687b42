//! Server configuration.
//!
//! Settings come from an optional YAML file; CLI flags override file values
//! in `main`. Every field has a default so a bare `batchboard serve` works.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8765;

/// Name of the config file looked up in the working directory when no
/// explicit path is given.
const DEFAULT_CONFIG_FILE: &str = "batchboard.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Database file path; defaults to the platform data directory.
    pub database: Option<PathBuf>,
    /// Allowed CORS origins. Empty means allow any origin (development).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database: None,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration. An explicitly given path must exist and parse;
    /// the default file is used only if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Effective database path: configured value or the platform default.
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(default_database_path)
    }
}

/// Default database location under the platform data directory, falling
/// back to the working directory when none exists.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("batchboard").join("batchboard.db"))
        .unwrap_or_else(|| PathBuf::from("batchboard.db"))
}
