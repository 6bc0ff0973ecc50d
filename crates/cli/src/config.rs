// LRS CLI - Config Module
// Handles CLI configuration for connecting to the management API
// Note: client settings live in lrs_rest_client::ClientConfig

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use lrs_rest_client::ClientConfig;

/// CLI configuration (wrapper around ClientConfig with connection defaults)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub client: ClientConfig,

    /// Server host; without host and port the local socket is used
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Login username (the password is never stored)
    #[serde(default)]
    pub username: Option<String>,
}

impl CliConfig {
    /// Load CLI configuration from the given file, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read CLI configuration {}", config_path.display()))?;

        let config: Self = toml::from_str(&contents).context("Failed to parse CLI configuration")?;

        Ok(config)
    }

    /// Get the path to the CLI configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("lrs-rest-client").join("cli.toml"))
    }
}
