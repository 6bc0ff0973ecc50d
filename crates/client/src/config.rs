// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// Configuration structures for the LRS REST client

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::format_host_port;

/// Prefix prepended to every JSON API path
pub const DEFAULT_API_PREFIX: &str = "/lrs/api/v1.0";

/// Socket the management server listens on when no host/port is given
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/rest_server/http.sock";

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/logout";

/// Where requests are sent: a TCP host/port or a local Unix socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConnectionTarget {
    Tcp { host: String, port: u16 },
    Unix { socket_path: PathBuf },
}

impl ConnectionTarget {
    /// Value for the outbound `Host` header, only meaningful for TCP targets
    pub fn host_header(&self) -> Option<String> {
        match self {
            ConnectionTarget::Tcp { host, port } => Some(format_host_port(host, *port)),
            ConnectionTarget::Unix { .. } => None,
        }
    }

    /// Base URL understood by reqwest for this target
    ///
    /// Unix socket requests still need an authority, so a placeholder host is used.
    pub fn base_url(&self) -> String {
        match self {
            ConnectionTarget::Tcp { host, port } => format!("http://{}", format_host_port(host, *port)),
            ConnectionTarget::Unix { .. } => "http://localhost".to_string(),
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionTarget::Tcp { host, port } => write!(f, "{}", format_host_port(host, *port)),
            ConnectionTarget::Unix { socket_path } => write!(f, "unix:{}", socket_path.display()),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Prefix for JSON API paths
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Local socket used when logging in without host/port
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Default form login path
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Default logout path
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            socket_path: default_socket_path(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Get the path to the default configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("lrs-rest-client").join("client.toml"))
    }

    /// The target used when no host or port is supplied
    pub fn local_target(&self) -> ConnectionTarget {
        ConnectionTarget::Unix {
            socket_path: self.socket_path.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api_prefix", &self.api_prefix),
            ("login_path", &self.login_path),
            ("logout_path", &self.logout_path),
        ] {
            if !value.is_empty() && !value.starts_with('/') {
                return Err(Error::Config(format!("{} must start with '/': {}", name, value)));
            }
        }
        Ok(())
    }
}
