// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// Error types for the LRS REST client

use thiserror::Error;

/// Errors produced by the client.
///
/// Variants carry owned strings rather than source errors so the enum can be
/// cloned onto broadcast events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Missing arguments: expected {0}")]
    MissingArguments(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML error: {0}")]
    Toml(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Error::Connect(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl Error {
    /// True for failures raised by the underlying HTTP exchange
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Connect(_) | Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
