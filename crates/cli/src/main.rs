// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// LRS CLI
// Command-line interface for the LRS management API

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Password;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

use lrs_rest_client::{
    ClientEvent, LoginOptions, LogoutOptions, RequestHandle, RequestOptions, RestClient,
};

#[derive(Parser)]
#[command(name = "lrs")]
#[command(about = "LRS management API client", long_about = None)]
#[command(version)]
struct Cli {
    /// Server host (omit host and port to use the local socket)
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Server port
    #[arg(short = 'P', long, global = true)]
    port: Option<u16>,

    /// Login username
    #[arg(short = 'u', long, global = true)]
    username: Option<String>,

    /// Login password (prompted when a username is given without one)
    #[arg(short = 'p', long, global = true)]
    password: Option<String>,

    /// Configuration file (default: ~/.config/lrs-rest-client/cli.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and out again to check credentials
    Login,

    /// GET a JSON resource
    Get {
        /// Path below the API prefix, e.g. /statements
        path: String,
    },

    /// DELETE a JSON resource
    Delete {
        /// Path below the API prefix
        path: String,
    },

    /// PUT a JSON document
    Put {
        /// Path below the API prefix
        path: String,
        /// JSON body; text that is not valid JSON is sent verbatim
        body: String,
    },

    /// POST a JSON document
    Post {
        /// Path below the API prefix
        path: String,
        /// JSON body; text that is not valid JSON is sent verbatim
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lrs_cli=info,lrs_rest_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cli_config = config::CliConfig::load(cli.config.as_deref())?;

    let login = login_options(
        cli.host.or(cli_config.host),
        cli.port.or(cli_config.port),
        cli.username.or(cli_config.username),
        cli.password,
    )?;

    let client = RestClient::with_config(cli_config.client);
    let mut events = client.subscribe();

    client.log_in(login).await;
    wait_for_login(&mut events).await?;
    println!("{}", "✓ Logged in".green().bold());

    let outcome = match cli.command {
        Commands::Login => Ok(()),
        Commands::Get { path } => run_request(|options| client.get_json(options), RequestOptions::new(path)).await,
        Commands::Delete { path } => {
            run_request(|options| client.delete_json(options), RequestOptions::new(path)).await
        }
        Commands::Put { path, body } => {
            run_request(|options| client.put_json(options), RequestOptions::new(path).body(parse_body(body))).await
        }
        Commands::Post { path, body } => {
            run_request(|options| client.post_json(options), RequestOptions::new(path).body(parse_body(body))).await
        }
    };

    client.log_out(LogoutOptions::default()).await;
    wait_for_logout(&mut events).await;

    outcome
}

/// Build login options, prompting for a missing password
fn login_options(
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
) -> Result<LoginOptions> {
    let password = match (&username, password) {
        (Some(username), None) => Some(
            Password::new()
                .with_prompt(format!("Password for {}", username))
                .interact()
                .context("Failed to read password input")?,
        ),
        (_, password) => password,
    };

    Ok(LoginOptions {
        username,
        password,
        host,
        port,
        path: None,
    })
}

/// Parse a command-line body as JSON, falling back to the raw text
fn parse_body(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

/// Send one request, print its response and surface its transport error
async fn run_request<F>(send: F, options: RequestOptions) -> Result<()>
where
    F: FnOnce(RequestOptions) -> lrs_rest_client::Result<RequestHandle>,
{
    let (err_tx, err_rx) = oneshot::channel();
    let options = options.on_error(move |e| {
        let _ = err_tx.send(e);
    });

    let handle = send(options)?;
    if handle.wait().await.is_some() {
        return Ok(());
    }

    match err_rx.await {
        Ok(e) => Err(anyhow::anyhow!("Request failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!("Request was aborted")),
    }
}

async fn wait_for_login(events: &mut broadcast::Receiver<ClientEvent>) -> Result<()> {
    loop {
        match events.recv().await.context("Event stream closed before login completed")? {
            ClientEvent::Login => return Ok(()),
            ClientEvent::LoginFailure { response, .. } => {
                anyhow::bail!("Login rejected by server (status {})", response.status)
            }
            ClientEvent::LoginRequestFailure(e) => {
                anyhow::bail!("Login request failed: {}. Is the server running?", e)
            }
            ClientEvent::Error(e) => anyhow::bail!("{}", e),
            other => debug!("Ignoring {} event during login", other.name()),
        }
    }
}

async fn wait_for_logout(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.recv().await {
        match event {
            ClientEvent::Logout => {
                println!("{}", "✓ Logged out".dimmed());
                return;
            }
            ClientEvent::LogoutRequestFailure(e) => {
                eprintln!("{}", format!("Logout request failed: {}", e).yellow());
                return;
            }
            other => debug!("Ignoring {} event during logout", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(r#"{"a":1}"#.to_string()), serde_json::json!({"a": 1}));
        assert_eq!(parse_body("not json".to_string()), Value::String("not json".to_string()));
    }

    #[test]
    fn test_login_options_without_credentials() {
        let options = login_options(Some("127.0.0.1".to_string()), Some(8080), None, None).unwrap();
        assert_eq!(options.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(options.port, Some(8080));
        assert!(options.username.is_none());
        assert!(options.password.is_none());
    }

    #[test]
    fn test_login_options_keeps_given_password() {
        let options =
            login_options(None, None, Some("admin".to_string()), Some("secret".to_string())).unwrap();
        assert_eq!(options.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_cli_parses_put() {
        let cli = Cli::parse_from(["lrs", "-H", "127.0.0.1", "-P", "8080", "put", "/foo", "{\"a\":1}"]);
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(8080));
        match cli.command {
            Commands::Put { path, body } => {
                assert_eq!(path, "/foo");
                assert_eq!(body, "{\"a\":1}");
            }
            _ => panic!("expected put"),
        }
    }
}
