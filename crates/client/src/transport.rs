// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// Execution of outbound requests over TCP or a Unix socket

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::config::ConnectionTarget;
use crate::error::{Error, Result};
use crate::request::{HttpMethod, OutboundRequest};
use crate::response::ApiResponse;

/// Executes a request and reads the full response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport
///
/// Keeps one client per target and pooling mode. Requests flagged
/// `fresh_connection` go through a client that keeps no idle connections.
#[derive(Debug, Default)]
pub struct HttpTransport {
    clients: Mutex<HashMap<(ConnectionTarget, bool), Client>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, target: &ConnectionTarget, fresh_connection: bool) -> Result<Client> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&(target.clone(), fresh_connection)) {
            return Ok(client.clone());
        }

        let client = create_client(target, fresh_connection)?;
        clients.insert((target.clone(), fresh_connection), client.clone());
        Ok(client)
    }
}

/// Create a reqwest client for a connection target
fn create_client(target: &ConnectionTarget, fresh_connection: bool) -> Result<Client> {
    let mut client_builder = Client::builder();

    if fresh_connection {
        client_builder = client_builder.pool_max_idle_per_host(0);
    }

    if let ConnectionTarget::Unix { socket_path } = target {
        client_builder = client_builder.unix_socket(socket_path.clone());
    }

    client_builder
        .build()
        .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse> {
        let client = self.client_for(&request.target, request.fresh_connection)?;
        let url = format!("{}{}", request.target.base_url(), request.path);
        debug!("{} {} via {}", request.method, request.path, request.target);

        let mut builder = client.request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.text().await?;

        debug!("{} {} -> {}", request.method, request.path, status);
        Ok(ApiResponse { status, headers, body })
    }
}
