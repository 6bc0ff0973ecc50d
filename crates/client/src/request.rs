// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

//! Outbound request construction
//!
//! One pure builder per verb. Builders never touch the network; they turn
//! [`BuildOptions`] plus the active [`ConnectionTarget`] into an
//! [`OutboundRequest`] that a [`Transport`](crate::transport::Transport)
//! executes.

use crate::config::ConnectionTarget;
use crate::error::{Error, Result};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs shared by every builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Full request path, API prefix included
    pub path: String,
    /// Session cookie sent as the `Cookie` header
    pub cookie: Option<String>,
    pub content_length: Option<usize>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl BuildOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    /// Attach a body, deriving its byte length
    pub fn with_body(mut self, body: String, content_type: &str) -> Self {
        self.content_length = Some(body.len());
        self.content_type = Some(content_type.to_string());
        self.body = Some(body);
        self
    }
}

/// A request described as plain data, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub target: ConnectionTarget,
    /// Open a dedicated connection rather than reusing a pooled one
    pub fresh_connection: bool,
}

impl OutboundRequest {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn build_get(options: &BuildOptions, target: &ConnectionTarget) -> Result<OutboundRequest> {
    require_path(options)?;
    let headers = base_headers(options, target);
    Ok(OutboundRequest {
        method: HttpMethod::Get,
        path: options.path.clone(),
        headers,
        body: None,
        target: target.clone(),
        fresh_connection: true,
    })
}

pub fn build_post(options: &BuildOptions, target: &ConnectionTarget) -> Result<OutboundRequest> {
    build_with_body(HttpMethod::Post, options, target)
}

pub fn build_put(options: &BuildOptions, target: &ConnectionTarget) -> Result<OutboundRequest> {
    build_with_body(HttpMethod::Put, options, target)
}

/// DELETE keeps pooled connections, unlike the other verbs
pub fn build_delete(options: &BuildOptions, target: &ConnectionTarget) -> Result<OutboundRequest> {
    require_path(options)?;
    let headers = base_headers(options, target);
    Ok(OutboundRequest {
        method: HttpMethod::Delete,
        path: options.path.clone(),
        headers,
        body: None,
        target: target.clone(),
        fresh_connection: false,
    })
}

fn build_with_body(method: HttpMethod, options: &BuildOptions, target: &ConnectionTarget) -> Result<OutboundRequest> {
    require_path(options)?;
    let content_length = options
        .content_length
        .ok_or_else(|| Error::MissingArgument("contentLength".to_string()))?;
    let content_type = options
        .content_type
        .as_deref()
        .ok_or_else(|| Error::MissingArgument("contentType".to_string()))?;

    let mut headers = vec![
        ("Accept".to_string(), "*/*".to_string()),
        ("Content-Length".to_string(), content_length.to_string()),
        ("Content-Type".to_string(), content_type.to_string()),
    ];
    append_session_and_host(&mut headers, options, target);

    Ok(OutboundRequest {
        method,
        path: options.path.clone(),
        headers,
        body: options.body.clone(),
        target: target.clone(),
        fresh_connection: true,
    })
}

fn require_path(options: &BuildOptions) -> Result<()> {
    if options.path.is_empty() {
        return Err(Error::MissingArgument("path".to_string()));
    }
    Ok(())
}

fn base_headers(options: &BuildOptions, target: &ConnectionTarget) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), "*/*".to_string())];
    append_session_and_host(&mut headers, options, target);
    headers
}

fn append_session_and_host(headers: &mut Vec<(String, String)>, options: &BuildOptions, target: &ConnectionTarget) {
    if let Some(cookie) = &options.cookie {
        headers.push(("Cookie".to_string(), cookie.clone()));
    }
    if let Some(host) = target.host_header() {
        headers.push(("Host".to_string(), host));
    }
}
