// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// LRS REST Client - Library
// Session-aware JSON client for the local LRS management API

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod options;
pub mod proxy;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{LoginOptions, LogoutOptions, RequestHandle, RestClient};
pub use config::{
    ClientConfig, ConnectionTarget, DEFAULT_API_PREFIX, DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH,
    DEFAULT_SOCKET_PATH,
};
pub use error::{Error, Result};
pub use events::{ClientEvent, EventBus};
pub use network::{format_host_port, is_loopback_address};
pub use options::{
    parse_options, ErrorHandler, RequestOptions, ResponseCallback, PATH_AND_BODY_FIELDS, PATH_FIELDS,
};
pub use proxy::ErrorProxy;
pub use request::{
    build_delete, build_get, build_post, build_put, BuildOptions, HttpMethod, OutboundRequest,
};
pub use response::{log_response, ApiResponse};
pub use transport::{HttpTransport, Transport};

// Re-export commonly used external types
pub use serde_json::{json, Value};
