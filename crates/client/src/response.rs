// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// Responses from the management API

use serde::de::DeserializeOwned;

use crate::error::Result;

/// A fully-read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a possibly repeated header
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Session cookie from the first `Set-Cookie` header
    ///
    /// Only the `name=value` pair is kept; attributes such as `Path` are dropped.
    pub fn session_cookie(&self) -> Option<String> {
        let raw = self.header("set-cookie")?;
        let pair = raw.split(';').next().unwrap_or_default().trim();
        if pair.is_empty() {
            None
        } else {
            Some(pair.to_string())
        }
    }
}

/// Default response handler: print status code and body to standard output
pub fn log_response(response: ApiResponse) {
    println!("{}", format_response(&response));
}

fn format_response(response: &ApiResponse) -> String {
    format!("STATUS: {}\nBODY: {}", response.status, response.body)
}
