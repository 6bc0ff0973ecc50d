// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

//! Call-shape normalization for the JSON verbs
//!
//! Every verb accepts either a positional argument list led by a path string
//! or a single options record. [`parse_options`] folds both shapes into one
//! canonical record; [`RequestOptions`] is the typed form used by the client.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::response::ApiResponse;

/// Invoked with the fully-read response of a request
pub type ResponseCallback = Box<dyn FnOnce(ApiResponse) + Send + 'static>;

/// Invoked with the transport error of a request
pub type ErrorHandler = Box<dyn FnOnce(Error) + Send + 'static>;

/// Fields required by GET and DELETE, in positional order
pub const PATH_FIELDS: &[&str] = &["path"];

/// Fields required by PUT and POST, in positional order
pub const PATH_AND_BODY_FIELDS: &[&str] = &["path", "body"];

/// Normalize raw call arguments into a single options record
///
/// * `args` - the arguments as passed by the caller
/// * `required` - required field names, in positional order
/// * `optional` - optional field names, in positional order
///
/// A string first argument selects positional mode: required fields are
/// filled in order, then optional fields, and anything beyond is dropped.
/// Any other first argument is taken as the record itself; it must carry
/// every required field, all its properties are copied, and the arguments
/// after it fill the optional fields.
pub fn parse_options(args: &[Value], required: &[&str], optional: &[&str]) -> Result<Map<String, Value>> {
    let mut options = Map::new();

    let Some(first) = args.first() else {
        if required.is_empty() {
            return Ok(options);
        }
        return Err(Error::MissingArguments(required.join(", ")));
    };

    let rest = if first.is_string() {
        if args.len() < required.len() {
            return Err(Error::MissingArguments(required.join(", ")));
        }
        for (name, value) in required.iter().zip(args) {
            options.insert((*name).to_string(), value.clone());
        }
        &args[required.len()..]
    } else {
        let record = first.as_object();
        if let Some(missing) = required
            .iter()
            .find(|name| !record.is_some_and(|r| r.contains_key(**name)))
        {
            return Err(Error::MissingArgument((*missing).to_string()));
        }
        if let Some(record) = record {
            options.extend(record.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        &args[1..]
    };

    for (name, value) in optional.iter().zip(rest) {
        options.insert((*name).to_string(), value.clone());
    }

    Ok(options)
}

/// Canonical options for one JSON request
pub struct RequestOptions {
    /// Path below the API prefix
    pub path: String,
    /// JSON body for PUT/POST; strings are sent verbatim
    pub body: Option<Value>,
    callback: Option<ResponseCallback>,
    error_handler: Option<ErrorHandler>,
}

impl RequestOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: None,
            callback: None,
            error_handler: None,
        }
    }

    /// Build options from a raw argument list
    ///
    /// `required` is [`PATH_FIELDS`] or [`PATH_AND_BODY_FIELDS`]; a body may
    /// follow the path positionally in either case. Other record properties
    /// such as `host` or `port` are dropped: the session's connection target
    /// always decides where the request goes.
    pub fn from_args(args: &[Value], required: &[&str]) -> Result<Self> {
        let optional: &[&str] = if required.contains(&"body") { &[] } else { &["body"] };
        let mut record = parse_options(args, required, optional)?;

        let path = match record.remove("path") {
            Some(Value::String(path)) => path,
            Some(other) => {
                return Err(Error::InvalidArgument(format!("path must be a string, got {}", other)))
            }
            None => return Err(Error::MissingArgument("path".to_string())),
        };
        let body = record.remove("body");

        Ok(Self {
            path,
            body,
            callback: None,
            error_handler: None,
        })
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Handle the response instead of printing it with the default logger
    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Handle transport errors of this request instead of the client's `error` event
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Check that every field in `required` is present
    pub fn require(&self, required: &[&str]) -> Result<()> {
        for name in required {
            let present = match *name {
                "path" => true,
                "body" => self.body.is_some(),
                _ => false,
            };
            if !present {
                return Err(Error::MissingArgument((*name).to_string()));
            }
        }
        Ok(())
    }

    /// Serialized body; strings pass through unchanged
    pub fn serialized_body(&self) -> Result<Option<String>> {
        match &self.body {
            None => Ok(None),
            Some(Value::String(raw)) => Ok(Some(raw.clone())),
            Some(value) => Ok(Some(serde_json::to_string(value)?)),
        }
    }

    pub(crate) fn into_handlers(self) -> (Option<ResponseCallback>, Option<ErrorHandler>) {
        (self.callback, self.error_handler)
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("path", &self.path)
            .field("body", &self.body)
            .field("callback", &self.callback.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl From<&str> for RequestOptions {
    fn from(path: &str) -> Self {
        RequestOptions::new(path)
    }
}

impl From<String> for RequestOptions {
    fn from(path: String) -> Self {
        RequestOptions::new(path)
    }
}

impl<B: Into<Value>> From<(&str, B)> for RequestOptions {
    fn from((path, body): (&str, B)) -> Self {
        RequestOptions::new(path).body(body)
    }
}

impl<B: Into<Value>> From<(String, B)> for RequestOptions {
    fn from((path, body): (String, B)) -> Self {
        RequestOptions::new(path).body(body)
    }
}
