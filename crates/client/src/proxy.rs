// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// Per-request routing of transport errors

use tracing::debug;

use crate::error::Error;
use crate::events::{ClientEvent, EventBus};
use crate::options::ErrorHandler;

/// Routes a request's transport error
///
/// The proxy itself counts as one listener. When the caller registered a
/// handler on the request there is more than one, and the caller's handler
/// alone receives the error; otherwise it becomes the client's `error` event.
pub struct ErrorProxy {
    events: EventBus,
    caller_handler: Option<ErrorHandler>,
}

impl ErrorProxy {
    pub fn new(events: EventBus, caller_handler: Option<ErrorHandler>) -> Self {
        Self { events, caller_handler }
    }

    pub fn listener_count(&self) -> usize {
        1 + usize::from(self.caller_handler.is_some())
    }

    pub fn dispatch(self, err: Error) {
        match self.caller_handler {
            Some(handler) => {
                debug!("Request error left to caller handler: {}", err);
                handler(err);
            }
            None => self.events.emit(ClientEvent::Error(err)),
        }
    }
}

impl std::fmt::Debug for ErrorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorProxy")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
