// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

//! Client events and their broadcast channel

use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::error::Error;
use crate::response::ApiResponse;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome notifications emitted by [`RestClient`](crate::RestClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Session established
    Login,
    /// Session ended
    Logout,
    /// The server answered the login form with a login page again
    LoginFailure { response: ApiResponse, body: String },
    /// The login request never got a response
    LoginRequestFailure(Error),
    /// The logout request never got a response
    LogoutRequestFailure(Error),
    /// Validation failure or unhandled request error
    Error(Error),
}

impl ClientEvent {
    /// Event name as seen by integrators
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Login => "login",
            ClientEvent::Logout => "logout",
            ClientEvent::LoginFailure { .. } => "loginFailure",
            ClientEvent::LoginRequestFailure(_) => "loginRequestFailure",
            ClientEvent::LogoutRequestFailure(_) => "logoutRequestFailure",
            ClientEvent::Error(_) => "error",
        }
    }
}

/// Fan-out of client events to every subscriber
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Deliver an event to current subscribers
    ///
    /// An `error` nobody listens for is logged instead of dropped silently.
    pub fn emit(&self, event: ClientEvent) {
        if self.tx.receiver_count() == 0 {
            match &event {
                ClientEvent::Error(err) => error!("Unhandled client error: {}", err),
                other => debug!("No subscribers for {} event", other.name()),
            }
            return;
        }

        debug!("Emitting {} event", event.name());
        let _ = self.tx.send(event);
    }
}
