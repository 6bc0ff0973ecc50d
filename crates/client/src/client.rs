// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 LRS REST Client Contributors

// LRS REST Client - Session and request API
// Form login, session cookie bookkeeping and the four JSON verbs

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ClientConfig, ConnectionTarget};
use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventBus};
use crate::network::is_loopback_address;
use crate::options::{RequestOptions, ResponseCallback, PATH_AND_BODY_FIELDS, PATH_FIELDS};
use crate::proxy::ErrorProxy;
use crate::request::{
    build_delete, build_get, build_post, build_put, BuildOptions, HttpMethod, FORM_CONTENT_TYPE,
    JSON_CONTENT_TYPE,
};
use crate::response::{log_response, ApiResponse};
use crate::transport::{HttpTransport, Transport};

/// Options for [`RestClient::log_in`]
///
/// Username and password must be given together. Without host and port the
/// client uses the local socket and skips the HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Login form path (default: `/login`)
    pub path: Option<String>,
}

impl LoginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Options for [`RestClient::log_out`]
#[derive(Debug, Clone, Default)]
pub struct LogoutOptions {
    /// Logout path (default: `/logout`)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Session {
    logged_in: bool,
    sid: Option<String>,
    connection: Option<ConnectionTarget>,
}

struct ClientInner {
    config: ClientConfig,
    session: RwLock<Session>,
    events: EventBus,
    transport: Arc<dyn Transport>,
}

/// Handle to an in-flight JSON request
#[derive(Debug)]
pub struct RequestHandle {
    task: JoinHandle<Option<ApiResponse>>,
}

impl RequestHandle {
    /// Wait for the request to finish
    ///
    /// Returns `None` if the request failed (the error went to its handler or
    /// the client's `error` event), was aborted, or its callback panicked.
    pub async fn wait(self) -> Option<ApiResponse> {
        match self.task.await {
            Ok(response) => response,
            Err(e) if e.is_panic() => {
                error!("Request task panicked: {}", e);
                None
            }
            Err(e) => {
                debug!("Request task did not complete: {}", e);
                None
            }
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Client for the LRS management API
///
/// Clones share the same session and event stream. JSON requests are spawned
/// on the current tokio runtime; outside one they fail with `Error::Transport`.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.inner.config)
            .field("session", &*self.read_session())
            .finish()
    }
}

impl RestClient {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                session: RwLock::new(Session::default()),
                events: EventBus::new(),
                transport,
            }),
        }
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read_session().logged_in
    }

    pub fn session_cookie(&self) -> Option<String> {
        self.read_session().sid.clone()
    }

    /// Target chosen by the last login, if any
    pub fn connection_target(&self) -> Option<ConnectionTarget> {
        self.read_session().connection.clone()
    }

    pub fn api_prefix(&self) -> &str {
        &self.inner.config.api_prefix
    }

    /// Log in and report the outcome as an event
    ///
    /// Emits `login`, `loginFailure`, `loginRequestFailure`, or `error` when
    /// only one of username and password is given.
    pub async fn log_in(&self, options: LoginOptions) {
        let LoginOptions {
            username,
            password,
            host,
            port,
            path,
        } = options;

        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some((username, password)),
            (None, None) => None,
            (Some(_), None) => {
                self.emit(ClientEvent::Error(Error::InvalidCredentials(
                    "username given without password".to_string(),
                )));
                return;
            }
            (None, Some(_)) => {
                self.emit(ClientEvent::Error(Error::InvalidCredentials(
                    "password given without username".to_string(),
                )));
                return;
            }
        };

        if host.is_none() && port.is_none() {
            let target = self.inner.config.local_target();
            self.write_session(|session| session.connection = Some(target.clone()));
            if credentials.is_some() {
                debug!("Credentials ignored for local socket login");
            }

            tokio::task::yield_now().await;
            self.write_session(|session| session.logged_in = true);
            info!("Logged in via {}", target);
            self.emit(ClientEvent::Login);
            return;
        }

        let host = host.unwrap_or_else(|| "localhost".to_string());
        let port = port.unwrap_or(80);
        if credentials.is_some() && !is_loopback_address(&host) {
            warn!("Sending credentials over plain HTTP to non-loopback host {}", host);
        }
        let target = ConnectionTarget::Tcp { host, port };
        self.write_session(|session| session.connection = Some(target.clone()));

        let request = match login_form(credentials).and_then(|form| {
            let path = path.unwrap_or_else(|| self.inner.config.login_path.clone());
            build_post(&BuildOptions::new(path).with_body(form, FORM_CONTENT_TYPE), &target)
        }) {
            Ok(request) => request,
            Err(e) => {
                self.emit(ClientEvent::Error(e));
                return;
            }
        };

        let response = match self.inner.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Login request to {} failed: {}", target, e);
                self.emit(ClientEvent::LoginRequestFailure(e));
                return;
            }
        };

        if response.body.contains("login") {
            warn!("Login rejected by {} (status {})", target, response.status);
            let body = response.body.clone();
            self.emit(ClientEvent::LoginFailure { response, body });
            return;
        }

        let sid = response.session_cookie();
        if sid.is_none() {
            warn!("Login response from {} carried no session cookie", target);
        }
        self.write_session(|session| {
            session.sid = sid;
            session.logged_in = true;
        });
        info!("Logged in to {}", target);
        self.emit(ClientEvent::Login);
    }

    /// Log out and report the outcome as an event
    ///
    /// Any response counts as success; only a transport failure emits
    /// `logoutRequestFailure`.
    pub async fn log_out(&self, options: LogoutOptions) {
        let (sid, target) = self.snapshot();
        let path = options
            .path
            .unwrap_or_else(|| self.inner.config.logout_path.clone());

        let request = match build_get(&BuildOptions::new(path).cookie(sid), &target) {
            Ok(request) => request,
            Err(e) => {
                self.emit(ClientEvent::Error(e));
                return;
            }
        };

        match self.inner.transport.send(request).await {
            Ok(response) => {
                if !response.is_success() {
                    warn!("Logout answered with status {}", response.status);
                }
                self.write_session(|session| session.logged_in = false);
                info!("Logged out of {}", target);
                self.emit(ClientEvent::Logout);
            }
            Err(e) => {
                warn!("Logout request to {} failed: {}", target, e);
                self.emit(ClientEvent::LogoutRequestFailure(e));
            }
        }
    }

    pub fn get_json(&self, options: impl Into<RequestOptions>) -> Result<RequestHandle> {
        self.send_json(HttpMethod::Get, options.into())
    }

    pub fn put_json(&self, options: impl Into<RequestOptions>) -> Result<RequestHandle> {
        self.send_json(HttpMethod::Put, options.into())
    }

    pub fn post_json(&self, options: impl Into<RequestOptions>) -> Result<RequestHandle> {
        self.send_json(HttpMethod::Post, options.into())
    }

    pub fn delete_json(&self, options: impl Into<RequestOptions>) -> Result<RequestHandle> {
        self.send_json(HttpMethod::Delete, options.into())
    }

    /// Fails with `Error::Transport` when called outside a tokio runtime.
    fn send_json(&self, method: HttpMethod, options: RequestOptions) -> Result<RequestHandle> {
        let has_body = matches!(method, HttpMethod::Post | HttpMethod::Put);
        options.require(if has_body { PATH_AND_BODY_FIELDS } else { PATH_FIELDS })?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Transport(format!("No tokio runtime to run the request on: {}", e)))?;

        let (sid, target) = self.snapshot();
        let mut build = BuildOptions::new(format!("{}{}", self.inner.config.api_prefix, options.path)).cookie(sid);
        if has_body {
            let body = options.serialized_body()?.unwrap_or_default();
            build = build.with_body(body, JSON_CONTENT_TYPE);
        }

        let request = match method {
            HttpMethod::Get => build_get(&build, &target)?,
            HttpMethod::Post => build_post(&build, &target)?,
            HttpMethod::Put => build_put(&build, &target)?,
            HttpMethod::Delete => build_delete(&build, &target)?,
        };

        let (callback, error_handler) = options.into_handlers();
        let proxy = ErrorProxy::new(self.inner.events.clone(), error_handler);
        let transport = self.inner.transport.clone();

        let task = runtime.spawn(async move {
            match transport.send(request).await {
                Ok(response) => {
                    let callback: ResponseCallback = match callback {
                        Some(callback) => callback,
                        None => Box::new(log_response),
                    };
                    callback(response.clone());
                    Some(response)
                }
                Err(e) => {
                    proxy.dispatch(e);
                    None
                }
            }
        });

        Ok(RequestHandle { task })
    }

    /// Session cookie and target for a new request
    ///
    /// Before any login, requests go to the configured local socket.
    fn snapshot(&self) -> (Option<String>, ConnectionTarget) {
        let session = self.read_session();
        let target = session
            .connection
            .clone()
            .unwrap_or_else(|| self.inner.config.local_target());
        (session.sid.clone(), target)
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self, update: impl FnOnce(&mut Session)) {
        let mut session = self.inner.session.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut session);
    }

    fn emit(&self, event: ClientEvent) {
        self.inner.events.emit(event);
    }
}

fn login_form(credentials: Option<(String, String)>) -> Result<String> {
    let fields: Vec<(&str, String)> = match credentials {
        Some((username, password)) => vec![("username", username), ("password", password)],
        None => Vec::new(),
    };
    serde_urlencoded::to_string(fields).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn client() -> (RestClient, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let client = RestClient::with_transport(ClientConfig::default(), transport.clone());
        (client, transport)
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> ApiResponse {
        ApiResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event timed out")
            .expect("event channel closed")
    }

    async fn logged_in_over_tcp(client: &RestClient, transport: &RecordingTransport) {
        transport.respond(Ok(response(200, &[("Set-Cookie", "sid=abc123; Path=/")], "{}")));
        client
            .log_in(LoginOptions::new().credentials("admin", "secret").host("127.0.0.1").port(8080))
            .await;
    }

    #[tokio::test]
    async fn test_login_username_without_password() {
        let (client, transport) = client();
        let mut rx = client.subscribe();

        client
            .log_in(LoginOptions {
                username: Some("admin".to_string()),
                host: Some("127.0.0.1".to_string()),
                ..Default::default()
            })
            .await;

        match next_event(&mut rx).await {
            ClientEvent::Error(Error::InvalidCredentials(msg)) => assert!(msg.contains("without password")),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(transport.requests().is_empty());
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_password_without_username() {
        let (client, transport) = client();
        let mut rx = client.subscribe();

        client
            .log_in(LoginOptions {
                password: Some("secret".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::Error(Error::InvalidCredentials(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_via_local_socket() {
        let (client, transport) = client();
        let mut rx = client.subscribe();

        client.log_in(LoginOptions::new()).await;

        assert_eq!(next_event(&mut rx).await, ClientEvent::Login);
        assert!(client.is_logged_in());
        assert_eq!(
            client.connection_target(),
            Some(ConnectionTarget::Unix {
                socket_path: PathBuf::from("/tmp/rest_server/http.sock"),
            })
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_failure_page() {
        let (client, transport) = client();
        let mut rx = client.subscribe();
        transport.respond(Ok(response(200, &[], "<html>login</html>")));

        client
            .log_in(LoginOptions::new().credentials("admin", "wrong").host("127.0.0.1").port(8080))
            .await;

        match next_event(&mut rx).await {
            ClientEvent::LoginFailure { response, body } => {
                assert_eq!(body, "<html>login</html>");
                assert_eq!(response.status, 200);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!client.is_logged_in());
        assert_eq!(client.session_cookie(), None);
    }

    #[tokio::test]
    async fn test_login_stores_session_cookie() {
        let (client, transport) = client();
        let mut rx = client.subscribe();

        logged_in_over_tcp(&client, &transport).await;

        assert_eq!(next_event(&mut rx).await, ClientEvent::Login);
        assert!(client.is_logged_in());
        assert_eq!(client.session_cookie().as_deref(), Some("sid=abc123"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let login = &requests[0];
        assert_eq!(login.method, HttpMethod::Post);
        assert_eq!(login.path, "/login");
        assert_eq!(login.body.as_deref(), Some("username=admin&password=secret"));
        assert_eq!(login.header("Content-Type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(login.header("Content-Length"), Some("30"));
        assert_eq!(login.header("Host"), Some("127.0.0.1:8080"));
        assert!(login.fresh_connection);
    }

    #[tokio::test]
    async fn test_login_form_is_percent_encoded() {
        let (client, transport) = client();
        client
            .log_in(LoginOptions::new().credentials("a b", "p&q").port(8080).path("/auth"))
            .await;

        let login = &transport.requests()[0];
        assert_eq!(login.path, "/auth");
        assert_eq!(login.body.as_deref(), Some("username=a+b&password=p%26q"));
        assert_eq!(
            login.target,
            ConnectionTarget::Tcp {
                host: "localhost".to_string(),
                port: 8080,
            }
        );
    }

    #[tokio::test]
    async fn test_login_request_failure() {
        let (client, transport) = client();
        let mut rx = client.subscribe();
        transport.respond(Err(Error::Connect("connection refused".to_string())));

        client.log_in(LoginOptions::new().host("127.0.0.1").port(1)).await;

        assert_eq!(
            next_event(&mut rx).await,
            ClientEvent::LoginRequestFailure(Error::Connect("connection refused".to_string()))
        );
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_get_json_without_session() {
        let (client, transport) = client();
        let (tx, rx) = oneshot::channel();

        let handle = client
            .get_json(RequestOptions::new("/foo").on_response(move |resp| {
                let _ = tx.send(resp.status);
            }))
            .unwrap();
        assert!(handle.wait().await.is_some());
        assert_eq!(rx.await.unwrap(), 200);

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.path, "/lrs/api/v1.0/foo");
        assert_eq!(request.header("Cookie"), None);
        assert_eq!(request.target, ClientConfig::default().local_target());
    }

    #[tokio::test]
    async fn test_get_json_sends_session_cookie() {
        let (client, transport) = client();
        logged_in_over_tcp(&client, &transport).await;

        client.get_json("/foo").unwrap().wait().await;

        let request = &transport.requests()[1];
        assert_eq!(request.path, "/lrs/api/v1.0/foo");
        assert_eq!(request.header("Cookie"), Some("sid=abc123"));
        assert_eq!(request.header("Host"), Some("127.0.0.1:8080"));
    }

    #[tokio::test]
    async fn test_put_json_serializes_body() {
        let (client, transport) = client();

        client.put_json(("/foo", json!({"a": 1}))).unwrap().wait().await;

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(request.header("Content-Length"), Some("7"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_post_json_string_body_passes_through() {
        let (client, transport) = client();

        client.post_json(("/foo", r#"{"raw":true}"#)).unwrap().wait().await;

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body.as_deref(), Some(r#"{"raw":true}"#));
    }

    #[tokio::test]
    async fn test_put_json_requires_body() {
        let (client, transport) = client();
        assert_eq!(
            client.put_json("/foo").unwrap_err(),
            Error::MissingArgument("body".to_string())
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_options_record_call_shape() {
        let (client, transport) = client();
        let options = RequestOptions::from_args(
            &[json!({"path": "/bar", "body": {"b": 2}, "host": "elsewhere"})],
            PATH_AND_BODY_FIELDS,
        )
        .unwrap();

        client.post_json(options).unwrap().wait().await;

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/lrs/api/v1.0/bar");
        assert_eq!(request.body.as_deref(), Some(r#"{"b":2}"#));
        assert_eq!(request.target, ClientConfig::default().local_target());
    }

    #[tokio::test]
    async fn test_delete_json_reuses_connections() {
        let (client, transport) = client();
        client.delete_json("/foo").unwrap().wait().await;

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Delete);
        assert!(!request.fresh_connection);
    }

    #[tokio::test]
    async fn test_transport_error_goes_to_error_event() {
        let (client, transport) = client();
        let mut rx = client.subscribe();
        transport.respond(Err(Error::Connect("refused".to_string())));

        let handle = client.get_json("/foo").unwrap();
        assert!(handle.wait().await.is_none());

        assert_eq!(
            next_event(&mut rx).await,
            ClientEvent::Error(Error::Connect("refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_caller_error_handler_takes_over() {
        let (client, transport) = client();
        let mut rx = client.subscribe();
        transport.respond(Err(Error::Connect("refused".to_string())));
        let (tx, err_rx) = oneshot::channel();

        let handle = client
            .get_json(RequestOptions::new("/foo").on_error(move |e| {
                let _ = tx.send(e);
            }))
            .unwrap();
        handle.wait().await;

        assert_eq!(err_rx.await.unwrap(), Error::Connect("refused".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_is_unconditional_and_repeatable() {
        let (client, transport) = client();
        logged_in_over_tcp(&client, &transport).await;
        let mut rx = client.subscribe();
        transport.respond(Ok(response(500, &[], "boom")));

        client.log_out(LogoutOptions::default()).await;
        assert_eq!(next_event(&mut rx).await, ClientEvent::Logout);
        assert!(!client.is_logged_in());

        client.log_out(LogoutOptions::default()).await;
        assert_eq!(next_event(&mut rx).await, ClientEvent::Logout);

        let requests = transport.requests();
        let logout = &requests[1];
        assert_eq!(logout.method, HttpMethod::Get);
        assert_eq!(logout.path, "/logout");
        assert_eq!(logout.header("Cookie"), Some("sid=abc123"));
    }

    #[tokio::test]
    async fn test_logout_request_failure() {
        let (client, transport) = client();
        client.log_in(LoginOptions::new()).await;
        let mut rx = client.subscribe();
        transport.respond(Err(Error::Connect("refused".to_string())));

        client
            .log_out(LogoutOptions {
                path: Some("/bye".to_string()),
            })
            .await;

        assert_eq!(
            next_event(&mut rx).await,
            ClientEvent::LogoutRequestFailure(Error::Connect("refused".to_string()))
        );
        assert!(client.is_logged_in());
        assert_eq!(transport.requests()[0].path, "/bye");
    }

    #[test]
    fn test_json_request_outside_runtime_fails() {
        let (client, transport) = client();
        assert!(matches!(client.get_json("/foo"), Err(Error::Transport(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_callback_yields_no_response() {
        let (client, transport) = client();
        let handle = client
            .get_json(RequestOptions::new("/foo").on_response(|_| panic!("callback failed")))
            .unwrap();

        assert!(handle.wait().await.is_none());
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_login_form_without_credentials() {
        assert_eq!(login_form(None).unwrap(), "");
    }
}
