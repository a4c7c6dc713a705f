//! Test utilities for autoskope-client
//!
//! [`MockPortal`] emulates the portal's login and info endpoints in-process,
//! and [`TestServer`] serves any axum router on an ephemeral local port.
//!
//! ```rust,ignore
//! use autoskope_client::testing::{MockPortal, TestServer};
//!
//! let portal = MockPortal::new("user", "secret").with_info(json!({"cars": []}));
//! let server = TestServer::start(portal.router()).await?;
//!
//! let mut client = server.client("user", "secret")?;
//! let mut session = client.connect()?;
//! session.login().await?;
//! assert_eq!(portal.requests(), 1);
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::constants::{LOGIN_PATH, VEHICLES_PATH};
use crate::{AutoskopeClient, ConfigError, TransportConfig};

/// Session cookie issued by the mock portal
pub const MOCK_SESSION_COOKIE: &str = "PHPSESSID";
const MOCK_SESSION_TOKEN: &str = "mock-session-token";

/// In-process stand-in for the Autoskope portal
///
/// Cloning shares the request counters, so a test can keep one handle while
/// the router serves requests.
#[derive(Clone)]
pub struct MockPortal {
    state: Arc<PortalState>,
}

struct PortalState {
    username: String,
    password: String,
    login_notice: bool,
    login_delay: Duration,
    info_status: StatusCode,
    info_body: String,
    info_delay: Duration,
    login_requests: AtomicUsize,
    info_requests: AtomicUsize,
}

impl MockPortal {
    /// Portal accepting exactly these credentials, with no vehicles
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            state: Arc::new(PortalState {
                username: username.into(),
                password: password.into(),
                login_notice: false,
                login_delay: Duration::ZERO,
                info_status: StatusCode::OK,
                info_body: r#"{"cars": []}"#.to_string(),
                info_delay: Duration::ZERO,
                login_requests: AtomicUsize::new(0),
                info_requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Apply a setting; panics once [`router`](Self::router) or a clone
    /// shares the state, since the change could no longer take effect
    fn configure(mut self, f: impl FnOnce(&mut PortalState)) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(state) => f(state),
            None => panic!("MockPortal must be configured before router() or clone()"),
        }
        self
    }

    /// JSON document served by the info endpoint
    pub fn with_info(self, info: Value) -> Self {
        self.with_info_body(info.to_string())
    }

    /// Raw body served by the info endpoint
    pub fn with_info_body(self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.configure(|s| s.info_body = body)
    }

    /// Status served by the info endpoint to authenticated callers
    pub fn with_info_status(self, status: StatusCode) -> Self {
        self.configure(|s| s.info_status = status)
    }

    /// Delay before the info endpoint answers
    pub fn with_info_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.info_delay = delay)
    }

    /// Delay before the login endpoint answers
    pub fn with_login_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.login_delay = delay)
    }

    /// Accept logins with a 202 "outdated app version" notice
    pub fn with_login_notice(self) -> Self {
        self.configure(|s| s.login_notice = true)
    }

    /// Total requests received on any endpoint
    pub fn requests(&self) -> usize {
        self.login_requests() + self.info_requests()
    }

    pub fn login_requests(&self) -> usize {
        self.state.login_requests.load(Ordering::SeqCst)
    }

    pub fn info_requests(&self) -> usize {
        self.state.info_requests.load(Ordering::SeqCst)
    }

    /// Router serving the portal endpoints
    pub fn router(&self) -> Router {
        Router::new()
            .route(LOGIN_PATH, post(login_handler))
            .route(VEHICLES_PATH, post(info_handler))
            .with_state(Arc::clone(&self.state))
    }
}

async fn login_handler(
    State(portal): State<Arc<PortalState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    portal.login_requests.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(portal.login_delay).await;

    let accepted = form.get("username") == Some(&portal.username)
        && form.get("password") == Some(&portal.password);
    if !accepted {
        return (StatusCode::OK, "Benutzername oder Passwort falsch").into_response();
    }

    let cookie = format!("{}={}; Path=/", MOCK_SESSION_COOKIE, MOCK_SESSION_TOKEN);
    if portal.login_notice {
        let notice = r#"{"message": "Du verwendest eine veraltete App-Version"}"#;
        (StatusCode::ACCEPTED, [(header::SET_COOKIE, cookie)], notice).into_response()
    } else {
        (StatusCode::OK, [(header::SET_COOKIE, cookie)], "").into_response()
    }
}

async fn info_handler(State(portal): State<Arc<PortalState>>, headers: HeaderMap) -> Response {
    portal.info_requests.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(portal.info_delay).await;

    if !has_session_cookie(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    (
        portal.info_status,
        [(header::CONTENT_TYPE, "application/json")],
        portal.info_body.clone(),
    )
        .into_response()
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    let expected = format!("{}={}", MOCK_SESSION_COOKIE, MOCK_SESSION_TOKEN);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .any(|pair| pair.trim() == expected)
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve a router on an ephemeral local port
    pub async fn start(router: Router) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Configuration pointing at this server, with a short timeout
    pub fn config(
        &self,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<TransportConfig, ConfigError> {
        TransportConfig::builder(self.base_url())
            .credentials(username, password)
            .timeout(timeout)
            .build()
    }

    /// Client for this server with a 5 second timeout
    pub fn client(&self, username: &str, password: &str) -> Result<AutoskopeClient, ConfigError> {
        self.config(username, password, Duration::from_secs(5))
            .map(AutoskopeClient::new)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Base URL of a local port nothing listens on
pub fn unreachable_url() -> std::io::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_session_cookie(&headers));

        headers.insert(
            header::COOKIE,
            format!("other=1; {}={}", MOCK_SESSION_COOKIE, MOCK_SESSION_TOKEN)
                .parse()
                .unwrap(),
        );
        assert!(has_session_cookie(&headers));
    }

    #[test]
    fn test_builder_before_sharing() {
        let portal = MockPortal::new("u", "p").with_info_delay(Duration::from_millis(5));
        assert_eq!(portal.state.info_delay, Duration::from_millis(5));
        assert_eq!(portal.requests(), 0);
    }

    #[test]
    #[should_panic(expected = "configured before router()")]
    fn test_configure_after_router_panics() {
        let portal = MockPortal::new("u", "p");
        let _router = portal.router();
        let _ = portal.with_login_notice();
    }
}
