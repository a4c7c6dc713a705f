//! Session lifecycle: cookie store and HTTP transport
//!
//! A [`Session`] starts `Unopened` and allocates nothing until
//! [`Session::open`] is called. Opening builds a cookie jar and a reqwest
//! client bound to it; closing drops both. The authentication flag lives
//! inside the open state, so it cannot outlive the transport it refers to.

use std::fmt;
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Client;
use tracing::debug;

use crate::config::TransportConfig;
use crate::constants::user_agent;
use crate::error::Result;

/// Lifecycle state of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No resources allocated yet
    Unopened,
    /// Transport and cookie store are live
    Open,
    /// Resources released
    Closed,
}

/// Whether the open session completed a successful login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
}

/// Cookie-bearing HTTP transport owned by an open session
///
/// Never handed out of the crate, so the cookies die with the session.
pub(crate) struct Transport {
    client: Client,
    #[cfg_attr(not(test), allow(dead_code))]
    cookies: Arc<Jar>,
}

impl Transport {
    fn build(config: &TransportConfig) -> Result<Self> {
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout())
            .user_agent(user_agent())
            .build()?;

        Ok(Self { client, cookies })
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    /// Cookie store shared by every request of this transport
    #[cfg(test)]
    pub(crate) fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookies
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct OpenSession {
    transport: Transport,
    auth: AuthState,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Unopened,
    Open(OpenSession),
    Closed,
}

/// Live connection state for one client instance
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
}

impl Session {
    /// Create an unopened session
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the session, allocating the transport on first use.
    ///
    /// Idempotent: an already open session keeps its existing transport.
    /// A closed session is reopened with a fresh transport and an empty
    /// cookie store.
    pub fn open(&mut self, config: &TransportConfig) -> Result<()> {
        if matches!(self.phase, Phase::Open(_)) {
            return Ok(());
        }

        // Nothing is stored until the transport is fully built
        let transport = Transport::build(config)?;
        debug!(host = %config.host(), "Session opened");
        self.phase = Phase::Open(OpenSession {
            transport,
            auth: AuthState::Unauthenticated,
        });
        Ok(())
    }

    /// Release the transport and cookie store.
    ///
    /// Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if let Phase::Open(_) = std::mem::replace(&mut self.phase, Phase::Closed) {
            debug!("Session closed");
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Unopened => SessionState::Unopened,
            Phase::Open(_) => SessionState::Open,
            Phase::Closed => SessionState::Closed,
        }
    }

    /// Authentication state; always `Unauthenticated` unless open
    pub fn auth_state(&self) -> AuthState {
        match &self.phase {
            Phase::Open(open) => open.auth,
            Phase::Unopened | Phase::Closed => AuthState::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state() == AuthState::Authenticated
    }

    /// Transport of an open session
    pub(crate) fn transport(&self) -> Option<&Transport> {
        match &self.phase {
            Phase::Open(open) => Some(&open.transport),
            Phase::Unopened | Phase::Closed => None,
        }
    }

    pub(crate) fn set_auth_state(&mut self, auth: AuthState) {
        if let Phase::Open(open) = &mut self.phase {
            open.auth = auth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;
    use url::Url;

    fn config() -> TransportConfig {
        TransportConfig::new("http://localhost:8080", "user", "secret").unwrap()
    }

    fn jar(session: &Session) -> Arc<Jar> {
        Arc::clone(session.transport().unwrap().cookie_jar())
    }

    fn portal_url() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    #[test]
    fn test_starts_unopened() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Unopened);
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
        assert!(session.transport().is_none());
    }

    #[test]
    fn test_open_is_idempotent() {
        let config = config();
        let mut session = Session::new();

        session.open(&config).unwrap();
        let first = jar(&session);
        session.open(&config).unwrap();
        let second = jar(&session);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn test_open_keeps_auth_state() {
        let config = config();
        let mut session = Session::new();
        session.open(&config).unwrap();
        session.set_auth_state(AuthState::Authenticated);

        session.open(&config).unwrap();
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_close_without_open() {
        let mut session = Session::new();
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_close_clears_auth() {
        let config = config();
        let mut session = Session::new();
        session.open(&config).unwrap();
        session.set_auth_state(AuthState::Authenticated);

        session.close();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_authenticated());
        assert!(session.transport().is_none());
    }

    #[test]
    fn test_auth_state_ignored_when_not_open() {
        let mut session = Session::new();
        session.set_auth_state(AuthState::Authenticated);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_reopen_after_close_gets_fresh_transport() {
        let config = config();
        let mut session = Session::new();
        session.open(&config).unwrap();
        let first = jar(&session);
        session.close();

        session.open(&config).unwrap();
        let second = jar(&session);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(session.state(), SessionState::Open);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_close_discards_cookies() {
        let config = config();
        let url = portal_url();
        let mut session = Session::new();
        session.open(&config).unwrap();
        jar(&session).add_cookie_str("PHPSESSID=logged-in; Path=/", &url);
        session.set_auth_state(AuthState::Authenticated);
        assert!(jar(&session).cookies(&url).is_some());

        session.close();
        session.open(&config).unwrap();

        assert!(jar(&session).cookies(&url).is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_sessions_do_not_share_cookies() {
        let config = config();
        let url = portal_url();
        let mut first = Session::new();
        let mut second = Session::new();
        first.open(&config).unwrap();
        second.open(&config).unwrap();

        jar(&first).add_cookie_str("PHPSESSID=first; Path=/", &url);

        assert!(!Arc::ptr_eq(&jar(&first), &jar(&second)));
        assert!(jar(&second).cookies(&url).is_none());
    }
}
