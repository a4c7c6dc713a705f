//! Autoskope portal client

use std::ops::{Deref, DerefMut};

use tracing::{debug, instrument};

use crate::auth::authenticate;
use crate::config::TransportConfig;
use crate::error::Result;
use crate::session::{AuthState, Session, SessionState};
use crate::types::Vehicle;
use crate::vehicles::list_vehicles;

/// Client for one Autoskope account
///
/// The client owns its [`Session`]; nothing touches the network until the
/// session is opened. Operations take `&mut self`, so calls on one client
/// are strictly sequential. Use separate clients for concurrent fetches.
#[derive(Debug)]
pub struct AutoskopeClient {
    config: TransportConfig,
    session: Session,
}

impl AutoskopeClient {
    /// Create a client; no resources are allocated yet
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            session: Session::new(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn auth_state(&self) -> AuthState {
        self.session.auth_state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Open and authenticated
    pub fn is_connected(&self) -> bool {
        self.session.state() == SessionState::Open && self.session.is_authenticated()
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Open the session and return a guard that closes it when dropped.
    ///
    /// Does not authenticate; call [`login`](Self::login) on the guard.
    /// Release happens on every exit path out of the guard's scope,
    /// including early returns through `?`.
    ///
    /// ```rust,no_run
    /// # use autoskope_client::{AutoskopeClient, TransportConfig};
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = TransportConfig::new("https://portal.autoskope.de", "user", "secret")?;
    /// let mut client = AutoskopeClient::new(config);
    ///
    /// let mut session = client.connect()?;
    /// session.login().await?;
    /// let vehicles = session.fetch_vehicles().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect(&mut self) -> Result<ScopedSession<'_>> {
        if let Err(err) = self.open() {
            self.close();
            return Err(err);
        }
        Ok(ScopedSession { client: self })
    }

    /// Open the session without a guard; pair with [`close`](Self::close)
    pub fn open(&mut self) -> Result<()> {
        self.session.open(&self.config)
    }

    /// Release the session's transport and cookies
    pub fn close(&mut self) {
        self.session.close();
    }

    // =========================================================================
    // Portal Operations
    // =========================================================================

    /// Authenticate with the configured credentials.
    ///
    /// Opens the session if needed. Calling it again re-authenticates.
    #[instrument(skip(self), fields(username = self.config.username()))]
    pub async fn login(&mut self) -> Result<()> {
        authenticate(&mut self.session, &self.config).await
    }

    /// Fetch all vehicles with their decoded positions.
    ///
    /// Requires a prior successful [`login`](Self::login).
    #[instrument(skip(self))]
    pub async fn fetch_vehicles(&mut self) -> Result<Vec<Vehicle>> {
        debug!("Fetching vehicles");
        list_vehicles(&mut self.session, &self.config).await
    }
}

/// An open session that is closed when dropped
#[derive(Debug)]
pub struct ScopedSession<'a> {
    client: &'a mut AutoskopeClient,
}

impl Deref for ScopedSession<'_> {
    type Target = AutoskopeClient;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl DerefMut for ScopedSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
    }
}

impl Drop for ScopedSession<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AutoskopeClient {
        AutoskopeClient::new(
            TransportConfig::new("http://localhost:9", "user", "secret").unwrap(),
        )
    }

    #[test]
    fn test_client_creation_is_lazy() {
        let client = client();
        assert_eq!(client.session_state(), SessionState::Unopened);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_scoped_session_closes_on_drop() {
        let mut client = client();
        {
            let session = client.connect().unwrap();
            assert_eq!(session.session_state(), SessionState::Open);
            assert!(!session.is_authenticated());
        }
        assert_eq!(client.session_state(), SessionState::Closed);
    }

    #[test]
    fn test_close_is_repeatable() {
        let mut client = client();
        client.close();
        client.open().unwrap();
        client.close();
        client.close();
        assert_eq!(client.session_state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_fetch_before_login_is_invalid_auth() {
        let mut client = client();
        let mut session = client.connect().unwrap();
        let err = session.fetch_vehicles().await.unwrap_err();
        assert!(err.is_invalid_auth());
    }

    #[tokio::test]
    async fn test_portal_rejects_reopened_session_after_close() {
        use crate::constants::{APP_VERSION, VEHICLES_PATH};
        use crate::executor::RequestExecutor;
        use crate::testing::{MockPortal, TestServer};
        use reqwest::Method;

        let portal = MockPortal::new("user", "secret");
        let server = TestServer::start(portal.router()).await.unwrap();
        let mut client = server.client("user", "secret").unwrap();
        let form = [("appversion", APP_VERSION)];

        client.login().await.unwrap();
        let executor = RequestExecutor::new(&client.session, &client.config).unwrap();
        assert!(executor.execute(Method::POST, VEHICLES_PATH, &form).await.is_ok());

        client.close();
        client.open().unwrap();

        // Bypasses the fail-fast check so the portal sees the fresh cookie jar
        let executor = RequestExecutor::new(&client.session, &client.config).unwrap();
        let err = executor
            .execute(Method::POST, VEHICLES_PATH, &form)
            .await
            .unwrap_err();
        assert!(err.is_invalid_auth());
        assert_eq!(portal.info_requests(), 2);
    }
}
