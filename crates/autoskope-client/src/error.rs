//! Error types for Autoskope client operations

use thiserror::Error;

/// Result type alias for Autoskope client operations
pub type Result<T> = std::result::Result<T, AutoskopeError>;

/// Errors surfaced by client operations
///
/// The set is closed: every failure is classified as either a connectivity
/// or protocol problem, or a credentials problem, at the point where it is
/// detected. Callers can rely on the variant to decide whether to retry
/// later or to ask the user for new credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutoskopeError {
    /// Host unreachable, transport timeout, or the service violated its
    /// response contract
    #[error("Cannot connect to Autoskope: {0}")]
    CannotConnect(String),

    /// Credentials rejected, or an authenticated call on an
    /// unauthenticated session
    #[error("Invalid authentication: {0}")]
    InvalidAuth(String),
}

impl AutoskopeError {
    /// Create a connectivity/protocol error
    pub fn cannot_connect(message: impl Into<String>) -> Self {
        Self::CannotConnect(message.into())
    }

    /// Create a credentials error
    pub fn invalid_auth(message: impl Into<String>) -> Self {
        Self::InvalidAuth(message.into())
    }

    pub fn is_cannot_connect(&self) -> bool {
        matches!(self, Self::CannotConnect(_))
    }

    pub fn is_invalid_auth(&self) -> bool {
        matches!(self, Self::InvalidAuth(_))
    }
}

impl From<reqwest::Error> for AutoskopeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::CannotConnect(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::CannotConnect(format!("Connection failed: {}", err))
        } else {
            Self::CannotConnect(format!("HTTP request failed: {}", err))
        }
    }
}

/// Errors raised while building a [`TransportConfig`](crate::TransportConfig)
///
/// These are reported before any network activity takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Host is not an absolute http(s) URL
    #[error("Host must be a valid HTTP(S) URL, got: {0:?}")]
    InvalidHost(String),

    /// Timeout must be strictly positive
    #[error("Timeout must be positive")]
    InvalidTimeout,

    /// Configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}
