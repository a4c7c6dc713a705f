//! Transport configuration
//!
//! A [`TransportConfig`] is validated once, at construction, and is immutable
//! afterwards. It can be built programmatically or deserialized from YAML or
//! JSON; both paths run the same validation.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::constants::DEFAULT_TIMEOUT;
use crate::error::ConfigError;

/// Connection settings for one Autoskope account
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawTransportConfig")]
pub struct TransportConfig {
    host: Url,
    username: String,
    password: String,
    timeout: Duration,
}

impl TransportConfig {
    /// Create a configuration with the default timeout
    pub fn new(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::builder(host)
            .credentials(username, password)
            .build()
    }

    /// Create a builder for programmatic configuration
    pub fn builder(host: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder::new(host)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawTransportConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.try_into()
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawTransportConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.try_into()
    }

    /// Validated base URL of the portal
    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Upper bound for every network call (connect + read)
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an API path against the host.
    ///
    /// The path is appended to the host's own path, so a portal mounted
    /// under a prefix (`https://example.com/portal`) keeps that prefix.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.host.as_str().trim_end_matches('/');
        Url::parse(&format!("{}{}", base, path))
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("host", &self.host.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Validate a host string as an absolute http(s) URL.
///
/// Endpoint paths are appended to the host, so a query or fragment would
/// swallow them.
fn parse_host(host: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidHost(host.to_string());

    let url = Url::parse(host.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }
    match url.host_str() {
        Some(h) if !h.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

/// Builder for [`TransportConfig`]
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    host: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl TransportConfigBuilder {
    /// Create a new builder with the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the account credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the request timeout in whole seconds
    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        let host = parse_host(&self.host)?;
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(TransportConfig {
            host,
            username: self.username,
            password: self.password,
            timeout: self.timeout,
        })
    }
}

/// Unvalidated wire form of [`TransportConfig`]
#[derive(Deserialize)]
struct RawTransportConfig {
    host: String,
    username: String,
    password: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl TryFrom<RawTransportConfig> for TransportConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTransportConfig) -> Result<Self, Self::Error> {
        TransportConfig::builder(raw.host)
            .credentials(raw.username, raw.password)
            .timeout_secs(raw.timeout_secs)
            .build()
    }
}
