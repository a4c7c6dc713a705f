//! Request execution through an open session

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{AutoskopeError, Result};
use crate::session::{Session, Transport};

/// Status and body of a completed exchange, before classification
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Issues single, timeout-bounded requests over a session's transport
pub(crate) struct RequestExecutor<'a> {
    transport: &'a Transport,
    config: &'a TransportConfig,
}

impl<'a> RequestExecutor<'a> {
    /// Bind to an open session
    pub fn new(session: &'a Session, config: &'a TransportConfig) -> Result<Self> {
        let transport = session
            .transport()
            .ok_or_else(|| AutoskopeError::cannot_connect("Session is not open"))?;
        Ok(Self { transport, config })
    }

    /// Send a form request and return the raw status and body.
    ///
    /// Transport failures (unreachable host, timeout) become `CannotConnect`;
    /// HTTP statuses are left to the caller.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<RawResponse> {
        let url = self
            .config
            .endpoint(path)
            .map_err(|e| AutoskopeError::cannot_connect(format!("Invalid request URL: {}", e)))?;
        debug!(%method, %url, "Requesting");

        let response = self
            .transport
            .http_client()
            .request(method, url)
            .timeout(self.config.timeout())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), path, "Response received");

        Ok(RawResponse { status, body })
    }

    /// Send a form request and decode the JSON object it returns
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value> {
        let raw = self.send(method, path, form).await?;
        decode_response(raw)
    }
}

/// Classify a response by status and decode its body
pub(crate) fn decode_response(raw: RawResponse) -> Result<Value> {
    match raw.status {
        StatusCode::ACCEPTED => {
            log_accepted_notice(&raw.body);
            Ok(Value::Object(Default::default()))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AutoskopeError::invalid_auth(
            format!("Authorization error: {}", raw.status.as_u16()),
        )),
        status if status.is_client_error() || status.is_server_error() => {
            Err(AutoskopeError::cannot_connect(format!(
                "API request failed with status {}",
                status.as_u16()
            )))
        }
        _ => match serde_json::from_str::<Value>(&raw.body) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => {
                warn!("API response is not a JSON object");
                Err(AutoskopeError::cannot_connect(
                    "Received non-object JSON response from API",
                ))
            }
            Err(e) => {
                warn!(error = %e, "Failed to decode API response");
                Err(AutoskopeError::cannot_connect(
                    "Received invalid response from API",
                ))
            }
        },
    }
}

/// The portal answers 202 when the announced app version is outdated, but
/// still serves the request.
pub(crate) fn log_accepted_notice(body: &str) {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned));

    match message {
        Some(message) => debug!(%message, "Portal accepted request with notice"),
        None => debug!("Portal accepted request (status 202)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_object_body_passes_through() {
        let value = decode_response(raw(200, r#"{"cars": []}"#)).unwrap();
        assert_eq!(value["cars"], serde_json::json!([]));
    }

    #[test]
    fn test_accepted_is_empty_object() {
        let body = r#"{"message": "Du verwendest eine veraltete App-Version"}"#;
        let value = decode_response(raw(202, body)).unwrap();
        assert_eq!(value, serde_json::json!({}));

        let value = decode_response(raw(202, "not json")).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_auth_statuses_are_invalid_auth() {
        assert!(decode_response(raw(401, "")).unwrap_err().is_invalid_auth());
        assert!(decode_response(raw(403, "")).unwrap_err().is_invalid_auth());
    }

    #[test]
    fn test_other_error_statuses_are_cannot_connect() {
        for status in [400, 404, 500, 503] {
            let err = decode_response(raw(status, "{}")).unwrap_err();
            assert!(err.is_cannot_connect(), "status {}", status);
        }
    }

    #[test]
    fn test_non_object_json_is_cannot_connect() {
        let err = decode_response(raw(200, "[1, 2, 3]")).unwrap_err();
        assert!(err.is_cannot_connect());
    }

    #[test]
    fn test_invalid_json_is_cannot_connect() {
        let err = decode_response(raw(200, "<html>")).unwrap_err();
        assert!(err.is_cannot_connect());
    }

    #[test]
    fn test_executor_requires_open_session() {
        let config = TransportConfig::new("http://localhost:8080", "u", "p").unwrap();
        let session = Session::new();
        let err = RequestExecutor::new(&session, &config).err().unwrap();
        assert!(err.is_cannot_connect());
    }
}
