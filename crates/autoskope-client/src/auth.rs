//! Login exchange and outcome classification

use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::constants::{APP_VERSION, LOGIN_PATH};
use crate::error::{AutoskopeError, Result};
use crate::executor::{log_accepted_notice, RawResponse, RequestExecutor};
use crate::session::{AuthState, Session};

/// Run one login exchange, opening the session if needed.
///
/// The auth state is only touched once the portal has answered: a transport
/// failure leaves it as it was, a rejection clears it, an acceptance sets it.
pub(crate) async fn authenticate(session: &mut Session, config: &TransportConfig) -> Result<()> {
    session.open(config)?;

    let outcome = {
        let executor = RequestExecutor::new(session, config)?;
        let form = [
            ("username", config.username()),
            ("password", config.password()),
            ("appversion", APP_VERSION),
        ];
        executor.send(Method::POST, LOGIN_PATH, &form).await
    };

    match outcome.and_then(classify_login) {
        Ok(()) => {
            session.set_auth_state(AuthState::Authenticated);
            debug!(username = config.username(), "Authentication successful");
            Ok(())
        }
        Err(err @ AutoskopeError::InvalidAuth(_)) => {
            session.set_auth_state(AuthState::Unauthenticated);
            warn!(username = config.username(), "Authentication failed");
            Err(err)
        }
        Err(err) => {
            warn!(
                username = config.username(),
                error = %err,
                "Connection error during authentication"
            );
            Err(err)
        }
    }
}

/// The portal signals success with an empty 200, or a 202 when it only
/// complains about the app version. Anything else it answers is a rejection,
/// except server-side failures.
fn classify_login(raw: RawResponse) -> Result<()> {
    match raw.status {
        StatusCode::ACCEPTED => {
            log_accepted_notice(&raw.body);
            Ok(())
        }
        StatusCode::OK if raw.body.trim().is_empty() => Ok(()),
        status if status.is_server_error() => Err(AutoskopeError::cannot_connect(format!(
            "Login failed with status {}",
            status.as_u16()
        ))),
        status => {
            debug!(
                status = status.as_u16(),
                body = %truncate(&raw.body, 200),
                "Login rejected"
            );
            Err(AutoskopeError::invalid_auth("Authentication failed"))
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
