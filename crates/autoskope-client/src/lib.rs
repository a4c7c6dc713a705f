//! Autoskope Client Library
//!
//! Async client for the Autoskope vehicle-tracking portal: logs in with
//! account credentials, keeps the cookie-based session, and fetches vehicles
//! with their last known GeoJSON position decoded into typed records.
//!
//! # Example
//!
//! ```rust,no_run
//! use autoskope_client::{AutoskopeClient, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TransportConfig::new("https://portal.autoskope.de", "user", "secret")?;
//!     let mut client = AutoskopeClient::new(config);
//!
//!     // The session is closed when `session` goes out of scope
//!     let mut session = client.connect()?;
//!     session.login().await?;
//!
//!     for vehicle in session.fetch_vehicles().await? {
//!         match &vehicle.position {
//!             Some(pos) => println!("{}: {}, {}", vehicle.name, pos.latitude, pos.longitude),
//!             None => println!("{}: no position", vehicle.name),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Operations fail with one of two kinds, [`AutoskopeError::CannotConnect`]
//! and [`AutoskopeError::InvalidAuth`]. A vehicle whose location payload is
//! malformed is still returned, just without a position.
//!
//! # Testing
//!
//! The `testing` module provides an in-process mock portal:
//!
//! ```rust,ignore
//! use autoskope_client::testing::{MockPortal, TestServer};
//!
//! let portal = MockPortal::new("user", "secret");
//! let server = TestServer::start(portal.router()).await?;
//! let mut client = server.client("user", "secret")?;
//! ```

mod auth;
mod client;
mod config;
pub mod constants;
mod error;
mod executor;
pub mod position;
mod session;
pub mod testing;
mod types;
mod vehicles;

pub use client::{AutoskopeClient, ScopedSession};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use constants::{APP_VERSION, DEFAULT_MODEL, MANUFACTURER};
pub use error::{AutoskopeError, ConfigError, Result};
pub use position::{decode_position, PositionDecodeError};
pub use session::{AuthState, Session, SessionState};
pub use types::{Position, Vehicle};
