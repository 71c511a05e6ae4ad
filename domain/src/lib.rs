//! Business logic for the cotrainr backend: third-party credential
//! lifecycle (Zoom OAuth) and signed push delivery (FCM).
//!
//! The `web` crate builds its handlers on top of the operations exposed
//! here; everything that talks to the outside world lives behind either a
//! gateway client (`gateway`) or a store trait (`store`) so that tests can
//! substitute fakes without touching process state.

pub mod credential;
pub mod error;
pub mod push;
pub mod redact;
pub mod store;
pub mod zoom_connection;

pub mod gateway;

pub use error::{DomainErrorKind, Error};
