//! Error types for the `domain` layer.
//!
//! Modeled as a root `Error` struct holding an `error_kind` that categorizes
//! the failure and an optional `source` for error chaining. The `web` layer
//! maps each kind to an HTTP status code and a JSON body; the OAuth callback
//! flow maps them onto redirect query codes instead.

use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// The categories of failure this subsystem distinguishes.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// Missing or invalid bearer token.
    Unauthorized,
    /// Authenticated but not allowed to perform the operation.
    Forbidden,
    /// A required request field is missing or malformed.
    BadRequest(String),
    /// A third-party endpoint returned non-2xx or the call failed outright.
    UpstreamUnavailable,
    /// A required secret is absent from configuration.
    MissingCredentials,
    /// An upstream 2xx response was missing contractually required fields.
    InvalidTokenResponse,
    /// A store write failed.
    PersistenceFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            DomainErrorKind::Unauthorized => write!(f, "unauthorized"),
            DomainErrorKind::Forbidden => write!(f, "forbidden"),
            DomainErrorKind::BadRequest(field) => write!(f, "bad request: {field}"),
            DomainErrorKind::UpstreamUnavailable => write!(f, "upstream unavailable"),
            DomainErrorKind::MissingCredentials => write!(f, "missing credentials"),
            DomainErrorKind::InvalidTokenResponse => write!(f, "invalid token response"),
            DomainErrorKind::PersistenceFailure => write!(f, "persistence failure"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Builder errors occur before any network call is made and indicate
        // a configuration problem rather than an upstream one.
        let error_kind = if err.is_builder() {
            DomainErrorKind::MissingCredentials
        } else {
            DomainErrorKind::UpstreamUnavailable
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        // Signing only fails when the configured key material is unusable.
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::MissingCredentials,
        }
    }
}

/// Helper function to create an error with a detail message.
pub fn domain_error(kind: DomainErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: kind,
    }
}

/// Helper function to create an error without a source.
pub fn bare_error(kind: DomainErrorKind) -> Error {
    Error {
        source: None,
        error_kind: kind,
    }
}
