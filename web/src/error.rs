use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

use domain::error::{DomainErrorKind, Error as DomainError};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Full detail (with the source chain) goes to the log only; the
        // response body carries a generic message so upstream error text
        // and credentials never reach clients.
        warn!("Request failed: {:?}", self.0);

        let (status, message) = match self.0.error_kind {
            DomainErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            DomainErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            DomainErrorKind::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            DomainErrorKind::UpstreamUnavailable => (
                StatusCode::BAD_GATEWAY,
                "upstream service unavailable".to_string(),
            ),
            DomainErrorKind::InvalidTokenResponse => (
                StatusCode::BAD_GATEWAY,
                "invalid upstream token response".to_string(),
            ),
            DomainErrorKind::MissingCredentials => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server is not configured for this operation".to_string(),
            ),
            DomainErrorKind::PersistenceFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to persist data".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
