use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use log::*;
use serde_json::json;

use crate::extractors::RejectionType;
use crate::AppState;

/// Extracts the subject id authenticated by the request's bearer token.
///
/// The raw token is handed to the configured identity verifier; a missing
/// header, a non-bearer scheme, or a rejected token all produce the same
/// 401 so callers cannot probe which check failed.
pub(crate) struct AuthenticatedUser(pub String);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
        };

        let bearer_token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthorized)?;

        match state.deps.verifier.resolve(bearer_token).await {
            Ok(subject_id) => Ok(AuthenticatedUser(subject_id)),
            Err(e) => {
                debug!("Bearer token rejected: {:?}", e);
                Err(unauthorized())
            }
        }
    }
}
