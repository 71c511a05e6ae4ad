//! Controller for the Zoom OAuth connection flow.
//!
//! Note: the callback endpoint is reached via Zoom's browser redirect, so
//! it carries no bearer token and must never answer with an error status;
//! every outcome becomes a redirect onto the application deep link.

use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde_json::json;

use domain::zoom_connection::{self, CallbackParams};

/// GET /oauth/zoom/authorize
///
/// Returns the Zoom consent URL for the authenticated user. The client
/// opens it in a browser; the user's id travels as the OAuth state.
#[utoipa::path(
    get,
    path = "/oauth/zoom/authorize",
    responses(
        (status = 200, description = "Zoom authorization URL for the caller"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Zoom OAuth is not configured"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn authorize(
    AuthenticatedUser(subject_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let auth_url = zoom_connection::authorize_url(&app_state.config, &subject_id)?;
    Ok(Json(json!({ "auth_url": auth_url })))
}

/// GET /oauth/zoom/callback
///
/// Handles the OAuth redirect from Zoom after user consent.
#[utoipa::path(
    get,
    path = "/oauth/zoom/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from Zoom"),
        ("state" = Option<String>, Query, description = "User id carried through the flow"),
        ("error" = Option<String>, Query, description = "Error reported by Zoom, if consent failed"),
    ),
    responses(
        (status = 302, description = "Redirect onto the application deep link"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let target = zoom_connection::handle_callback(
        app_state.deps.credentials.as_ref(),
        &app_state.config,
        params,
    )
    .await;

    Redirect::temporary(&target)
}

/// GET /integrations/zoom/status
///
/// Reports whether the caller holds a usable Zoom connection. Forces a
/// refresh when the stored token is stale, so `connected: true` means a
/// valid access token exists right now.
#[utoipa::path(
    get,
    path = "/integrations/zoom/status",
    responses(
        (status = 200, description = "Connection status for the caller"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn status(
    AuthenticatedUser(subject_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let connected = zoom_connection::get_fresh_access_token(
        app_state.deps.credentials.as_ref(),
        &app_state.config,
        &subject_id,
    )
    .await
    .is_some();

    Json(json!({ "connected": connected }))
}
