//! Controller for the database notification webhook.
//!
//! The database fires a row-change webhook at this endpoint whenever a
//! notification row is inserted; the handler fans the notification out to
//! the recipient's devices.

use crate::{AppState, Error};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde_json::json;

use domain::push::{self, DispatchOutcome, WebhookEvent};

/// POST /webhooks/notifications
///
/// Handles row-change webhook events for the notifications table. Events
/// for other tables or operations are acknowledged without action so the
/// trigger configuration can stay broad.
#[utoipa::path(
    post,
    path = "/webhooks/notifications",
    responses(
        (status = 200, description = "Event processed; body reports the dispatch outcome"),
        (status = 400, description = "Malformed webhook payload"),
        (status = 500, description = "Push delivery is not configured"),
        (status = 502, description = "Messaging provider unavailable"),
    )
)]
pub async fn notifications_webhook(
    State(app_state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "Received {} webhook for table {}",
        event.event_type, event.table
    );

    let outcome = push::dispatch_notification(
        app_state.deps.preferences.as_ref(),
        app_state.deps.device_tokens.as_ref(),
        &app_state.config,
        event,
    )
    .await?;

    let body = match outcome {
        DispatchOutcome::Received => json!({ "received": true }),
        DispatchOutcome::Skipped(reason) => json!({ "skipped": true, "reason": reason }),
        DispatchOutcome::Sent { sent, total } => json!({ "sent": sent, "total": total }),
    };

    Ok(Json(body))
}
