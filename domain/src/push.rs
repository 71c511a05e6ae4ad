//! Push notification dispatch.
//!
//! Consumes database webhook events for newly inserted notification rows
//! and fans them out to every device token registered to the recipient.
//! One FCM access token is minted per batch; individual device failures
//! are counted, never fatal.

use std::collections::BTreeMap;

use log::*;
use serde::Deserialize;
use service::config::Config;

use crate::error::{domain_error, DomainErrorKind, Error};
use crate::gateway::fcm::{FcmClient, FcmCredentials, FcmUrls, Notification};
use crate::store::{DeviceTokenStore, NotificationPreferenceStore};

/// A database webhook event as delivered by the row-change trigger.
///
/// Fields beyond the dispatch decision (`schema`, `old_record`) are
/// accepted and ignored so trigger payload changes stay non-breaking.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub table: String,
    pub record: Option<NotificationRecord>,
    #[serde(default)]
    pub schema: Option<String>,
}

/// The inserted notification row carried in the webhook payload.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

/// What happened to a webhook event.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Event acknowledged but not a notification insert.
    Received,
    /// Notification insert that needed no delivery.
    Skipped(&'static str),
    /// Delivery attempted; `sent` of `total` devices accepted the message.
    Sent { sent: usize, total: usize },
}

/// Flatten the notification's data payload into the string-to-string map
/// FCM requires. JSON strings pass through unquoted, other values keep
/// their JSON rendering, nulls are dropped. The notification kind and row
/// id are always present for client-side routing.
fn message_data(record: &NotificationRecord) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();

    if let Some(serde_json::Value::Object(map)) = &record.data {
        for (key, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    data.insert(key.clone(), s.clone());
                }
                other => {
                    data.insert(key.clone(), other.to_string());
                }
            }
        }
    }

    data.insert("type".to_string(), record.kind.clone());
    data.insert("notification_id".to_string(), record.id.clone());
    data
}

/// Dispatch one webhook event.
///
/// Non-matching events are acknowledged as [`DispatchOutcome::Received`].
/// A disabled push preference or an empty device list short-circuits
/// before any credential minting or provider traffic. Otherwise a single
/// access token is fetched and each device gets one send attempt.
pub async fn dispatch_notification(
    preferences: &dyn NotificationPreferenceStore,
    devices: &dyn DeviceTokenStore,
    config: &Config,
    event: WebhookEvent,
) -> Result<DispatchOutcome, Error> {
    if event.event_type != "INSERT" || event.table != "notifications" {
        debug!(
            "Ignoring webhook event {} on table {}",
            event.event_type, event.table
        );
        return Ok(DispatchOutcome::Received);
    }

    let record = event.record.ok_or_else(|| {
        domain_error(
            DomainErrorKind::BadRequest("webhook event carries no record".to_string()),
            "notification insert without record payload",
        )
    })?;

    if preferences.push_enabled(&record.user_id).await? == Some(false) {
        info!("Push disabled for user {}, skipping", record.user_id);
        return Ok(DispatchOutcome::Skipped("push disabled"));
    }

    let device_tokens = devices.list_by_user(&record.user_id).await?;
    if device_tokens.is_empty() {
        info!("No device tokens for user {}, skipping", record.user_id);
        return Ok(DispatchOutcome::Skipped("no device tokens"));
    }

    let credentials = FcmCredentials::from_config(config)?;
    let fcm = FcmClient::new(credentials, FcmUrls::from_config(config))?;
    let access_token = fcm.fetch_access_token().await?;

    let notification = Notification {
        title: record.title.clone(),
        body: record.body.clone(),
    };
    let data = message_data(&record);

    let total = device_tokens.len();
    let mut sent = 0;
    for device_token in &device_tokens {
        match fcm
            .send_message(&access_token, device_token, &notification, &data)
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(
                    "Push delivery failed for one device of user {}: {:?}",
                    record.user_id, e
                );
            }
        }
    }

    info!(
        "Dispatched notification {} to {}/{} devices of user {}",
        record.id, sent, total, record.user_id
    );
    Ok(DispatchOutcome::Sent { sent, total })
}
