//! Stored third-party credential records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long before expiry an access token is treated as stale.
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// One user's linked Zoom account credentials.
///
/// At most one live record exists per subject; writing a new record
/// overwrites the prior one via the store's atomic upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Opaque identifier of the owning user, unique key in the store.
    pub subject_id: String,
    /// Short-lived bearer token for provider API calls.
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens; rotates on use.
    pub refresh_token: String,
    /// Absolute instant after which `access_token` is invalid.
    pub expires_at: DateTime<Utc>,
    /// Display label of the linked account (e.g. its email), if known.
    pub linked_account_label: Option<String>,
}

impl CredentialRecord {
    /// Check if the access token is expired or about to expire soon.
    ///
    /// Returns true if the token is expired or will expire within the
    /// 5-minute safety margin, meaning a refresh exchange is required
    /// before the token can be handed to a caller.
    pub fn needs_refresh(&self) -> bool {
        let margin = Duration::minutes(REFRESH_MARGIN_MINUTES);
        self.expires_at <= Utc::now() + margin
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}
