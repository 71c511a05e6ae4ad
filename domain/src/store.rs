//! Abstractions over the external durable store and identity verifier.
//!
//! The backend treats persistence and identity as collaborators reached
//! through these traits; request handlers receive trait objects so tests
//! can substitute fakes without process-level environment mutation. The
//! in-memory implementations below back both the unit tests and the
//! binary's default wiring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::credential::CredentialRecord;
use crate::error::{bare_error, DomainErrorKind, Error};

/// Keyed storage of third-party credential records, one per subject.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential record for a subject, if one exists.
    async fn get(&self, subject_id: &str) -> Result<Option<CredentialRecord>, Error>;

    /// Write a record, atomically replacing any prior record for the same
    /// subject. Concurrent writers race last-write-wins; both hold valid
    /// tokens so no coordination is needed here.
    async fn upsert(&self, record: CredentialRecord) -> Result<(), Error>;
}

/// Lookup of the device tokens registered to a subject.
#[async_trait]
pub trait DeviceTokenStore: Send + Sync {
    async fn list_by_user(&self, subject_id: &str) -> Result<Vec<String>, Error>;
}

/// Lookup of a subject's push notification preference.
#[async_trait]
pub trait NotificationPreferenceStore: Send + Sync {
    /// `None` means no stored preference, which is treated as enabled.
    async fn push_enabled(&self, subject_id: &str) -> Result<Option<bool>, Error>;
}

/// Resolves a bearer token to the subject it authenticates.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the subject id, or `Unauthorized` when the token is
    /// missing, malformed, or rejected by the verifier.
    async fn resolve(&self, bearer_token: &str) -> Result<String, Error>;
}

/// In-memory credential store keyed by subject id.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, subject_id: &str) -> Result<Option<CredentialRecord>, Error> {
        let records = self.records.lock().await;
        Ok(records.get(subject_id).cloned())
    }

    async fn upsert(&self, record: CredentialRecord) -> Result<(), Error> {
        let mut records = self.records.lock().await;
        records.insert(record.subject_id.clone(), record);
        Ok(())
    }
}

/// In-memory device token registry.
#[derive(Default)]
pub struct InMemoryDeviceTokenStore {
    tokens: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryDeviceTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, subject_id: &str, device_token: &str) {
        let mut tokens = self.tokens.lock().await;
        tokens
            .entry(subject_id.to_string())
            .or_default()
            .push(device_token.to_string());
    }
}

#[async_trait]
impl DeviceTokenStore for InMemoryDeviceTokenStore {
    async fn list_by_user(&self, subject_id: &str) -> Result<Vec<String>, Error> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.get(subject_id).cloned().unwrap_or_default())
    }
}

/// In-memory notification preference table.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    preferences: Mutex<HashMap<String, bool>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_push_enabled(&self, subject_id: &str, enabled: bool) {
        let mut preferences = self.preferences.lock().await;
        preferences.insert(subject_id.to_string(), enabled);
    }
}

#[async_trait]
impl NotificationPreferenceStore for InMemoryPreferenceStore {
    async fn push_enabled(&self, subject_id: &str) -> Result<Option<bool>, Error> {
        let preferences = self.preferences.lock().await;
        Ok(preferences.get(subject_id).copied())
    }
}

/// Static token-to-subject mapping, used in tests and as the development
/// fallback when no external identity verifier is configured.
#[derive(Default)]
pub struct StaticIdentityVerifier {
    subjects: Mutex<HashMap<String, String>>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, bearer_token: &str, subject_id: &str) {
        let mut subjects = self.subjects.lock().await;
        subjects.insert(bearer_token.to_string(), subject_id.to_string());
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn resolve(&self, bearer_token: &str) -> Result<String, Error> {
        let subjects = self.subjects.lock().await;
        subjects
            .get(bearer_token)
            .cloned()
            .ok_or_else(|| bare_error(DomainErrorKind::Unauthorized))
    }
}

/// Bundle of the stores and verifier a request handler depends on.
///
/// Cloning is cheap; all members are shared behind `Arc`.
#[derive(Clone)]
pub struct Dependencies {
    pub credentials: Arc<dyn CredentialStore>,
    pub device_tokens: Arc<dyn DeviceTokenStore>,
    pub preferences: Arc<dyn NotificationPreferenceStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl Dependencies {
    /// All-in-memory wiring, used by tests and development runs.
    pub fn in_memory() -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::new()),
            device_tokens: Arc::new(InMemoryDeviceTokenStore::new()),
            preferences: Arc::new(InMemoryPreferenceStore::new()),
            verifier: Arc::new(StaticIdentityVerifier::new()),
        }
    }
}
