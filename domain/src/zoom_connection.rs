//! Zoom account connection lifecycle.
//!
//! Owns the authorization-code exchange performed by the OAuth callback
//! and the refresh-token rotation behind `get_fresh_access_token`. The
//! callback flow never surfaces an error status: whatever happens, the
//! user's browser is redirected back onto the application deep link with
//! either `?success=1` or `?error=<code>`.

use chrono::{Duration, Utc};
use log::*;
use serde::Deserialize;
use service::config::Config;

use crate::credential::CredentialRecord;
use crate::error::{bare_error, DomainErrorKind, Error};
use crate::gateway::zoom::{ZoomOAuthClient, ZoomOAuthUrls};
use crate::redact::mask_tokens;
use crate::store::CredentialStore;

/// Token lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Query parameters arriving on the OAuth callback redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Failure codes carried back to the application as `?error=<code>`.
#[derive(Debug, PartialEq)]
pub enum CallbackError {
    MissingCodeOrState,
    ZoomNotConfigured,
    RedirectUriNotConfigured,
    TokenExchangeFailed,
    InvalidTokenResponse,
    ServerConfigError,
    DbSaveFailed,
    /// Raw error string for uncategorized failures, including the
    /// provider's own `error` query parameter.
    Other(String),
}

impl CallbackError {
    pub fn as_code(&self) -> &str {
        match self {
            CallbackError::MissingCodeOrState => "missing_code_or_state",
            CallbackError::ZoomNotConfigured => "zoom_not_configured",
            CallbackError::RedirectUriNotConfigured => "redirect_uri_not_configured",
            CallbackError::TokenExchangeFailed => "token_exchange_failed",
            CallbackError::InvalidTokenResponse => "invalid_token_response",
            CallbackError::ServerConfigError => "server_config_error",
            CallbackError::DbSaveFailed => "db_save_failed",
            CallbackError::Other(raw) => raw,
        }
    }
}

fn zoom_urls(config: &Config) -> ZoomOAuthUrls {
    ZoomOAuthUrls {
        auth_url: config.zoom_auth_url().to_string(),
        token_url: config.zoom_token_url().to_string(),
        userinfo_url: config.zoom_userinfo_url().to_string(),
    }
}

/// Build the Zoom OAuth authorization URL for a subject.
///
/// The subject id travels as the OAuth `state` parameter and comes back
/// on the callback to key the stored credential record.
pub fn authorize_url(config: &Config, subject_id: &str) -> Result<String, Error> {
    let client_id = config.zoom_client_id().ok_or_else(|| {
        warn!("Zoom OAuth is not configured (client id missing)");
        bare_error(DomainErrorKind::MissingCredentials)
    })?;

    let redirect_uri = config.zoom_redirect_uri().ok_or_else(|| {
        warn!("Zoom OAuth is not configured (redirect URI missing)");
        bare_error(DomainErrorKind::MissingCredentials)
    })?;

    // The client secret plays no part in building the consent URL.
    let client = ZoomOAuthClient::new(&client_id, "", &redirect_uri, zoom_urls(config))?;

    info!("Redirecting subject {} to Zoom OAuth consent", subject_id);
    Ok(client.get_authorization_url(subject_id))
}

/// Handle the OAuth callback redirect: exchange the code, persist the
/// credential record, and return the deep-link target the browser should
/// be redirected to. Never fails; failures become `?error=<code>`.
pub async fn handle_callback(
    store: &dyn CredentialStore,
    config: &Config,
    params: CallbackParams,
) -> String {
    let app_redirect = config.app_redirect_uri();

    let target = match exchange_and_store(store, config, &params).await {
        Ok(()) => format!("{}?success=1", app_redirect),
        Err(code) => format!(
            "{}?error={}",
            app_redirect,
            urlencoding::encode(code.as_code())
        ),
    };

    info!("OAuth callback redirecting to {}", mask_tokens(&target));
    target
}

async fn exchange_and_store(
    store: &dyn CredentialStore,
    config: &Config,
    params: &CallbackParams,
) -> Result<(), CallbackError> {
    if let Some(provider_error) = &params.error {
        warn!("Zoom OAuth consent returned an error");
        return Err(CallbackError::Other(provider_error.clone()));
    }

    let (code, subject_id) = match (&params.code, &params.state) {
        (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => (code, state),
        _ => return Err(CallbackError::MissingCodeOrState),
    };

    let client_id = config
        .zoom_client_id()
        .ok_or(CallbackError::ZoomNotConfigured)?;
    let client_secret = config
        .zoom_client_secret()
        .ok_or(CallbackError::ZoomNotConfigured)?;
    let redirect_uri = config
        .zoom_redirect_uri()
        .ok_or(CallbackError::RedirectUriNotConfigured)?;

    // The deep link must carry a scheme or the final redirect would be
    // interpreted as a relative path.
    if !config.app_redirect_uri().contains("://") {
        return Err(CallbackError::ServerConfigError);
    }

    let client = ZoomOAuthClient::new(&client_id, &client_secret, &redirect_uri, zoom_urls(config))
        .map_err(|e| {
            warn!("Failed to build Zoom OAuth client: {:?}", e);
            CallbackError::ServerConfigError
        })?;

    let tokens = client.exchange_code(code).await.map_err(|e| {
        warn!(
            "Zoom token exchange failed for subject {}: {:?}",
            subject_id, e
        );
        match e.error_kind {
            DomainErrorKind::InvalidTokenResponse => CallbackError::InvalidTokenResponse,
            _ => CallbackError::TokenExchangeFailed,
        }
    })?;

    // This grant type is contractually required to return a refresh token;
    // without one, future renewal is impossible, so nothing is persisted.
    let refresh_token = tokens
        .refresh_token
        .ok_or(CallbackError::InvalidTokenResponse)?;

    // Best effort: the linked account email improves the settings UI but
    // a profile fetch failure must not fail the connection.
    let linked_account_label = match client.get_user_info(&tokens.access_token).await {
        Ok(info) => info.email,
        Err(e) => {
            warn!("Failed to fetch Zoom profile for label: {:?}", e);
            None
        }
    };

    let expires_in = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    let record = CredentialRecord {
        subject_id: subject_id.clone(),
        access_token: tokens.access_token,
        refresh_token,
        expires_at: Utc::now() + Duration::seconds(expires_in),
        linked_account_label,
    };

    store.upsert(record).await.map_err(|e| {
        warn!(
            "Failed to persist Zoom credentials for subject {}: {:?}",
            subject_id, e
        );
        CallbackError::DbSaveFailed
    })?;

    info!("Stored Zoom credentials for subject {}", subject_id);
    Ok(())
}

/// Get an access token valid for at least the safety margin, or `None`.
///
/// The fast path returns the stored token without any network call when
/// it is comfortably inside its lifetime. Otherwise one refresh exchange
/// runs; the stored record is overwritten with the rotated tokens (the
/// old refresh token is kept when the provider does not rotate it).
///
/// `None` uniformly means "re-authorization required" — callers must not
/// distinguish "never connected" from "refresh failed", both need the
/// same user action.
pub async fn get_fresh_access_token(
    store: &dyn CredentialStore,
    config: &Config,
    subject_id: &str,
) -> Option<String> {
    let record = match store.get(subject_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!("No Zoom credentials stored for subject {}", subject_id);
            return None;
        }
        Err(e) => {
            warn!("Credential lookup failed for subject {}: {:?}", subject_id, e);
            return None;
        }
    };

    if !record.needs_refresh() {
        return Some(record.access_token);
    }

    debug!("Zoom token for subject {} is stale, refreshing", subject_id);

    let client_id = config.zoom_client_id()?;
    let client_secret = config.zoom_client_secret()?;
    let redirect_uri = config.zoom_redirect_uri().unwrap_or_default();

    let client =
        ZoomOAuthClient::new(&client_id, &client_secret, &redirect_uri, zoom_urls(config)).ok()?;

    let tokens = match client.refresh_token(&record.refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("Zoom token refresh failed for subject {}: {:?}", subject_id, e);
            return None;
        }
    };

    let expires_in = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    let refreshed = CredentialRecord {
        subject_id: record.subject_id,
        access_token: tokens.access_token.clone(),
        // Providers may not rotate the refresh token on every exchange.
        refresh_token: tokens.refresh_token.unwrap_or(record.refresh_token),
        expires_at: Utc::now() + Duration::seconds(expires_in),
        linked_account_label: record.linked_account_label,
    };

    // The refreshed token is valid regardless of whether the write lands;
    // a failed upsert only costs an extra refresh on the next call.
    if let Err(e) = store.upsert(refreshed).await {
        warn!(
            "Failed to persist refreshed Zoom credentials for subject {}: {:?}",
            subject_id, e
        );
    }

    Some(tokens.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCredentialStore;
    use mockito::Matcher;

    fn config_for(server: &mockito::ServerGuard) -> Config {
        Config::default()
            .set_zoom_client_id("client-id".to_string())
            .set_zoom_client_secret("client-secret".to_string())
            .set_zoom_redirect_uri("https://api.example.test/oauth/zoom/callback".to_string())
            .set_zoom_token_url(format!("{}/oauth/token", server.url()))
            .set_zoom_userinfo_url(format!("{}/v2/users/me", server.url()))
    }

    fn callback(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: None,
        }
    }

    fn stored(subject_id: &str, expires_in: chrono::Duration) -> CredentialRecord {
        CredentialRecord {
            subject_id: subject_id.to_string(),
            access_token: "at1".to_string(),
            refresh_token: "rt1".to_string(),
            expires_at: Utc::now() + expires_in,
            linked_account_label: Some("host@example.test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_callback_exchanges_code_and_stores_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "authorization_code".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"at1","refresh_token":"rt1","expires_in":3600}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v2/users/me")
            .with_status(200)
            .with_body(r#"{"email":"host@example.test"}"#)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        let config = config_for(&server);

        let target = handle_callback(&store, &config, callback(Some("abc"), Some("user-42"))).await;
        assert_eq!(target, "cotrainr://video/zoom-connected?success=1");

        let record = store.get("user-42").await.unwrap().unwrap();
        assert_eq!(record.access_token, "at1");
        assert_eq!(record.refresh_token, "rt1");
        assert_eq!(
            record.linked_account_label.as_deref(),
            Some("host@example.test")
        );
        let remaining = record.time_until_expiry().num_seconds();
        assert!((3590..=3600).contains(&remaining));
    }

    #[tokio::test]
    async fn test_callback_profile_failure_is_non_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at1","refresh_token":"rt1","expires_in":3600}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v2/users/me")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        let config = config_for(&server);

        let target = handle_callback(&store, &config, callback(Some("abc"), Some("user-42"))).await;
        assert!(target.ends_with("?success=1"));

        let record = store.get("user-42").await.unwrap().unwrap();
        assert!(record.linked_account_label.is_none());
    }

    #[tokio::test]
    async fn test_callback_without_refresh_token_persists_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at1","expires_in":3600}"#)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        let config = config_for(&server);

        let target = handle_callback(&store, &config, callback(Some("abc"), Some("user-42"))).await;
        assert!(target.ends_with("?error=invalid_token_response"));
        assert!(store.get("user-42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_callback_missing_code_or_state() {
        let store = InMemoryCredentialStore::new();
        let config = Config::default();

        let target = handle_callback(&store, &config, callback(None, Some("user-42"))).await;
        assert!(target.ends_with("?error=missing_code_or_state"));

        let target = handle_callback(&store, &config, callback(Some("abc"), None)).await;
        assert!(target.ends_with("?error=missing_code_or_state"));
    }

    #[tokio::test]
    async fn test_callback_passes_through_provider_error() {
        let store = InMemoryCredentialStore::new();
        let config = Config::default();

        let params = CallbackParams {
            code: None,
            state: None,
            error: Some("access_denied".to_string()),
        };
        let target = handle_callback(&store, &config, params).await;
        assert!(target.ends_with("?error=access_denied"));
    }

    #[tokio::test]
    async fn test_callback_without_client_credentials() {
        let store = InMemoryCredentialStore::new();
        let config = Config::default();

        let target = handle_callback(&store, &config, callback(Some("abc"), Some("user-42"))).await;
        assert!(target.ends_with("?error=zoom_not_configured"));
    }

    #[tokio::test]
    async fn test_failed_exchange_redirects_with_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"reason":"Invalid authorization code"}"#)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        let config = config_for(&server);

        let target = handle_callback(&store, &config, callback(Some("bad"), Some("user-42"))).await;
        assert!(target.ends_with("?error=token_exchange_failed"));
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_without_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .expect(0)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        store
            .upsert(stored("user-42", chrono::Duration::hours(1)))
            .await
            .unwrap();
        let config = config_for(&server);

        let token = get_fresh_access_token(&store, &config, "user-42").await;
        assert_eq!(token.as_deref(), Some("at1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_token_triggers_exactly_one_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"at2","refresh_token":"rt2","expires_in":1800}"#)
            .expect(1)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        store
            .upsert(stored("user-42", chrono::Duration::minutes(2)))
            .await
            .unwrap();
        let config = config_for(&server);

        let token = get_fresh_access_token(&store, &config, "user-42").await;
        assert_eq!(token.as_deref(), Some("at2"));
        mock.assert_async().await;

        let record = store.get("user-42").await.unwrap().unwrap();
        assert_eq!(record.access_token, "at2");
        assert_eq!(record.refresh_token, "rt2");
        let remaining = record.time_until_expiry().num_seconds();
        assert!((1790..=1800).contains(&remaining));
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_keeps_old_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at2"}"#)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        store
            .upsert(stored("user-42", chrono::Duration::minutes(-10)))
            .await
            .unwrap();
        let config = config_for(&server);

        let token = get_fresh_access_token(&store, &config, "user-42").await;
        assert_eq!(token.as_deref(), Some("at2"));

        let record = store.get("user-42").await.unwrap().unwrap();
        assert_eq!(record.refresh_token, "rt1");
        // Default lifetime applies when the provider omits expires_in.
        let remaining = record.time_until_expiry().num_seconds();
        assert!((3590..=3600).contains(&remaining));
    }

    #[tokio::test]
    async fn test_failed_refresh_returns_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"reason":"Invalid refresh token"}"#)
            .create_async()
            .await;

        let store = InMemoryCredentialStore::new();
        store
            .upsert(stored("user-42", chrono::Duration::minutes(-10)))
            .await
            .unwrap();
        let config = config_for(&server);

        assert!(get_fresh_access_token(&store, &config, "user-42")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_subject_returns_none() {
        let store = InMemoryCredentialStore::new();
        let config = Config::default();

        assert!(get_fresh_access_token(&store, &config, "nobody")
            .await
            .is_none());
    }

    #[test]
    fn test_authorize_url_requires_configuration() {
        let config = Config::default();
        let err = authorize_url(&config, "user-42").unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::MissingCredentials);
    }

    #[test]
    fn test_authorize_url_carries_subject_as_state() {
        let config = Config::default()
            .set_zoom_client_id("client-id".to_string())
            .set_zoom_redirect_uri("https://api.example.test/cb".to_string());

        let url = authorize_url(&config, "user-42").unwrap();
        assert!(url.contains("state=user-42"));
        assert!(url.contains("client_id=client-id"));
    }
}
