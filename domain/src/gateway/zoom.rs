//! Zoom OAuth API client.
//!
//! This module provides an HTTP client for the Zoom OAuth token endpoint
//! (authorization-code exchange and refresh-token rotation) and the Zoom
//! profile endpoint used to read the linked account email.

use crate::error::{domain_error, DomainErrorKind, Error};
use log::*;
use serde::Deserialize;

/// OAuth token response from Zoom.
///
/// `refresh_token` and `expires_in` are optional on the wire: the refresh
/// grant may omit a rotated refresh token, and `expires_in` defaults to an
/// hour when absent. Callers enforce the stricter contract of the
/// authorization-code grant themselves.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

/// User profile from Zoom. Only the email is read.
#[derive(Debug, Deserialize)]
pub struct ZoomUserInfo {
    #[serde(default)]
    pub email: Option<String>,
}

/// Configuration for Zoom OAuth URLs.
#[derive(Debug, Clone)]
pub struct ZoomOAuthUrls {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Zoom OAuth client for token exchange, refresh, and profile lookup.
pub struct ZoomOAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    urls: ZoomOAuthUrls,
}

impl ZoomOAuthClient {
    /// Create a new Zoom OAuth client with configurable URLs.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        urls: ZoomOAuthUrls,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            urls,
        })
    }

    /// Generate the OAuth authorization URL for user consent.
    pub fn get_authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.urls.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for access and refresh tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        debug!("Exchanging Zoom OAuth code for tokens");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        self.token_request(&params).await
    }

    /// Obtain a new access token using a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        debug!("Refreshing Zoom access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        self.token_request(&params).await
    }

    /// Get the linked account profile using an access token.
    pub async fn get_user_info(&self, access_token: &str) -> Result<ZoomUserInfo, Error> {
        let response = self
            .client
            .get(&self.urls.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get Zoom user info: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::UpstreamUnavailable,
                }
            })?;

        if response.status().is_success() {
            let user_info: ZoomUserInfo = response.json().await.map_err(|e| {
                warn!("Failed to parse Zoom user info: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::InvalidTokenResponse,
                }
            })?;
            Ok(user_info)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom user info error: {}", error_text);
            Err(domain_error(
                DomainErrorKind::UpstreamUnavailable,
                &error_text,
            ))
        }
    }

    /// POST a form-encoded grant to the token endpoint with Basic client
    /// authentication, as Zoom requires for both grant types.
    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, Error> {
        let response = self
            .client
            .post(&self.urls.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| {
                warn!("Zoom token request failed: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::UpstreamUnavailable,
                }
            })?;

        if response.status().is_success() {
            let tokens: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse Zoom token response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::InvalidTokenResponse,
                }
            })?;
            info!("Zoom token grant succeeded");
            Ok(tokens)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom token grant error: {}", error_text);
            Err(domain_error(
                DomainErrorKind::UpstreamUnavailable,
                &error_text,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> ZoomOAuthClient {
        ZoomOAuthClient::new(
            "client-id",
            "client-secret",
            "https://example.test/callback",
            ZoomOAuthUrls {
                auth_url: format!("{}/oauth/authorize", server.url()),
                token_url: format!("{}/oauth/token", server.url()),
                userinfo_url: format!("{}/v2/users/me", server.url()),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let urls = ZoomOAuthUrls {
            auth_url: "https://zoom.us/oauth/authorize".to_string(),
            token_url: "https://zoom.us/oauth/token".to_string(),
            userinfo_url: "https://api.zoom.us/v2/users/me".to_string(),
        };
        let client =
            ZoomOAuthClient::new("abc", "secret", "https://example.test/cb", urls).unwrap();

        let url = client.get_authorization_url("user-42");
        assert!(url.starts_with("https://zoom.us/oauth/authorize?response_type=code"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.test%2Fcb"));
        assert!(url.contains("state=user-42"));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_authorization_code_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "abc".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"at1","refresh_token":"rt1","expires_in":3600}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let tokens = client.exchange_code("abc").await.unwrap();

        assert_eq!(tokens.access_token, "at1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt1"));
        assert_eq!(tokens.expires_in, Some(3600));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_token_tolerates_missing_rotation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"at2"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let tokens = client.refresh_token("rt1").await.unwrap();

        assert_eq!(tokens.access_token, "at2");
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.expires_in.is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_token_response_is_upstream_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"reason":"Invalid client"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.exchange_code("abc").await.unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn test_get_user_info_reads_email() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/users/me")
            .match_header("authorization", "Bearer at1")
            .with_status(200)
            .with_body(r#"{"id":"z1","email":"host@example.test"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let info = client.get_user_info("at1").await.unwrap();
        assert_eq!(info.email.as_deref(), Some("host@example.test"));
    }
}
