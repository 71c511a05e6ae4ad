//! HTTP client for the external identity verifier.

use async_trait::async_trait;
use log::*;
use serde::Deserialize;

use crate::error::{bare_error, DomainErrorKind, Error};
use crate::store::IdentityVerifier;

/// The subject record returned by the verifier. Only the id is read.
#[derive(Debug, Deserialize)]
struct VerifiedUser {
    id: String,
}

/// Identity verifier backed by the auth service's bearer-authed user
/// endpoint: a valid token yields the subject id, anything else is 401.
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    user_url: String,
    api_key: Option<String>,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn resolve(&self, bearer_token: &str) -> Result<String, Error> {
        let mut request = self.client.get(&self.user_url).bearer_auth(bearer_token);
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Identity verifier request failed: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::UpstreamUnavailable,
            }
        })?;

        if response.status().is_success() {
            let user: VerifiedUser = response.json().await.map_err(|e| {
                warn!("Failed to parse identity verifier response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::Unauthorized,
                }
            })?;
            Ok(user.id)
        } else {
            debug!("Identity verifier rejected bearer token");
            Err(bare_error(DomainErrorKind::Unauthorized))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_returns_subject_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer good-token")
            .match_header("apikey", "anon-key")
            .with_status(200)
            .with_body(r#"{"id":"user-42","email":"u@example.test"}"#)
            .create_async()
            .await;

        let verifier =
            HttpIdentityVerifier::new(&server.url(), Some("anon-key".to_string())).unwrap();
        assert_eq!(verifier.resolve("good-token").await.unwrap(), "user-42");
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(401)
            .with_body(r#"{"error":"invalid token"}"#)
            .create_async()
            .await;

        let verifier = HttpIdentityVerifier::new(&server.url(), None).unwrap();
        let err = verifier.resolve("bad-token").await.unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::Unauthorized);
    }
}
