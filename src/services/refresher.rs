// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Renewal of Google access tokens through the refresh-token grant.
//!
//! Stateless: the caller persists the result. No retries happen here.

use crate::config::Config;
use crate::error::AppError;
use crate::models::SecretToken;
use crate::services::google::valid_expires_in;
use serde::Deserialize;

/// Why a refresh attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The provider rejected the refresh token (revoked or expired).
    /// Only a full re-consent recovers from this.
    #[error("refresh token denied: {0}")]
    Denied(String),

    /// Transport failure, timeout or provider-side error. Safe to retry later.
    #[error("token endpoint unreachable: {0}")]
    Network(String),
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Denied(msg) => AppError::RefreshDenied(msg),
            RefreshError::Network(msg) => AppError::Network(msg),
        }
    }
}

/// A renewed access token.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: SecretToken,
    pub expires_in_seconds: i64,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the provider token endpoint.
#[derive(Clone)]
pub struct CredentialRefresher {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl CredentialRefresher {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            token_url: config.google_token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        }
    }

    /// Exchange `refresh_token` for a new access token.
    pub async fn refresh(&self, refresh_token: &SecretToken) -> Result<RefreshedAccess, RefreshError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.expose()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RefreshError::Network("token refresh timed out".to_string())
                } else {
                    RefreshError::Network(format!("token refresh request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<OAuthErrorBody>(&body)
                .map(|b| match b.error_description {
                    Some(desc) => format!("{}: {desc}", b.error),
                    None => b.error,
                })
                .unwrap_or_else(|_| format!("HTTP {status}"));

            // Google answers 400 invalid_grant for revoked/expired refresh tokens
            // and 401 invalid_client for bad app credentials.
            if matches!(status.as_u16(), 400 | 401 | 403) {
                return Err(RefreshError::Denied(reason));
            }
            return Err(RefreshError::Network(reason));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::Network(format!("invalid refresh response: {e}")))?;

        if !valid_expires_in(parsed.expires_in) {
            return Err(RefreshError::Network(format!(
                "implausible expires_in {}",
                parsed.expires_in
            )));
        }

        Ok(RefreshedAccess {
            access_token: SecretToken::new(parsed.access_token),
            expires_in_seconds: parsed.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refresher(server: &MockServer) -> CredentialRefresher {
        let config = Config::test_default().with_provider_base(&server.uri());
        CredentialRefresher::new(&config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=1%2F%2Fstored"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.new",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refreshed = refresher(&server)
            .refresh(&SecretToken::new("1//stored"))
            .await
            .unwrap();
        assert_eq!(refreshed.access_token.expose(), "ya29.new");
        assert_eq!(refreshed.expires_in_seconds, 3599);
    }

    #[tokio::test]
    async fn test_invalid_grant_is_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let err = refresher(&server)
            .refresh(&SecretToken::new("revoked"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RefreshError::Denied("invalid_grant: Token has been expired or revoked.".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = refresher(&server)
            .refresh(&SecretToken::new("r"))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Network(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_millis(500))
                    .set_body_json(json!({"access_token": "late", "expires_in": 3600})),
            )
            .mount(&server)
            .await;

        let config = Config::test_default().with_provider_base(&server.uri());
        let http = crate::services::google::http_client(std::time::Duration::from_millis(100)).unwrap();
        let err = CredentialRefresher::new(&config, http)
            .refresh(&SecretToken::new("r"))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Network(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_is_network() {
        for expires_in in [i64::MAX, 0, -30] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": "ya29.odd",
                    "expires_in": expires_in
                })))
                .mount(&server)
                .await;

            let err = refresher(&server)
                .refresh(&SecretToken::new("r"))
                .await
                .unwrap_err();
            assert!(matches!(err, RefreshError::Network(_)), "{expires_in}");
        }
    }

    #[test]
    fn test_maps_into_app_error() {
        assert!(matches!(
            AppError::from(RefreshError::Denied("x".into())),
            AppError::RefreshDenied(_)
        ));
        assert!(matches!(
            AppError::from(RefreshError::Network("x".into())),
            AppError::Network(_)
        ));
    }
}
