// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and Calendar API clients.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Token revocation on account deletion
//! - Calendar event creation and weekly listing

use crate::config::Config;
use crate::error::AppError;
use crate::models::{CalendarEvent, ListedEvent, SecretToken};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Scopes requested at login.
pub const LOGIN_SCOPES: [&str; 3] = [
    "openid",
    "email",
    crate::models::user::CALENDAR_EVENTS_SCOPE,
];

/// Build the shared HTTP client used for every outbound provider call.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed building HTTP client: {e}")))
}

/// Upper bound on a provider-reported access token lifetime.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Whether `expires_in` from a token response is a plausible lifetime.
pub(crate) fn valid_expires_in(expires_in: i64) -> bool {
    (1..=MAX_TOKEN_LIFETIME_SECS).contains(&expires_in)
}

/// Transport failures (including timeouts) are transient network errors.
pub(crate) fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Network(format!("{context}: timed out"))
    } else {
        AppError::Network(format!("{context}: {err}"))
    }
}

/// Token endpoint response for the authorization-code grant.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeExchangeResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// OAuth client for login, code exchange and revocation.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    revoke_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            revoke_url: config.google_revoke_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Consent URL. Offline access with forced consent so a refresh token is issued.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             include_granted_scopes=true&\
             prompt=consent&\
             state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&LOGIN_SCOPES.join(" ")),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<CodeExchangeResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| transport_error("Token exchange request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            if status.is_client_error() {
                return Err(AppError::BadRequest(
                    "Authorization code was rejected".to_string(),
                ));
            }
            return Err(AppError::Network(format!(
                "Token exchange failed with status {status}"
            )));
        }

        let tokens: CodeExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse token response: {e}")))?;

        if !valid_expires_in(tokens.expires_in) {
            return Err(AppError::Network(format!(
                "Token exchange returned implausible expires_in {}",
                tokens.expires_in
            )));
        }

        Ok(tokens)
    }

    /// Revoke a token so the app disappears from the user's Google account.
    pub async fn revoke(&self, token: &SecretToken) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token.expose())])
            .send()
            .await
            .map_err(|e| transport_error("Revocation request failed", e))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Revocation returned status {}",
                response.status()
            )));
        }

        tracing::info!("Google token revoked");
        Ok(())
    }
}

/// Calendar API client (primary calendar).
#[derive(Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ListedEvent>,
}

impl CalendarClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.calendar_api_url.clone(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    /// Create one event. Any non-success status is an error.
    pub async fn create_event(
        &self,
        access_token: &SecretToken,
        event: &CalendarEvent,
    ) -> Result<Option<String>, AppError> {
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token.expose())
            .json(event)
            .send()
            .await
            .map_err(|e| transport_error("Event creation request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!("HTTP {status}: {body}")));
        }

        // The id is informational; a success status is what counts.
        let created: Option<CreatedEvent> = response.json().await.ok();
        Ok(created.and_then(|c| c.id))
    }

    /// List single events in `[from, to)` ordered by start time.
    pub async fn list_events(
        &self,
        access_token: &SecretToken,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ListedEvent>, AppError> {
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(access_token.expose())
            .query(&[
                ("timeMin", crate::time_utils::format_utc_rfc3339(from)),
                ("timeMax", crate::time_utils::format_utc_rfc3339(to)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error("Event list request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!("HTTP {status}: {body}")));
        }

        let list: EventList = response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("JSON parse error: {e}")))?;
        Ok(list.items)
    }
}
