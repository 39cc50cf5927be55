// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{delete, get},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    oauth_session_cookie, removal_cookie, session_cookie, AuthUser, OAUTH_CALLBACK_PATH,
    OAUTH_SESSION_COOKIE, SESSION_COOKIE,
};
use crate::models::user::parse_scopes;
use crate::models::{OAuthGrant, SecretToken};
use crate::AppState;

/// Public login/logout routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google/login", get(login))
        .route(OAUTH_CALLBACK_PATH, get(callback))
        .route("/auth/logout", get(logout))
}

/// Routes that need a session; the auth layer is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/delete/account", delete(delete_account))
}

/// Start the OAuth flow and redirect to Google consent.
async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<(CookieJar, Redirect)> {
    let pending = state.oauth_states.begin()?;
    let auth_url = state.google.authorization_url(&pending.state);

    tracing::info!(
        client_id = %state.config.google_client_id,
        pending_logins = state.oauth_states.len(),
        "Starting OAuth flow, redirecting to Google"
    );

    Ok((
        jar.add(oauth_session_cookie(pending.session_id)),
        Redirect::temporary(&auth_url),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: check state, exchange code, store the credential, start a session.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let session_id = jar
        .get(OAUTH_SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| {
            tracing::warn!("OAuth callback without login session cookie");
            AppError::InvalidOAuthState
        })?;
    let returned_state = params.state.as_deref().unwrap_or_default();

    // Always single use, even when the provider reports an error.
    state.oauth_states.take(&session_id, returned_state)?;
    let jar = jar.add(removal_cookie(OAUTH_SESSION_COOKIE, OAUTH_CALLBACK_PATH));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!(
            "{}/login?error={}",
            state.config.frontend_url,
            urlencoding::encode(&error)
        );
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let tokens = state.google.exchange_code(&code).await?;

    let id_token = tokens.id_token.as_deref().ok_or_else(|| {
        tracing::error!("Token response carried no id_token");
        AppError::BadRequest("No identity token returned by Google".to_string())
    })?;
    let identity = state.id_verifier.verify(id_token).await?;

    let grant = OAuthGrant {
        google_sub: identity.subject,
        email: identity.email,
        access_token: SecretToken::new(tokens.access_token),
        refresh_token: tokens.refresh_token.map(SecretToken::new),
        expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        scopes: parse_scopes(tokens.scope.as_deref().unwrap_or_default()),
    };

    let user_id = state
        .db
        .upsert_from_oauth(&grant, state.config.user_match)
        .await?;

    tracing::info!(
        user_id,
        has_refresh_token = grant.refresh_token.is_some(),
        scope_count = grant.scopes.len(),
        "OAuth successful, user and tokens stored"
    );

    let token = state.session_guard.issue(user_id, &grant.email)?;
    let redirect = format!("{}/dashboard", state.config.frontend_url);

    Ok((jar.add(session_cookie(token)), Redirect::temporary(&redirect)))
}

/// Clear the session cookie and go back to the frontend.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    (
        jar.add(removal_cookie(SESSION_COOKIE, "/")),
        Redirect::temporary(&state.config.frontend_url),
    )
}

// ─── Account Deletion ────────────────────────────────────────

/// Response for account deletion.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Delete the user's account and everything stored for it.
///
/// Revocation at Google is best-effort; the local delete always proceeds.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>)> {
    tracing::info!(user_id = user.user_id, "User-initiated account deletion");

    // Revoking the refresh token also invalidates its access tokens.
    if let Some(credential) = state.db.get_credential(user.user_id).await? {
        let token = credential
            .refresh_token
            .as_ref()
            .unwrap_or(&credential.access_token);
        if let Err(e) = state.google.revoke(token).await {
            tracing::warn!(user_id = user.user_id, error = %e, "Token revocation failed, deleting anyway");
        }
    }

    if !state.db.delete_user(user.user_id).await? {
        tracing::warn!(user_id = user.user_id, "User vanished before deletion");
    }

    Ok((
        jar.add(removal_cookie(SESSION_COOKIE, "/")),
        Json(DeleteAccountResponse {
            success: true,
            message: "Account deleted. All data has been removed.".to_string(),
        }),
    ))
}
