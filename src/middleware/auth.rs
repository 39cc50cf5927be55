// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie authentication middleware.

use crate::db::Database;
use crate::error::AppError;
use crate::services::token_codec::{TokenCodec, SESSION_TTL_DAYS};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "token";

/// Cookie tying an OAuth callback to the browser that started the login.
pub const OAUTH_SESSION_COOKIE: &str = "oauth_session";

/// Path the login-session cookie is scoped to.
pub const OAUTH_CALLBACK_PATH: &str = "/auth/google/callback";

/// Authenticated user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

/// Resolves a request's session cookie to a live user.
#[derive(Clone)]
pub struct SessionGuard {
    codec: TokenCodec,
    db: Database,
}

impl SessionGuard {
    pub fn new(codec: TokenCodec, db: Database) -> Self {
        Self { codec, db }
    }

    /// Verify the session cookie and confirm the user still exists.
    pub async fn authenticate(&self, jar: &CookieJar) -> Result<AuthUser, AppError> {
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let claims = self.codec.verify(token).map_err(|e| {
            tracing::debug!(reason = %e, "Session token rejected");
            AppError::Unauthenticated
        })?;

        // A token may outlive its account.
        let Some(user) = self.db.get_user(claims.user_id).await? else {
            tracing::info!(user_id = claims.user_id, "Session for deleted user");
            return Err(AppError::Unauthenticated);
        };

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
        })
    }

    /// Issue a fresh 7-day session token.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, AppError> {
        self.codec
            .issue(user_id, email, chrono::Duration::days(SESSION_TTL_DAYS))
            .map_err(AppError::Internal)
    }
}

/// Middleware that requires a valid session cookie.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = state.session_guard.authenticate(&jar).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Session cookie holding `token`.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Short-lived cookie naming the pending login.
pub fn oauth_session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((OAUTH_SESSION_COOKIE, session_id))
        .path(OAUTH_CALLBACK_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(10))
        .build()
}

/// Removal cookie matching the attributes `name` was created with.
pub fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path(path)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = session_cookie("abc".to_string()).to_string();
        assert!(rendered.starts_with("token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let rendered = removal_cookie(SESSION_COOKIE, "/").to_string();
        assert!(rendered.starts_with("token=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Path=/"));
    }

    #[test]
    fn test_oauth_cookie_scoped_to_callback() {
        let rendered = oauth_session_cookie("sid".to_string()).to_string();
        assert!(rendered.contains("Path=/auth/google/callback"));
        assert!(rendered.contains("Max-Age=600"));
    }
}
