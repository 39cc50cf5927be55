// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use planner_sync::config::{Config, UserMatchPolicy};
use planner_sync::db::Database;
use planner_sync::models::user::CALENDAR_EVENTS_SCOPE;
use planner_sync::models::{OAuthGrant, SecretToken};
use planner_sync::routes::create_router;
use planner_sync::services::{GoogleIdTokenVerifier, TokenCipher, TokenCodec};
use planner_sync::AppState;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

/// Key and kid the test ID token verifier trusts.
pub const ID_TOKEN_KEY: &[u8] = b"test-id-token-signing-key";
pub const ID_TOKEN_KID: &str = "test-kid";

/// Router, shared state and the mock standing in for every Google endpoint.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub google: MockServer,
}

/// Create a test app backed by an in-memory database and a mock Google.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|config| config).await
}

/// Same as [`create_test_app`] with a config tweak applied first.
#[allow(dead_code)]
pub async fn create_test_app_with(tweak: impl FnOnce(Config) -> Config) -> TestApp {
    let google = MockServer::start().await;
    let config = tweak(Config::test_default().with_provider_base(&google.uri()));

    let cipher = TokenCipher::new(&config.token_encryption_key).unwrap();
    let db = Database::in_memory(cipher).await.unwrap();
    let verifier = GoogleIdTokenVerifier::new_with_static_key(
        &config,
        ID_TOKEN_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(ID_TOKEN_KEY),
    )
    .unwrap();

    let state = Arc::new(AppState::new(config, db, Arc::new(verifier)).unwrap());

    TestApp {
        router: create_router(state.clone()),
        state,
        google,
    }
}

/// Insert a user holding a calendar credential that expires in `expires_in`.
#[allow(dead_code)]
pub async fn seed_user(
    state: &AppState,
    sub: &str,
    expires_in: Duration,
    scopes: &[&str],
    refresh_token: Option<&str>,
) -> i64 {
    let grant = OAuthGrant {
        google_sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        access_token: SecretToken::new(format!("access-{sub}")),
        refresh_token: refresh_token.map(SecretToken::new),
        expires_at: Utc::now() + expires_in,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
    };
    state
        .db
        .upsert_from_oauth(&grant, UserMatchPolicy::Subject)
        .await
        .unwrap()
}

/// A user with a fresh, calendar-scoped credential.
#[allow(dead_code)]
pub async fn seed_calendar_user(state: &AppState, sub: &str) -> i64 {
    seed_user(
        state,
        sub,
        Duration::hours(1),
        &["openid", "email", CALENDAR_EVENTS_SCOPE],
        Some("refresh-token"),
    )
    .await
}

/// `Cookie` header value carrying a session for `user_id`.
#[allow(dead_code)]
pub fn session_cookie_for(state: &AppState, user_id: i64) -> String {
    session_cookie_with_ttl(state, user_id, Duration::days(7))
}

#[allow(dead_code)]
pub fn session_cookie_with_ttl(state: &AppState, user_id: i64, ttl: Duration) -> String {
    let codec = TokenCodec::new(&state.config.jwt_signing_key, state.config.jwt_algorithm).unwrap();
    let token = codec.issue(user_id, "user@example.com", ttl).unwrap();
    format!("token={token}")
}

/// Sign an ID token the test verifier accepts.
#[allow(dead_code)]
pub fn sign_id_token(config: &Config, sub: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": "https://accounts.google.com",
        "aud": config.google_client_id,
        "sub": sub,
        "email": email,
        "email_verified": true,
        "iat": now,
        "exp": now + 3600,
    });
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(ID_TOKEN_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(ID_TOKEN_KEY)).unwrap()
}

/// All `Set-Cookie` headers on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` header for `name`.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// A pending login: the `Cookie` header to send back and the state Google would echo.
#[allow(dead_code)]
pub struct StartedLogin {
    pub cookie: String,
    pub state: String,
    pub location: String,
}

/// Hit the login endpoint and capture what the browser would carry to the callback.
#[allow(dead_code)]
pub async fn start_login(app: &TestApp) -> StartedLogin {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/google/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let state = location
        .split(|c: char| c == '?' || c == '&')
        .find_map(|pair| pair.strip_prefix("state="))
        .unwrap()
        .to_string();

    let set_cookie = find_cookie(&set_cookie_headers(&response), "oauth_session");
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    StartedLogin {
        cookie,
        state,
        location,
    }
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
