// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without a valid, live session
//! 2. Protected routes accept requests with a valid session cookie
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Duration;
use tower::ServiceExt;

mod common;

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_protected_route_without_cookie() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(get("/schedule/get", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(get("/schedule/get", Some("token=not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_header_is_not_a_session() {
    let app = common::create_test_app().await;
    let user_id = common::seed_calendar_user(&app.state, "bearer").await;
    let cookie = common::session_cookie_for(&app.state, user_id);
    let token = cookie.trim_start_matches("token=");

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/schedule/get")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let app = common::create_test_app().await;
    let user_id = common::seed_calendar_user(&app.state, "expired").await;
    let cookie = common::session_cookie_with_ttl(&app.state, user_id, Duration::seconds(-30));

    let response = app
        .router
        .oneshot(get("/schedule/get", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let app = common::create_test_app().await;
    let user_id = common::seed_calendar_user(&app.state, "forged").await;

    let codec =
        planner_sync::services::TokenCodec::new(b"some-other-key", jsonwebtoken::Algorithm::HS256)
            .unwrap();
    let token = codec
        .issue(user_id, "forged@example.com", Duration::days(1))
        .unwrap();

    let response = app
        .router
        .oneshot(get("/schedule/get", Some(&format!("token={token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_rejected() {
    let app = common::create_test_app().await;
    let cookie = common::session_cookie_for(&app.state, 4242);

    let response = app
        .router
        .oneshot(get("/schedule/get", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_cookie() {
    let app = common::create_test_app().await;
    let user_id = common::seed_calendar_user(&app.state, "valid").await;
    let cookie = common::session_cookie_for(&app.state, user_id);

    let response = app
        .router
        .oneshot(get("/schedule/get", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["name"], "My Schedule");
    assert_eq!(body["startTime"], "09:00");
    assert_eq!(body["endTime"], "17:00");
    assert_eq!(
        body["activeDays"],
        serde_json::json!(["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY"])
    );
}

#[tokio::test]
async fn test_health_is_public_and_hardened() {
    let app = common::create_test_app().await;

    let response = app.router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let body = common::body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["build_id"].is_string());
}

#[tokio::test]
async fn test_cors_preflight_from_frontend() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/sync/schedule")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_foreign_origin() {
    let app = common::create_test_app().await;

    for origin in [
        "https://evil.example.com",
        "http://localhost.attacker.tld",
        "http://127.0.0.1.attacker.tld",
    ] {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/sync/schedule")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none(),
            "{origin}"
        );
    }
}
