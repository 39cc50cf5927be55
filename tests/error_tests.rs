// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use planner_sync::error::AppError;
use planner_sync::services::RefreshError;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (AppError::Unauthenticated, StatusCode::UNAUTHORIZED, "unauthenticated"),
        (AppError::InvalidOAuthState, StatusCode::BAD_REQUEST, "invalid_oauth_state"),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "bad_request"),
        (AppError::NoEventsProvided, StatusCode::BAD_REQUEST, "no_events_provided"),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found"),
        (AppError::NoCredential, StatusCode::FORBIDDEN, "no_credential"),
        (AppError::InsufficientScope, StatusCode::FORBIDDEN, "insufficient_scope"),
        (AppError::RefreshDenied("x".into()), StatusCode::UNAUTHORIZED, "refresh_denied"),
        (AppError::Network("x".into()), StatusCode::BAD_GATEWAY, "upstream_unavailable"),
    ];

    for (err, status, code) in cases {
        let (got_status, body) = render(err).await;
        assert_eq!(got_status, status, "{code}");
        assert_eq!(body["error"], code);
        assert!(body.get("synced_count").is_none());
    }
}

#[tokio::test]
async fn test_partial_sync_failure_carries_counts() {
    let (status, body) = render(AppError::PartialSyncFailure {
        synced_count: 2,
        failed_at_index: 2,
    })
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "partial_sync_failure");
    assert_eq!(body["synced_count"], 2);
    assert_eq!(body["failed_at_index"], 2);
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let (status, body) = render(AppError::Database("no such table: users".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
    assert!(!body.to_string().contains("users"));

    let (status, body) = render(AppError::Internal(anyhow::anyhow!("key material: hunter2"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("hunter2"));
}

#[tokio::test]
async fn test_refresh_errors_keep_their_kind() {
    let (status, _) = render(RefreshError::Denied("invalid_grant".into()).into()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = render(RefreshError::Network("timeout".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
