// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("OAuth state missing or mismatched")]
    InvalidOAuthState,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("No events provided")]
    NoEventsProvided,

    #[error("No calendar credential on file")]
    NoCredential,

    #[error("Calendar write permission was not granted")]
    InsufficientScope,

    #[error("Refresh token rejected: {0}")]
    RefreshDenied(String),

    #[error("Upstream provider unavailable: {0}")]
    Network(String),

    #[error("Sync stopped at event {failed_at_index} after {synced_count} events")]
    PartialSyncFailure {
        synced_count: usize,
        failed_at_index: usize,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    synced_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_at_index: Option<usize>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut counts = None;
        let (status, error, details) = match &self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                Some("Please log in again.".to_string()),
            ),
            AppError::InvalidOAuthState => (
                StatusCode::BAD_REQUEST,
                "invalid_oauth_state",
                Some("Login session expired or was tampered with. Please retry.".to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NoEventsProvided => (
                StatusCode::BAD_REQUEST,
                "no_events_provided",
                Some("No events provided.".to_string()),
            ),
            AppError::NoCredential => (
                StatusCode::FORBIDDEN,
                "no_credential",
                Some("Connect your Google account to sync.".to_string()),
            ),
            AppError::InsufficientScope => (
                StatusCode::FORBIDDEN,
                "insufficient_scope",
                Some("Calendar access was not granted. Please log in again.".to_string()),
            ),
            AppError::RefreshDenied(msg) => {
                tracing::warn!(reason = %msg, "Upstream refresh denied");
                (
                    StatusCode::UNAUTHORIZED,
                    "refresh_denied",
                    Some("Google access expired. Please log in again.".to_string()),
                )
            }
            AppError::Network(msg) => {
                tracing::warn!(error = %msg, "Upstream provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_unavailable",
                    Some("Google is unavailable. Please try again later.".to_string()),
                )
            }
            AppError::PartialSyncFailure {
                synced_count,
                failed_at_index,
            } => {
                counts = Some((*synced_count, *failed_at_index));
                (
                    StatusCode::BAD_GATEWAY,
                    "partial_sync_failure",
                    Some("There was an error syncing your schedule.".to_string()),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            synced_count: counts.map(|(synced, _)| synced),
            failed_at_index: counts.map(|(_, failed)| failed),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
