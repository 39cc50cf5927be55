// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar sync routes (authenticated).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{CalendarEvent, ListedEvent};
use crate::services::SyncResult;
use crate::time_utils::parse_iso_date;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/schedule", post(sync_schedule))
        .route("/sync/events", get(list_events))
}

/// Push events to the primary calendar in submission order.
async fn sync_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(events): Json<Vec<CalendarEvent>>,
) -> Result<Json<SyncResult>> {
    tracing::info!(user_id = user.user_id, event_count = events.len(), "Sync requested");
    let result = state.calendar_sync.sync(user.user_id, &events).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct WeekQuery {
    week_start: String,
}

/// Events in the week starting at `week_start` (UTC midnight).
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<ListedEvent>>> {
    let week_start = parse_iso_date(&query.week_start).map_err(AppError::BadRequest)?;
    let events = state
        .calendar_sync
        .list_week(user.user_id, week_start)
        .await?;
    Ok(Json(events))
}
