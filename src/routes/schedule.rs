// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly planning template routes (authenticated).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Schedule, ScheduleTemplate};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/schedule/get", get(get_schedule))
        .route("/schedule/save", post(save_schedule))
}

/// The user's schedule; created with defaults on first read.
async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Schedule>> {
    let schedule = state.db.get_or_create_schedule(user.user_id).await?;
    Ok(Json(schedule))
}

/// Replace the whole schedule.
async fn save_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(mut template): Json<ScheduleTemplate>,
) -> Result<Json<Schedule>> {
    template.check().map_err(AppError::BadRequest)?;

    let schedule = state.db.save_schedule(user.user_id, &template).await?;
    tracing::info!(
        user_id = user.user_id,
        tasks = schedule.template.tasks.len(),
        mandatory_tasks = schedule.template.mandatory_tasks.len(),
        "Schedule saved"
    );
    Ok(Json(schedule))
}
