// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pushing planned events to, and reading the week back from, the user's
//! primary Google calendar.
//!
//! Both directions share one credential path: load, check scope, renew if
//! stale, persist the renewal, then call the Calendar API.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::error::AppError;
use crate::models::{CalendarEvent, ListedEvent, SecretToken};
use crate::services::google::CalendarClient;
use crate::services::refresher::CredentialRefresher;

/// Outcome of a fully successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub synced_count: usize,
    /// Always `None` on success; failures surface as `AppError::PartialSyncFailure`.
    pub failed_at_index: Option<usize>,
}

/// Coordinates credential renewal and calendar calls for one user at a time.
#[derive(Clone)]
pub struct CalendarSyncOrchestrator {
    db: Database,
    refresher: CredentialRefresher,
    calendar: CalendarClient,
}

impl CalendarSyncOrchestrator {
    pub fn new(db: Database, refresher: CredentialRefresher, calendar: CalendarClient) -> Self {
        Self {
            db,
            refresher,
            calendar,
        }
    }

    /// Create `events` in order, stopping at the first rejection.
    ///
    /// Events before the failing index stay on the calendar; nothing is rolled back.
    #[tracing::instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn sync(
        &self,
        user_id: i64,
        events: &[CalendarEvent],
    ) -> Result<SyncResult, AppError> {
        if events.is_empty() {
            return Err(AppError::NoEventsProvided);
        }

        for (index, event) in events.iter().enumerate() {
            event
                .check()
                .map_err(|msg| AppError::BadRequest(format!("Event {index}: {msg}")))?;
        }

        let access_token = self.fresh_access_token(user_id).await?;

        for (index, event) in events.iter().enumerate() {
            if let Err(e) = self.calendar.create_event(&access_token, event).await {
                tracing::warn!(
                    user_id,
                    failed_at_index = index,
                    synced_count = index,
                    error = %e,
                    "Calendar rejected event, stopping sync"
                );
                return Err(AppError::PartialSyncFailure {
                    synced_count: index,
                    failed_at_index: index,
                });
            }
        }

        tracing::info!(user_id, synced_count = events.len(), "Calendar sync complete");

        Ok(SyncResult {
            synced_count: events.len(),
            failed_at_index: None,
        })
    }

    /// List the seven days starting at `week_start` 00:00 UTC.
    #[tracing::instrument(skip(self))]
    pub async fn list_week(
        &self,
        user_id: i64,
        week_start: NaiveDate,
    ) -> Result<Vec<ListedEvent>, AppError> {
        let from = week_start.and_time(chrono::NaiveTime::MIN).and_utc();
        let to = from + Duration::days(7);

        let access_token = self.fresh_access_token(user_id).await?;
        let events = self.calendar.list_events(&access_token, from, to).await?;

        tracing::debug!(user_id, count = events.len(), "Listed calendar events");
        Ok(events)
    }

    /// A usable access token for `user_id`, renewed and persisted if stale.
    async fn fresh_access_token(&self, user_id: i64) -> Result<SecretToken, AppError> {
        let credential = self
            .db
            .get_credential(user_id)
            .await?
            .ok_or(AppError::NoCredential)?;

        if !credential.can_write_calendar() {
            tracing::info!(user_id, scopes = ?credential.scopes, "Calendar scope not granted");
            return Err(AppError::InsufficientScope);
        }

        let now = Utc::now();
        if !credential.is_expired_at(now) {
            return Ok(credential.access_token);
        }

        let Some(refresh_token) = credential.refresh_token.as_ref() else {
            tracing::warn!(user_id, "Access token expired and no refresh token on file");
            return Err(AppError::RefreshDenied(
                "no refresh token on file".to_string(),
            ));
        };

        tracing::info!(user_id, "Access token expired, refreshing");

        let refreshed = self.refresher.refresh(refresh_token).await.map_err(|e| {
            tracing::warn!(user_id, error = %e, "Token refresh failed");
            AppError::from(e)
        })?;

        let expires_at = Utc::now() + Duration::seconds(refreshed.expires_in_seconds);
        self.db
            .update_credential(user_id, &refreshed.access_token, expires_at)
            .await?;

        tracing::info!(user_id, expires_at = %expires_at, "Access token refreshed");
        Ok(refreshed.access_token)
    }
}
