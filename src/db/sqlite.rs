// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and their Google credential (tokens encrypted at rest)
//! - Schedules (one per user, replaced wholesale on save)
//!
//! Every multi-statement operation runs in a single transaction. A
//! transaction that is dropped before `commit` is rolled back by sqlx.

use crate::config::UserMatchPolicy;
use crate::db::tables;
use crate::error::AppError;
use crate::models::schedule::wall_clock;
use crate::models::{OAuthGrant, Schedule, ScheduleTemplate, SecretToken, UpstreamCredential, User};
use crate::services::cipher::{labels, TokenCipher};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;

const MAX_CONNECTIONS: u32 = 8;

/// Relational store for users, credentials and schedules.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    cipher: TokenCipher,
}

impl Database {
    /// Connect, enable foreign keys and apply migrations.
    pub async fn connect(url: &str, cipher: TokenCipher) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Each in-memory connection is its own database, so pin exactly one.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        }
        .connect_with(options)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to {url}: {e}")))?;

        crate::db::migrations::run_migrations(&pool).await?;
        tracing::info!("Database connected and migrated");

        Ok(Self { pool, cipher })
    }

    /// Fresh private in-memory database (tests, local experiments).
    pub async fn in_memory(cipher: TokenCipher) -> Result<Self, AppError> {
        Self::connect("sqlite::memory:", cipher).await
    }

    /// Underlying pool for ad hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by id.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT id, google_sub, email, created_at, updated_at FROM {} WHERE id = ?",
            tables::USERS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            id: row.try_get("id")?,
            google_sub: row.try_get("google_sub")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    /// Insert or update the user for a completed OAuth consent.
    ///
    /// Keyed on the Google subject through the UNIQUE constraint, so
    /// concurrent callbacks for one identity converge on a single row. A
    /// grant without a refresh token keeps the stored one.
    pub async fn upsert_from_oauth(
        &self,
        grant: &OAuthGrant,
        policy: UserMatchPolicy,
    ) -> Result<i64, AppError> {
        let now = Utc::now();
        let access = self
            .cipher
            .encrypt(grant.access_token.expose(), labels::ACCESS_TOKEN)?;
        let refresh = grant
            .refresh_token
            .as_ref()
            .map(|t| self.cipher.encrypt(t.expose(), labels::REFRESH_TOKEN))
            .transpose()?;
        let scopes = encode_json(&grant.scopes)?;

        let mut tx = self.pool.begin().await?;

        if policy == UserMatchPolicy::SubjectThenEmail {
            let adopted = sqlx::query(&format!(
                r#"
                UPDATE {users} SET google_sub = ?
                WHERE id = (
                    SELECT id FROM {users}
                    WHERE email = ? AND google_sub IS NULL
                    ORDER BY id LIMIT 1
                )
                AND NOT EXISTS (SELECT 1 FROM {users} WHERE google_sub = ?)
                "#,
                users = tables::USERS
            ))
            .bind(&grant.google_sub)
            .bind(&grant.email)
            .bind(&grant.google_sub)
            .execute(&mut *tx)
            .await?;

            if adopted.rows_affected() > 0 {
                tracing::info!("Adopted legacy user row by email");
            }
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                google_sub, email, access_token, refresh_token,
                token_expiry, granted_scopes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(google_sub) DO UPDATE SET
                email = excluded.email,
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, refresh_token),
                token_expiry = excluded.token_expiry,
                granted_scopes = excluded.granted_scopes,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            tables::USERS
        ))
        .bind(&grant.google_sub)
        .bind(&grant.email)
        .bind(&access)
        .bind(&refresh)
        .bind(grant.expires_at)
        .bind(&scopes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let user_id: i64 = row.try_get("id")?;
        tx.commit().await?;

        tracing::info!(user_id, "Stored Google credential from OAuth callback");
        Ok(user_id)
    }

    /// Delete a user and their schedule.
    ///
    /// Returns whether a user row existed.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {} WHERE user_id = ?", tables::SCHEDULES))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", tables::USERS))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Get the decrypted Google credential for a user.
    ///
    /// `None` when the user does not exist or never completed consent.
    pub async fn get_credential(
        &self,
        user_id: i64,
    ) -> Result<Option<UpstreamCredential>, AppError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT access_token, refresh_token, token_expiry, granted_scopes
            FROM {} WHERE id = ?
            "#,
            tables::USERS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let access: Option<String> = row.try_get("access_token")?;
        let expiry: Option<DateTime<Utc>> = row.try_get("token_expiry")?;
        let (Some(access), Some(expires_at)) = (access, expiry) else {
            return Ok(None);
        };

        let refresh: Option<String> = row.try_get("refresh_token")?;
        let refresh_token = refresh
            .map(|r| self.cipher.decrypt(&r, labels::REFRESH_TOKEN))
            .transpose()?
            .map(SecretToken::new);

        let scopes: String = row.try_get("granted_scopes")?;

        Ok(Some(UpstreamCredential {
            user_id,
            access_token: SecretToken::new(self.cipher.decrypt(&access, labels::ACCESS_TOKEN)?),
            refresh_token,
            expires_at,
            scopes: decode_json::<BTreeSet<String>>(&scopes)?,
        }))
    }

    /// Store a renewed access token. Never touches the refresh token.
    pub async fn update_credential(
        &self,
        user_id: i64,
        access_token: &SecretToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let access = self
            .cipher
            .encrypt(access_token.expose(), labels::ACCESS_TOKEN)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(&format!(
            "UPDATE {} SET access_token = ?, token_expiry = ?, updated_at = ? WHERE id = ?",
            tables::USERS
        ))
        .bind(&access)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping `tx` rolls back.
            return Err(AppError::NotFound(format!("User {user_id}")));
        }

        tx.commit().await?;
        Ok(())
    }

    // ─── Schedule Operations ─────────────────────────────────────

    /// Get the user's schedule, creating it with defaults on first read.
    pub async fn get_or_create_schedule(&self, user_id: i64) -> Result<Schedule, AppError> {
        let defaults = ScheduleTemplate::default();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            r#"
            INSERT OR IGNORE INTO {} (
                user_id, name, start_time, end_time, active_days,
                tasks, mandatory_tasks, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            tables::SCHEDULES
        ))
        .bind(user_id)
        .bind(&defaults.name)
        .bind(defaults.start_time.format("%H:%M").to_string())
        .bind(defaults.end_time.format("%H:%M").to_string())
        .bind(encode_json(&defaults.active_days)?)
        .bind(encode_json(&defaults.tasks)?)
        .bind(encode_json(&defaults.mandatory_tasks)?)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = select_schedule(&mut tx, user_id).await?;
        tx.commit().await?;
        row_to_schedule(&row)
    }

    /// Replace the user's schedule with `template`.
    pub async fn save_schedule(
        &self,
        user_id: i64,
        template: &ScheduleTemplate,
    ) -> Result<Schedule, AppError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                user_id, name, start_time, end_time, active_days,
                tasks, mandatory_tasks, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                active_days = excluded.active_days,
                tasks = excluded.tasks,
                mandatory_tasks = excluded.mandatory_tasks,
                updated_at = excluded.updated_at
            "#,
            tables::SCHEDULES
        ))
        .bind(user_id)
        .bind(&template.name)
        .bind(template.start_time.format("%H:%M").to_string())
        .bind(template.end_time.format("%H:%M").to_string())
        .bind(encode_json(&template.active_days)?)
        .bind(encode_json(&template.tasks)?)
        .bind(encode_json(&template.mandatory_tasks)?)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = select_schedule(&mut tx, user_id).await?;
        tx.commit().await?;
        row_to_schedule(&row)
    }
}

async fn select_schedule(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: i64,
) -> Result<SqliteRow, AppError> {
    Ok(sqlx::query(&format!(
        r#"
        SELECT name, start_time, end_time, active_days, tasks,
               mandatory_tasks, created_at, updated_at
        FROM {} WHERE user_id = ?
        "#,
        tables::SCHEDULES
    ))
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?)
}

fn row_to_schedule(row: &SqliteRow) -> Result<Schedule, AppError> {
    let start: String = row.try_get("start_time")?;
    let end: String = row.try_get("end_time")?;
    let active_days: String = row.try_get("active_days")?;
    let tasks: String = row.try_get("tasks")?;
    let mandatory_tasks: String = row.try_get("mandatory_tasks")?;

    Ok(Schedule {
        template: ScheduleTemplate {
            name: row.try_get("name")?,
            start_time: wall_clock::parse(&start).map_err(AppError::Database)?,
            end_time: wall_clock::parse(&end).map_err(AppError::Database)?,
            active_days: decode_json(&active_days)?,
            tasks: decode_json(&tasks)?,
            mandatory_tasks: decode_json(&mandatory_tasks)?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON encode failed: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Database(format!("Corrupt JSON column: {e}")))
}
