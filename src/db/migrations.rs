// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Embedded schema migrations, applied in version order at connect time.

use crate::error::AppError;
use chrono::Utc;
use sqlx::SqlitePool;

/// A schema change applied once and recorded in `schema_migrations`.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        // google_sub is nullable so rows created before subjects were recorded
        // can still be adopted by email; UNIQUE ignores NULLs in SQLite.
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                google_sub TEXT UNIQUE,
                email TEXT NOT NULL,
                access_token TEXT,
                refresh_token TEXT,
                token_expiry TEXT,
                granted_scopes TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
        ],
    },
    Migration {
        version: 2,
        name: "create_schedules",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS schedules (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                active_days TEXT NOT NULL,
                tasks TEXT NOT NULL,
                mandatory_tasks TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#],
    },
];

/// Apply every migration not yet recorded.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
    }

    Ok(())
}
