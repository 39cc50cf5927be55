// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Planner-Sync API Server
//!
//! Signs users in with Google and syncs their planned week to Google Calendar.

use planner_sync::{
    config::Config,
    db::Database,
    services::{google, GoogleIdTokenVerifier, TokenCipher},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Planner-Sync API");

    // Open the database and apply migrations
    let cipher = TokenCipher::new(&config.token_encryption_key)?;
    let db = Database::connect(&config.database_url, cipher).await?;
    tracing::info!(url = %config.database_url, "Database ready");

    let http = google::http_client(config.upstream_timeout)?;
    let id_verifier = Arc::new(GoogleIdTokenVerifier::new(&config, http));

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, id_verifier)?);

    // Build router
    let app = planner_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("planner_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
