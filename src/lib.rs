// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Planner-Sync: sign in with Google, keep a weekly planning template, and
//! push planned time blocks onto the user's Google calendar.
//!
//! This crate provides the backend API: OAuth login and session cookies,
//! encrypted storage of the delegated Google credential, transparent token
//! renewal, and ordered calendar sync.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use middleware::SessionGuard;
use services::{
    google, CalendarClient, CalendarSyncOrchestrator, CredentialRefresher, GoogleIdTokenVerifier,
    GoogleOAuthClient, OAuthStateStore, TokenCodec,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub session_guard: SessionGuard,
    pub oauth_states: OAuthStateStore,
    pub google: GoogleOAuthClient,
    pub id_verifier: Arc<GoogleIdTokenVerifier>,
    pub calendar_sync: CalendarSyncOrchestrator,
}

impl AppState {
    /// Wire every component from `config`.
    ///
    /// The ID token verifier is passed in so tests can substitute a static key.
    pub fn new(
        config: Config,
        db: Database,
        id_verifier: Arc<GoogleIdTokenVerifier>,
    ) -> anyhow::Result<Self> {
        let codec = TokenCodec::new(&config.jwt_signing_key, config.jwt_algorithm)?;
        let http = google::http_client(config.upstream_timeout)?;

        let calendar_sync = CalendarSyncOrchestrator::new(
            db.clone(),
            CredentialRefresher::new(&config, http.clone()),
            CalendarClient::new(&config, http.clone()),
        );

        Ok(Self {
            session_guard: SessionGuard::new(codec, db.clone()),
            oauth_states: OAuthStateStore::default(),
            google: GoogleOAuthClient::new(&config, http),
            id_verifier,
            calendar_sync,
            db,
            config,
        })
    }
}
