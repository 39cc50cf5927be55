// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pending OAuth logins, keyed by a random per-browser session id.
//!
//! The session id travels in a short-lived cookie; the state value travels
//! through the provider redirect. The callback must present both.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// How long a login may stay pending before its state is discarded.
pub const LOGIN_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// A freshly started login.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub session_id: String,
    pub state: String,
}

#[derive(Debug, Clone)]
struct Entry {
    state: String,
    created_at: Instant,
}

/// In-process store of outstanding login states.
#[derive(Clone)]
pub struct OAuthStateStore {
    entries: Arc<DashMap<String, Entry>>,
    rng: SystemRandom,
    ttl: Duration,
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(LOGIN_STATE_TTL)
    }
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            rng: SystemRandom::new(),
            ttl,
        }
    }

    /// Start a login: generate a session id and an unguessable state.
    pub fn begin(&self) -> Result<PendingLogin, AppError> {
        self.prune();

        let session_id = hex::encode(self.random_bytes::<16>()?);
        let state = URL_SAFE_NO_PAD.encode(self.random_bytes::<32>()?);

        self.entries.insert(
            session_id.clone(),
            Entry {
                state: state.clone(),
                created_at: Instant::now(),
            },
        );

        Ok(PendingLogin { session_id, state })
    }

    /// Consume the pending login for `session_id` and check `state` against it.
    ///
    /// The entry is removed whether or not the state matches, so each
    /// state is usable at most once.
    pub fn take(&self, session_id: &str, state: &str) -> Result<(), AppError> {
        let Some((_, entry)) = self.entries.remove(session_id) else {
            tracing::warn!("OAuth callback with unknown or already-used session");
            return Err(AppError::InvalidOAuthState);
        };

        if entry.created_at.elapsed() > self.ttl {
            tracing::warn!("OAuth callback with expired state");
            return Err(AppError::InvalidOAuthState);
        }

        if !bool::from(entry.state.as_bytes().ct_eq(state.as_bytes())) {
            tracing::error!("OAuth state mismatch! Potential CSRF.");
            return Err(AppError::InvalidOAuthState);
        }

        Ok(())
    }

    /// Number of outstanding logins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);
    }

    fn random_bytes<const N: usize>(&self) -> Result<[u8; N], AppError> {
        let mut buf = [0u8; N];
        self.rng
            .fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
        Ok(buf)
    }
}
