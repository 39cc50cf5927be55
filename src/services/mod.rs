// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar_sync;
pub mod cipher;
pub mod google;
pub mod google_oidc;
pub mod oauth_state;
pub mod refresher;
pub mod token_codec;

pub use calendar_sync::{CalendarSyncOrchestrator, SyncResult};
pub use cipher::TokenCipher;
pub use google::{CalendarClient, GoogleOAuthClient};
pub use google_oidc::{GoogleIdTokenVerifier, OidcError, VerifiedIdentity};
pub use oauth_state::OAuthStateStore;
pub use refresher::{CredentialRefresher, RefreshError};
pub use token_codec::TokenCodec;
