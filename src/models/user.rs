//! User model and the delegated Google credential embedded in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Scope string granting event writes on the user's calendars.
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
/// Full calendar scope, which also covers event writes.
pub const CALENDAR_FULL_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// User identity row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Application user id (primary key)
    pub id: i64,
    /// Google `sub` claim; absent only on rows created before subjects were recorded
    pub google_sub: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An OAuth token value that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Delegated authority to act on the user's calendar.
#[derive(Debug, Clone)]
pub struct UpstreamCredential {
    pub user_id: i64,
    pub access_token: SecretToken,
    /// `None` when the provider never issued one; such a credential cannot be renewed.
    pub refresh_token: Option<SecretToken>,
    /// Access token expiry, always UTC
    pub expires_at: DateTime<Utc>,
    pub scopes: BTreeSet<String>,
}

impl UpstreamCredential {
    /// Whether the access token is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the granted scopes permit creating calendar events.
    pub fn can_write_calendar(&self) -> bool {
        self.scopes.contains(CALENDAR_EVENTS_SCOPE) || self.scopes.contains(CALENDAR_FULL_SCOPE)
    }
}

/// Result of a completed OAuth consent, ready to be stored.
#[derive(Debug, Clone)]
pub struct OAuthGrant {
    pub google_sub: String,
    pub email: String,
    pub access_token: SecretToken,
    /// Google only returns a refresh token on (re-)consent.
    pub refresh_token: Option<SecretToken>,
    pub expires_at: DateTime<Utc>,
    pub scopes: BTreeSet<String>,
}

/// Parse the space-delimited `scope` field of a token response.
pub fn parse_scopes(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
