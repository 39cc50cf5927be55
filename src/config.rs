// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to each component
//! constructor. Missing secrets are a hard startup failure.

use jsonwebtoken::Algorithm;
use std::env;
use std::time::Duration;

const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// How an OAuth login is matched against existing user rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMatchPolicy {
    /// Match on the provider subject only.
    Subject,
    /// Match on the provider subject; otherwise adopt a legacy row with the
    /// same email that has no subject recorded yet.
    SubjectThenEmail,
}

impl std::str::FromStr for UserMatchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" => Ok(Self::Subject),
            "subject_then_email" => Ok(Self::SubjectThenEmail),
            other => Err(ConfigError::Invalid(
                "USER_MATCH_POLICY",
                format!("unknown policy '{other}'"),
            )),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// OAuth redirect URI registered with Google
    pub redirect_uri: String,
    /// Frontend URL for post-login redirects
    pub frontend_url: String,
    /// Database connection URL
    pub database_url: String,
    /// Server port
    pub port: u16,
    /// User row matching strategy for OAuth logins
    pub user_match: UserMatchPolicy,
    /// Timeout applied to every outbound provider call
    pub upstream_timeout: Duration,
    /// Provider authorization endpoint
    pub google_auth_url: String,
    /// Provider token endpoint
    pub google_token_url: String,
    /// Provider token revocation endpoint
    pub google_revoke_url: String,
    /// Calendar API base URL
    pub calendar_api_url: String,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Signing algorithm for session tokens
    pub jwt_algorithm: Algorithm,
    /// Key material for encrypting upstream tokens at rest
    pub token_encryption_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            redirect_uri: env::var("REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8000/auth/google/callback".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:planner.db".to_string()),
            port: parse_or("PORT", 8000)?,
            user_match: parse_or("USER_MATCH_POLICY", UserMatchPolicy::Subject)?,
            upstream_timeout: Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECS", 10)?),
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            google_revoke_url: env::var("GOOGLE_REVOKE_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_REVOKE_URL.to_string()),
            calendar_api_url: env::var("GOOGLE_CALENDAR_API_URL")
                .unwrap_or_else(|_| DEFAULT_CALENDAR_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),

            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            jwt_signing_key: required("JWT_SECRET")?.into_bytes(),
            jwt_algorithm: match env::var("JWT_ALGORITHM") {
                Ok(raw) => parse_hmac_algorithm(&raw)?,
                Err(_) => Algorithm::HS256,
            },
            token_encryption_key: required("TOKEN_ENCRYPTION_KEY")?.into_bytes(),
        })
    }

    /// Fully-populated configuration for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            database_url: "sqlite::memory:".to_string(),
            port: 8000,
            user_match: UserMatchPolicy::Subject,
            upstream_timeout: Duration::from_secs(10),
            google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            google_revoke_url: DEFAULT_GOOGLE_REVOKE_URL.to_string(),
            calendar_api_url: DEFAULT_CALENDAR_API_URL.to_string(),
            google_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_algorithm: Algorithm::HS256,
            token_encryption_key: b"test_encryption_key_material!!!!".to_vec(),
        }
    }

    /// Point every provider endpoint at a single base URL (mock servers).
    pub fn with_provider_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.google_auth_url = format!("{base}/o/oauth2/v2/auth");
        self.google_token_url = format!("{base}/token");
        self.google_revoke_url = format!("{base}/revoke");
        self.calendar_api_url = format!("{base}/calendar/v3");
        self
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// Only HMAC algorithms make sense for a symmetric signing secret.
pub fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid(
            "JWT_ALGORITHM",
            format!("unsupported algorithm '{other}'"),
        )),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
