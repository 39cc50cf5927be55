// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed session tokens (JWT) carried in the `token` cookie.

use crate::config::ConfigError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Fixed lifetime of a login session.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Claims embedded in a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Application user id
    pub user_id: i64,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Session token validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("session token expired")]
    Expired,

    #[error("session token malformed")]
    Malformed,
}

/// Issues and verifies session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// An empty secret is refused: it would make every token forgeable.
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid(
                "JWT_ALGORITHM",
                format!("{algorithm:?} is not an HMAC algorithm"),
            ));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Sign a token for `user_id` valid for `ttl` from now.
    pub fn issue(&self, user_id: i64, email: &str, ttl: Duration) -> anyhow::Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        Ok(encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check signature, structure and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}
