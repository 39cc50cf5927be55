// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encryption of upstream OAuth tokens at rest.
//!
//! AES-256-GCM with a key derived from `TOKEN_ENCRYPTION_KEY` through
//! HKDF-SHA256. The stored form is base64(nonce || ciphertext || tag); the
//! column name is bound in as associated data so an access token can never
//! be decrypted as a refresh token or vice versa.

use crate::config::ConfigError;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

const HKDF_SALT: &[u8] = b"planner-sync/token-cipher/v1";
const HKDF_INFO: &[u8] = b"upstream oauth tokens";

/// Associated-data labels for the two encrypted columns.
pub mod labels {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Symmetric cipher for token columns.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    pub fn new(secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::Missing("TOKEN_ENCRYPTION_KEY"));
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
        let mut okm = [0u8; 32];
        hk.expand(HKDF_INFO, &mut okm).map_err(|_| {
            ConfigError::Invalid("TOKEN_ENCRYPTION_KEY", "key derivation failed".to_string())
        })?;

        let unbound = UnboundKey::new(&AES_256_GCM, &okm).map_err(|_| {
            ConfigError::Invalid("TOKEN_ENCRYPTION_KEY", "invalid AES key".to_string())
        })?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, binding it to `label`.
    pub fn encrypt(&self, plaintext: &str, label: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("nonce generation failed")))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(label.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("token encryption failed")))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + in_out.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&in_out);
        Ok(BASE64.encode(stored))
    }

    /// Decrypt a value produced by [`TokenCipher::encrypt`] with the same label.
    pub fn decrypt(&self, stored: &str, label: &str) -> Result<String, AppError> {
        let bytes = BASE64
            .decode(stored)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token base64 decode failed: {e}")))?;

        if bytes.len() <= NONCE_LEN {
            return Err(AppError::Internal(anyhow::anyhow!(
                "encrypted token too short"
            )));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid token nonce")))?;

        let mut buf = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(label.as_bytes()), &mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("token decryption failed")))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed: {e}")))
    }
}
