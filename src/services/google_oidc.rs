// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OIDC ID token verification for the login callback.

use crate::config::Config;
use crate::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const DEFAULT_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Identity asserted by a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
}

/// OIDC verification error categories.
#[derive(Debug, Clone)]
pub enum OidcError {
    /// The token is missing/invalid or claims do not match expectations.
    Forbidden(String),
    /// Key discovery failed; the login may be retried.
    Transient(String),
}

impl From<OidcError> for AppError {
    fn from(err: OidcError) -> Self {
        match err {
            OidcError::Forbidden(msg) => {
                tracing::warn!(reason = %msg, "ID token rejected");
                AppError::BadRequest("Invalid identity token".to_string())
            }
            OidcError::Transient(msg) => AppError::Network(msg),
        }
    }
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct DiscoveryCacheEntry {
    jwks_uri: String,
    expires_at: Instant,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for ID tokens returned by the Google token endpoint.
pub struct GoogleIdTokenVerifier {
    http_client: reqwest::Client,
    expected_audience: String,
    mode: VerifierMode,
    discovery_cache: RwLock<Option<DiscoveryCacheEntry>>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl GoogleIdTokenVerifier {
    /// Create a production verifier that discovers and caches Google JWKS keys.
    pub fn new(config: &Config, http_client: reqwest::Client) -> Self {
        tracing::info!(
            expected_audience = %config.google_client_id,
            "Initialized Google ID token verifier"
        );

        Self {
            http_client,
            expected_audience: config.google_client_id.clone(),
            mode: VerifierMode::Google,
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Create a verifier with a single static key.
    ///
    /// Used by local and integration tests where no JWKS endpoint exists.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static OIDC kid must not be empty");
        }

        Ok(Self {
            http_client: reqwest::Client::new(),
            expected_audience: config.google_client_id.clone(),
            mode: VerifierMode::StaticKey {
                kid,
                algorithm,
                decoding_key: Arc::new(decoding_key),
            },
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an ID token and return the subject and verified email.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, OidcError> {
        if token.is_empty() {
            return Err(OidcError::Forbidden("ID token is empty".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| OidcError::Forbidden(format!("invalid JWT header: {e}")))?;

        let expected_alg = match &self.mode {
            VerifierMode::Google => Algorithm::RS256,
            VerifierMode::StaticKey { algorithm, .. } => *algorithm,
        };
        if header.alg != expected_alg {
            return Err(OidcError::Forbidden(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| OidcError::Forbidden("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(expected_alg);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&ISSUERS);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<GoogleIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| OidcError::Forbidden(format!("JWT validation failed: {e}")))?
            .claims;

        tracing::debug!(
            subject = %claims.sub,
            issuer = %claims.iss,
            email_verified = ?claims.email_verified,
            "Google ID token claims"
        );

        validate_iat(claims.iat)?;

        let email = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| OidcError::Forbidden("missing email claim".to_string()))?;

        match claims.email_verified {
            Some(true) => {}
            Some(false) => {
                return Err(OidcError::Forbidden(
                    "email_verified claim is false".to_string(),
                ));
            }
            None => {
                return Err(OidcError::Forbidden(
                    "email_verified claim is missing".to_string(),
                ));
            }
        }

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, OidcError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
                ..
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(OidcError::Forbidden(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Google => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(OidcError::Forbidden(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), OidcError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await?;

        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing Google JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| OidcError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| OidcError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_rsa_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(OidcError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Google JWKS cache refreshed");
        Ok(())
    }

    async fn resolve_jwks_uri(&self, force_refresh: bool) -> Result<String, OidcError> {
        if !force_refresh {
            let cache = self.discovery_cache.read().await;
            if let Some(entry) = cache
                .as_ref()
                .filter(|entry| entry.expires_at > Instant::now())
            {
                return Ok(entry.jwks_uri.clone());
            }
        }

        let cached_jwks_uri = self
            .discovery_cache
            .read()
            .await
            .as_ref()
            .map(|entry| entry.jwks_uri.clone());

        match self.http_client.get(DISCOVERY_URL).send().await {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                let discovery: OpenIdConfig = resp
                    .json()
                    .await
                    .map_err(|e| OidcError::Transient(format!("invalid discovery JSON: {e}")))?;

                *self.discovery_cache.write().await = Some(DiscoveryCacheEntry {
                    jwks_uri: discovery.jwks_uri.clone(),
                    expires_at: Instant::now() + ttl,
                });

                Ok(discovery.jwks_uri)
            }
            Ok(resp) => {
                tracing::warn!(
                    status = %resp.status(),
                    "OIDC discovery returned non-success status; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "OIDC discovery request failed; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleIdTokenClaims {
    iss: String,
    sub: String,
    iat: Option<usize>,
    email: Option<String>,
    email_verified: Option<bool>,
}

fn usable_rsa_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn validate_iat(iat: Option<usize>) -> Result<(), OidcError> {
    let Some(iat) = iat else {
        return Err(OidcError::Forbidden("missing iat claim".to_string()));
    };

    if iat as u64 > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(OidcError::Forbidden("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
