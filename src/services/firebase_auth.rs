// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase token verification.
//!
//! Two kinds of RS256 JWTs signed by the `securetoken` service account are
//! checked here:
//! - ID tokens sent by app clients as `Authorization: Bearer ...`
//! - Blocking-function event tokens posted to `/beforeSignIn`

use crate::config::Config;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Authenticated caller extracted from a valid ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub uid: String,
    pub email: Option<String>,
    /// `admin` custom claim
    pub admin: bool,
}

/// User the sign-in event is about.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockingUserRecord {
    pub uid: String,
    pub email: Option<String>,
}

/// Verified blocking-function event.
#[derive(Debug, Clone)]
pub struct BlockingEvent {
    pub event_type: Option<String>,
    pub user_record: BlockingUserRecord,
}

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// The token is malformed, expired or its claims do not match.
    Invalid(String),
    /// Signing keys could not be fetched.
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase-issued JWTs.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    project_id: String,
    issuer: String,
    blocking_audience: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Create a production verifier that fetches and caches the securetoken JWKS.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::build(config, VerifierMode::Google)?;

        tracing::info!(
            issuer = %verifier.issuer,
            blocking_audience = %verifier.blocking_audience,
            "Initialized Firebase token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static verifier kid must not be empty");
        }

        Self::build(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn build(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            project_id: config.gcp_project_id.clone(),
            issuer: format!("https://securetoken.google.com/{}", config.gcp_project_id),
            blocking_audience: config.before_sign_in_audience(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a client ID token (without the `Bearer ` prefix).
    pub async fn verify_id_token(&self, token: &str) -> Result<Caller, TokenError> {
        let claims: IdTokenClaims = self.verify(token, &self.project_id).await?;

        validate_iat(claims.iat)?;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("empty sub claim".to_string()));
        }

        tracing::debug!(
            uid = %claims.sub,
            admin = claims.admin.unwrap_or(false),
            "Verified ID token"
        );

        Ok(Caller {
            uid: claims.sub,
            email: claims.email,
            admin: claims.admin.unwrap_or(false),
        })
    }

    /// Verify the JWT carried by a blocking-function request.
    pub async fn verify_blocking_event(&self, token: &str) -> Result<BlockingEvent, TokenError> {
        let claims: BlockingEventClaims = self.verify(token, &self.blocking_audience).await?;

        validate_iat(claims.iat)?;

        tracing::info!(
            uid = %claims.user_record.uid,
            event_type = claims.event_type.as_deref().unwrap_or("<missing>"),
            "Verified blocking event"
        );

        Ok(BlockingEvent {
            event_type: claims.event_type,
            user_record: claims.user_record,
        })
    }

    async fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<T, TokenError> {
        let header = decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[audience]);
        validation.leeway = CLOCK_SKEW_SECS;

        decode::<T>(token, decoding_key.as_ref(), &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(format!("JWT validation failed: {e}")))
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(TokenError::Invalid(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Google => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; retry once with a forced refresh before giving up.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(TokenError::Invalid(format!(
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

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), TokenError> {
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

        tracing::debug!(jwks_uri = SECURETOKEN_JWKS_URL, "Refreshing securetoken JWKS cache");

        let response = self
            .http_client
            .get(SECURETOKEN_JWKS_URL)
            .send()
            .await
            .map_err(|e| TokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| TokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);

        if keys_by_kid.is_empty() {
            return Err(TokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Securetoken JWKS cache refreshed");
        Ok(())
    }
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
struct IdTokenClaims {
    sub: String,
    iat: Option<usize>,
    email: Option<String>,
    admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BlockingEventClaims {
    iat: Option<usize>,
    event_type: Option<String>,
    user_record: BlockingUserRecord,
}

fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
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

/// Strip the `Bearer ` prefix from an Authorization header value.
pub fn extract_bearer_token(value: &str) -> Result<&str, TokenError> {
    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        TokenError::Invalid("Authorization header must be Bearer token".to_string())
    })?;

    if token.trim().is_empty() {
        return Err(TokenError::Invalid("Bearer token is empty".to_string()));
    }

    Ok(token.trim())
}

fn validate_iat(iat: Option<usize>) -> Result<(), TokenError> {
    let now = now_unix_secs();

    let Some(iat) = iat else {
        return Err(TokenError::Invalid("missing iat claim".to_string()));
    };

    if iat as u64 > now + CLOCK_SKEW_SECS {
        return Err(TokenError::Invalid("iat claim is in the future".to_string()));
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
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
