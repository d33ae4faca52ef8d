//! JWKS client for fetching public keys from the user pool.
//!
//! The client fetches the issuer's `/.well-known/jwks.json` document and
//! looks keys up by `kid`. By default every lookup performs a fresh fetch.
//! An optional TTL cache can be enabled; an unknown `kid` in a fresh cache
//! forces one refetch so that rotated keys are picked up immediately.
//!
//! # Security
//!
//! - Failed fetches never populate the cache
//! - The fetch has a bounded timeout
//! - HTTPS should be used in production (enforced by deployment config)

use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// JSON Web Key from the JWKS endpoint.
///
/// Members other than the ones below are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Algorithm the key is used with (e.g. "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// First key whose `kid` equals `kid`.
    ///
    /// Keys without a `kid` never match.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

/// Why a key set could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("key set request failed: {0}")]
    Transport(String),

    #[error("key set request timed out")]
    Timeout,

    #[error("key set endpoint returned status {0}")]
    Status(u16),

    #[error("key set response is not a valid JWKS document: {0}")]
    InvalidBody(String),
}

/// Retrieves a key set document from a URL (enables mocking).
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// GET `url` and parse the body as a JWKS document.
    async fn fetch(&self, url: &str) -> Result<JwkSet, FetchError>;
}

/// HTTP key set fetcher backed by reqwest.
pub struct HttpJwksFetcher {
    http_client: reqwest::Client,
}

impl HttpJwksFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "dash.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch(&self, url: &str) -> Result<JwkSet, FetchError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::InvalidBody(e.to_string())
            }
        })
    }
}

/// Cached key set with expiry time.
struct CachedJwks {
    key_set: JwkSet,
    expires_at: Instant,
}

/// JWKS client: fetches the key set and resolves keys by `kid`.
///
/// Safe to share across concurrent requests.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// Transport used for every fetch.
    fetcher: Arc<dyn JwksFetcher>,

    /// Cached key set; only used when `cache_ttl` is non-zero.
    cache: RwLock<Option<CachedJwks>>,

    /// Cache TTL duration. Zero disables caching.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a client that fetches the key set on every lookup.
    pub fn new(jwks_url: impl Into<String>, fetcher: Arc<dyn JwksFetcher>) -> Self {
        Self::with_ttl(jwks_url, fetcher, Duration::ZERO)
    }

    /// Create a client that reuses a fetched key set for `cache_ttl`.
    pub fn with_ttl(
        jwks_url: impl Into<String>,
        fetcher: Arc<dyn JwksFetcher>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            fetcher,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    /// Get a JWK by key ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the key set cannot be fetched.
    /// Returns `AuthError::KeyNotFound` if no key has this `kid`.
    #[instrument(skip_all)]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        if !self.cache_ttl.is_zero() {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.key_set.find(kid) {
                        tracing::debug!(target: "dash.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    // Possibly rotated: refetch once below
                    tracing::debug!(target: "dash.auth.jwks", kid = %kid, "Key not found in JWKS cache, refetching");
                }
            }
        }

        let key_set = self.fetch_key_set().await?;
        let key = key_set.find(kid).cloned();

        if !self.cache_ttl.is_zero() {
            match Instant::now().checked_add(self.cache_ttl) {
                Some(expires_at) => {
                    let mut cache = self.cache.write().await;
                    *cache = Some(CachedJwks {
                        key_set,
                        expires_at,
                    });
                }
                None => {
                    tracing::warn!(
                        target: "dash.auth.jwks",
                        ttl_secs = self.cache_ttl.as_secs(),
                        "JWKS cache TTL out of range, not caching"
                    );
                }
            }
        }

        key.ok_or_else(|| {
            tracing::debug!(target: "dash.auth.jwks", kid = %kid, "Key not found in JWKS");
            AuthError::KeyNotFound
        })
    }

    /// Fetch the key set from the endpoint.
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(target: "dash.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        match self.fetcher.fetch(&self.jwks_url).await {
            Ok(key_set) => {
                record_jwks_fetch("success");
                tracing::debug!(
                    target: "dash.auth.jwks",
                    key_count = key_set.keys.len(),
                    "JWKS fetched"
                );
                Ok(key_set)
            }
            Err(e) => {
                record_jwks_fetch("error");
                tracing::warn!(target: "dash.auth.jwks", error = %e, "Failed to fetch JWKS");
                Err(AuthError::KeySetUnavailable)
            }
        }
    }
}

/// Mock key set fetcher for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Mock fetcher returning a configurable key set.
    pub struct MockJwksFetcher {
        /// Key set to return; `None` makes every fetch fail.
        key_set: Mutex<Option<JwkSet>>,
        /// Number of fetches made.
        call_count: AtomicUsize,
    }

    impl MockJwksFetcher {
        /// Create a mock that serves `key_set`.
        pub fn serving(key_set: JwkSet) -> Self {
            Self {
                key_set: Mutex::new(Some(key_set)),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock whose fetches always fail.
        pub fn failing() -> Self {
            Self {
                key_set: Mutex::new(None),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Replace the served key set (key rotation).
        pub async fn publish(&self, key_set: JwkSet) {
            *self.key_set.lock().await = Some(key_set);
        }

        /// Get the number of fetches made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JwksFetcher for MockJwksFetcher {
        async fn fetch(&self, _url: &str) -> Result<JwkSet, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.key_set
                .lock()
                .await
                .clone()
                .ok_or(FetchError::Status(503))
        }
    }
}
