//! API configuration.
//!
//! Configuration is loaded from environment variables. The trust values
//! (expected audience and issuer) are validated once here and then carried
//! as an immutable [`TrustConfig`].

use crate::auth::TrustConfig;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default key set request timeout in milliseconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_MS: u64 = 5000;

/// Maximum key set request timeout in milliseconds.
pub const MAX_JWKS_FETCH_TIMEOUT_MS: u64 = 60_000;

/// Default key set cache TTL in seconds (0 = fetch on every request).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 0;

/// Maximum key set cache TTL in seconds.
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// API configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Expected audience and issuer, plus the key set URL.
    pub trust: TrustConfig,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for one key set request.
    pub jwks_fetch_timeout: Duration,

    /// How long a fetched key set may be reused. Zero disables caching.
    pub jwks_cache_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Configuration value must not be empty: {0}")]
    EmptyValue(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidCacheTtl(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let audience = vars
            .get("AUTH_CLIENT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_CLIENT_ID".to_string()))?;

        let issuer = match vars.get("AUTH_ISSUER") {
            Some(issuer) => issuer.clone(),
            None => derive_pool_issuer(vars)?,
        };

        let mut trust = TrustConfig::new(audience.as_str(), issuer)?;
        if let Some(jwks_url) = vars.get("AUTH_JWKS_URL") {
            trust = trust.with_jwks_url(jwks_url.as_str())?;
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse key set request timeout with validation
        let jwks_fetch_timeout_ms = if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_MS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_MS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "JWKS_FETCH_TIMEOUT_MS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_JWKS_FETCH_TIMEOUT_MS {
                return Err(ConfigError::InvalidTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_MS must not exceed {}, got {}",
                    MAX_JWKS_FETCH_TIMEOUT_MS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_FETCH_TIMEOUT_MS
        };

        // Parse key set cache TTL with validation
        let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_JWKS_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must not exceed {}, got {}",
                    MAX_JWKS_CACHE_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_CACHE_TTL_SECONDS
        };

        Ok(Config {
            trust,
            bind_address,
            jwks_fetch_timeout: Duration::from_millis(jwks_fetch_timeout_ms),
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_seconds),
        })
    }

    /// Key set request timeout in whole milliseconds, saturating at `u64::MAX`.
    pub fn jwks_fetch_timeout_ms(&self) -> u64 {
        u64::try_from(self.jwks_fetch_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Build the user pool issuer URL from region and pool id.
fn derive_pool_issuer(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    match (vars.get("AUTH_POOL_REGION"), vars.get("AUTH_POOL_ID")) {
        (Some(region), Some(pool_id)) if !region.is_empty() && !pool_id.is_empty() => Ok(format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            region, pool_id
        )),
        _ => Err(ConfigError::MissingEnvVar("AUTH_ISSUER".to_string())),
    }
}
