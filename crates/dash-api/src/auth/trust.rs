//! Trust configuration: who tokens must be issued by and for.

use crate::config::ConfigError;

/// Well-known path of the issuer's public key set.
pub const JWKS_WELL_KNOWN_PATH: &str = "/.well-known/jwks.json";

/// Expected audience and issuer for identity tokens.
///
/// Both values are non-empty; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConfig {
    audience: String,
    issuer: String,
    jwks_url: Option<String>,
}

impl TrustConfig {
    /// Create a trust configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyValue` if either value is empty or whitespace.
    pub fn new(
        audience: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let audience = non_empty(audience.into(), "audience")?;
        let issuer = non_empty(issuer.into(), "issuer")?;

        Ok(Self {
            audience,
            issuer,
            jwks_url: None,
        })
    }

    /// Fetch keys from `url` instead of the issuer's well-known path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyValue` if `url` is empty or whitespace.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.jwks_url = Some(non_empty(url.into(), "jwks_url")?);
        Ok(self)
    }

    /// Expected `aud` claim (the app client id).
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// URL of the public key set.
    pub fn jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!(
                "{}{}",
                self.issuer.trim_end_matches('/'),
                JWKS_WELL_KNOWN_PATH
            ),
        }
    }
}

fn non_empty(value: String, name: &str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(name.to_string()));
    }
    Ok(value)
}
