//! Identity token authentication.
//!
//! Decides whether a bearer token is a currently valid identity token issued
//! by the trusted user pool for this application.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The matched key's `alg` decides verification; the header's `alg` is
//!   never trusted on its own (algorithm confusion)
//! - Keys without `alg` and symmetric algorithms are refused
//! - Every failure collapses to `false`; the reason is only logged
//!   server-side at debug level and counted in metrics

use crate::auth::jwks::{Jwk, JwksClient};
use crate::auth::trust::TrustConfig;
use crate::errors::AuthError;
use crate::observability::metrics::record_token_validation;
use common::clock::{Clock, SystemClock};
use common::jwt::{IdTokenClaims, UnverifiedToken};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Token authenticator for the request gate.
pub struct TokenAuthenticator {
    /// Expected audience and issuer.
    trust: TrustConfig,

    /// Key set client for the trusted issuer.
    jwks_client: Arc<JwksClient>,

    /// Time source for the expiry check.
    clock: Arc<dyn Clock>,
}

impl TokenAuthenticator {
    /// Create an authenticator.
    ///
    /// # Arguments
    ///
    /// * `trust` - Expected audience and issuer
    /// * `jwks_client` - Client for the issuer's public key set
    /// * `clock` - Source of the current time
    pub fn new(trust: TrustConfig, jwks_client: Arc<JwksClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            trust,
            jwks_client,
            clock,
        }
    }

    /// Create an authenticator reading the wall clock.
    pub fn with_system_clock(trust: TrustConfig, jwks_client: Arc<JwksClient>) -> Self {
        Self::new(trust, jwks_client, Arc::new(SystemClock))
    }

    /// Whether `token` is a currently valid identity token for this application.
    ///
    /// Never fails: every rejection reason maps to `false`.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> bool {
        let start = Instant::now();

        match self.verify(token).await {
            Ok(_) => {
                tracing::debug!(target: "dash.auth", "Token validated successfully");
                record_token_validation("success", None, start.elapsed());
                true
            }
            Err(e) => {
                tracing::debug!(target: "dash.auth", reason = e.as_label(), "Token rejected");
                record_token_validation("error", Some(e.as_label()), start.elapsed());
                false
            }
        }
    }

    /// Run the validation pipeline and return the verified claims.
    ///
    /// # Checks
    ///
    /// 1. Presence, size and structure (three non-empty segments)
    /// 2. Header and payload decode as base64url JSON
    /// 3. Key resolution by `kid` from the issuer's key set
    /// 4. Signature, using the matched key's own `alg`
    /// 5. `exp` strictly after now
    /// 6. `aud` equals the expected audience
    /// 7. `iss` equals the expected issuer
    /// 8. `token_use` is "id"
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] for the first check that fails.
    pub(crate) async fn verify(&self, token: &str) -> Result<IdTokenClaims, AuthError> {
        let parsed = UnverifiedToken::parse(token)?;

        // A token without kid can never match a key set entry, so the fetch is skipped
        let kid = parsed.kid().ok_or(AuthError::KeyNotFound)?;
        let jwk = self.jwks_client.get_key(kid).await?;

        let claims = verify_signature(&parsed, &jwk)?;
        self.check_claims(&claims)?;

        Ok(claims)
    }

    /// Explicit claim checks, in order.
    fn check_claims(&self, claims: &IdTokenClaims) -> Result<(), AuthError> {
        // NumericDate claims may be fractional
        let now = self.clock.now_unix() as f64;
        match claims.exp {
            Some(exp) if exp > now => {}
            _ => return Err(AuthError::Expired),
        }

        if claims.aud.as_deref() != Some(self.trust.audience()) {
            return Err(AuthError::AudienceMismatch);
        }

        if claims.iss.as_deref() != Some(self.trust.issuer()) {
            return Err(AuthError::IssuerMismatch);
        }

        if !claims.is_id_token() {
            return Err(AuthError::WrongTokenUse);
        }

        Ok(())
    }
}

/// Verify the token signature under `jwk` and return the signed claims.
fn verify_signature(token: &UnverifiedToken<'_>, jwk: &Jwk) -> Result<IdTokenClaims, AuthError> {
    let (algorithm, decoding_key) = decoding_key(jwk)?;

    // Signature only; time and audience checks run against the injected clock
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<IdTokenClaims>(token.raw(), &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "dash.auth", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidKeyFormat
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidEcdsaKey => AuthError::UnsupportedKey,
                _ => AuthError::InvalidSignature,
            }
        })?;

    Ok(token_data.claims)
}

/// Build the verification key and algorithm from a JWK.
///
/// The JWK must declare an asymmetric `alg` consistent with its `kty`
/// (and `crv`, when present).
fn decoding_key(jwk: &Jwk) -> Result<(Algorithm, DecodingKey), AuthError> {
    let Some(alg) = jwk.alg.as_deref() else {
        tracing::warn!(target: "dash.auth", kid = ?jwk.kid, "JWK has no alg");
        return Err(AuthError::UnsupportedKey);
    };

    let algorithm = Algorithm::from_str(alg).map_err(|_| {
        tracing::warn!(target: "dash.auth", alg = %alg, "Unknown JWK algorithm");
        AuthError::UnsupportedKey
    })?;

    let key = match (jwk.kty.as_str(), algorithm) {
        (
            "RSA",
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
        ) => DecodingKey::from_rsa_components(member(&jwk.n, "n")?, member(&jwk.e, "e")?),
        ("EC", Algorithm::ES256) => {
            check_curve(jwk, "P-256")?;
            DecodingKey::from_ec_components(member(&jwk.x, "x")?, member(&jwk.y, "y")?)
        }
        ("EC", Algorithm::ES384) => {
            check_curve(jwk, "P-384")?;
            DecodingKey::from_ec_components(member(&jwk.x, "x")?, member(&jwk.y, "y")?)
        }
        ("OKP", Algorithm::EdDSA) => {
            check_curve(jwk, "Ed25519")?;
            DecodingKey::from_ed_components(member(&jwk.x, "x")?)
        }
        (kty, _) => {
            tracing::warn!(target: "dash.auth", kty = %kty, alg = %alg, "Unsupported JWK type/algorithm");
            return Err(AuthError::UnsupportedKey);
        }
    }
    .map_err(|e| {
        tracing::warn!(target: "dash.auth", error = %e, "Invalid JWK key material");
        AuthError::UnsupportedKey
    })?;

    Ok((algorithm, key))
}

fn member<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, AuthError> {
    value.as_deref().ok_or_else(|| {
        tracing::warn!(target: "dash.auth", member = name, "JWK missing key material");
        AuthError::UnsupportedKey
    })
}

fn check_curve(jwk: &Jwk, expected: &str) -> Result<(), AuthError> {
    match jwk.crv.as_deref() {
        None => Ok(()),
        Some(crv) if crv == expected => Ok(()),
        Some(crv) => {
            tracing::warn!(target: "dash.auth", crv = %crv, expected = %expected, "JWK curve does not match alg");
            Err(AuthError::UnsupportedKey)
        }
    }
}
