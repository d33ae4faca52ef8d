//! Identity token structure shared across The Dash services.
//!
//! This module covers everything about a bearer token that can be checked
//! without a key:
//! - Size limit for DoS prevention
//! - Splitting into exactly three non-empty segments
//! - base64url + JSON decoding of the header and payload
//! - Typed header and claims records
//!
//! Nothing here verifies a signature. A parsed [`UnverifiedToken`] only says
//! the token is well-formed; its claims MUST NOT be trusted until the
//! signature has been checked against a key from the issuer's key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE decoding
//! - Every structural failure renders the same generic message
//! - `sub`, `email` and `cognito:username` are redacted in Debug output
//! - The raw token text is never logged
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::UnverifiedToken;
//!
//! let parsed = UnverifiedToken::parse(token)?;
//! let kid = parsed.header().kid.as_deref();
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Identity tokens issued by the user pool are typically 1-2KB (RS256
/// signature plus profile claims). Anything beyond 8KB is rejected before
/// base64 decoding or any cryptographic work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// The only `token_use` value accepted by the API: an OIDC identity token.
///
/// Access tokens from the same pool share the envelope but carry
/// `token_use: "access"` and no `aud` claim.
pub const TOKEN_USE_ID: &str = "id";

// =============================================================================
// Error Types
// =============================================================================

/// Structural errors found while parsing a token.
///
/// Note: Display output is intentionally identical for every variant. The
/// variant itself is only for server-side logs and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenFormatError {
    /// Token string is empty.
    #[error("The identity token is invalid or expired")]
    Empty,

    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The identity token is invalid or expired")]
    TooLarge,

    /// Token does not split into exactly three segments.
    #[error("The identity token is invalid or expired")]
    WrongSegmentCount,

    /// One of the three segments is empty.
    #[error("The identity token is invalid or expired")]
    EmptySegment,

    /// Header or payload is not valid base64url.
    #[error("The identity token is invalid or expired")]
    InvalidBase64,

    /// Header or payload is not a JSON object of the expected shape.
    #[error("The identity token is invalid or expired")]
    InvalidJson,
}

// =============================================================================
// Header and Claims Types
// =============================================================================

/// Decoded token header.
///
/// Only the members the verifier looks at are kept; anything else in the
/// header object is ignored. A member of the wrong JSON type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Key ID used to pick the verification key from the key set.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub kid: Option<String>,

    /// Signing algorithm the issuer claims to have used.
    ///
    /// Informational only: the matched key's own `alg` decides how the
    /// signature is verified.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub alg: Option<String>,

    /// Media type, usually "JWT".
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub typ: Option<String>,
}

/// Claims carried by an identity token.
///
/// Every field is optional so that a missing claim is an explicit `None`
/// for the verifier to reject, rather than a parse failure. A claim of the
/// wrong JSON type also reads as `None`, so only the claim checks themselves
/// can reject a token.
/// `sub`, `email` and `username` are redacted in Debug output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user pool user id) - redacted in Debug output.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,

    /// Expiration time as a NumericDate (Unix epoch seconds, possibly fractional).
    #[serde(
        default,
        deserialize_with = "numeric_date_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<f64>,

    /// Issued-at NumericDate.
    #[serde(
        default,
        deserialize_with = "numeric_date_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<f64>,

    /// Time the user authenticated, as a NumericDate.
    #[serde(
        default,
        deserialize_with = "numeric_date_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_time: Option<f64>,

    /// Audience: the app client id the token was issued to.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub aud: Option<String>,

    /// Issuer URL of the user pool.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub iss: Option<String>,

    /// Token class discriminator ("id" or "access").
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_use: Option<String>,

    /// User email - redacted in Debug output.
    #[serde(
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,

    /// Pool username - redacted in Debug output.
    #[serde(
        default,
        rename = "cognito:username",
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
}

impl fmt::Debug for IdTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenClaims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("auth_time", &self.auth_time)
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("token_use", &self.token_use)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl IdTokenClaims {
    /// Whether this is an identity token (`token_use == "id"`).
    #[must_use]
    pub fn is_id_token(&self) -> bool {
        self.token_use.as_deref() == Some(TOKEN_USE_ID)
    }
}

// =============================================================================
// Parsed Token
// =============================================================================

/// A structurally valid token whose signature has NOT been checked.
pub struct UnverifiedToken<'a> {
    raw: &'a str,
    header: TokenHeader,
    claims: IdTokenClaims,
}

/// Debug never prints the raw token.
impl fmt::Debug for UnverifiedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnverifiedToken")
            .field("len", &self.raw.len())
            .field("header", &self.header)
            .field("claims", &self.claims)
            .finish()
    }
}

impl<'a> UnverifiedToken<'a> {
    /// Parse a token into header and claims without verifying it.
    ///
    /// # Checks
    ///
    /// 1. Presence - the empty string is rejected
    /// 2. Size - tokens over [`MAX_JWT_SIZE_BYTES`] are rejected before decoding
    /// 3. Structure - exactly three dot-separated, non-empty segments
    /// 4. Decode - header and payload must be base64url JSON objects
    ///
    /// # Errors
    ///
    /// Returns the [`TokenFormatError`] for the first check that fails.
    pub fn parse(token: &'a str) -> Result<Self, TokenFormatError> {
        if token.is_empty() {
            tracing::debug!(target: "common.jwt", "Token rejected: empty");
            return Err(TokenFormatError::Empty);
        }

        // Check token size first (DoS prevention)
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenFormatError::TooLarge);
        }

        let (header_part, payload_part, signature_part) = split_segments(token)?;
        if header_part.is_empty() || payload_part.is_empty() || signature_part.is_empty() {
            tracing::debug!(target: "common.jwt", "Token rejected: empty segment");
            return Err(TokenFormatError::EmptySegment);
        }

        let header: TokenHeader = decode_segment(header_part, "header")?;
        let claims: IdTokenClaims = decode_segment(payload_part, "payload")?;

        Ok(Self {
            raw: token,
            header,
            claims,
        })
    }

    /// The original token text, for signature verification.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The decoded header.
    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// The decoded, unverified claims.
    #[must_use]
    pub fn claims(&self) -> &IdTokenClaims {
        &self.claims
    }

    /// The header's `kid`, if present and non-empty.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

// =============================================================================
// Functions
// =============================================================================

/// A string member, or `None` for any other JSON type.
fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(Some(value)),
        _ => Ok(None),
    }
}

/// A NumericDate member (integer or fractional seconds), or `None` for any
/// other JSON type.
fn numeric_date_or_absent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

/// Split `header.payload.signature` into its three segments.
fn split_segments(token: &str) -> Result<(&str, &str, &str), TokenFormatError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => {
            tracing::debug!(
                target: "common.jwt",
                parts = token.split('.').count(),
                "Token rejected: invalid JWT format"
            );
            Err(TokenFormatError::WrongSegmentCount)
        }
    }
}

/// Decode one base64url segment into a JSON object of type `T`.
fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    name: &'static str,
) -> Result<T, TokenFormatError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode base64");
        TokenFormatError::InvalidBase64
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JSON");
        TokenFormatError::InvalidJson
    })
}

// =============================================================================
// Tests
// =============================================================================
