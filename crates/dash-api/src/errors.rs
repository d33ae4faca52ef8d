//! Error types for the API.
//!
//! Two layers:
//! - [`AuthError`] is the internal reason a token was rejected. It is logged
//!   and counted server-side, and never crosses the authenticator's public
//!   boundary.
//! - [`ApiError`] is what an HTTP caller sees. Every authentication failure
//!   maps to the same 401 response so that callers cannot tell an expired
//!   token from a bad signature or a wrong audience.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use common::jwt::TokenFormatError;
use thiserror::Error;

/// Body of every 401 response.
pub const UNAUTHORIZED_BODY: &str = "Not authorized";

/// Value of the `WWW-Authenticate` header on 401 responses.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"the-dash\", error=\"invalid_token\"";

/// Why a token was rejected.
///
/// Internal only: `TokenAuthenticator::authenticate` collapses every variant
/// to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Empty, oversized, or not three non-empty segments.
    #[error("malformed token: {0:?}")]
    MalformedToken(TokenFormatError),

    /// Header or payload is not base64url-encoded JSON.
    #[error("undecodable token: {0:?}")]
    Decode(TokenFormatError),

    /// Key set could not be fetched (transport error, timeout, non-2xx, bad body).
    #[error("key set unavailable")]
    KeySetUnavailable,

    /// No key set entry matches the token's `kid`.
    #[error("signing key not found")]
    KeyNotFound,

    /// Matched key cannot be used (missing or unsupported `alg`, bad key material).
    #[error("unsupported signing key")]
    UnsupportedKey,

    /// Signature does not verify under the matched key and its algorithm.
    #[error("invalid signature")]
    InvalidSignature,

    /// `exp` is missing or not in the future.
    #[error("token expired")]
    Expired,

    /// `aud` is missing or differs from the expected audience.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// `iss` is missing or differs from the expected issuer.
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// `token_use` is not "id".
    #[error("wrong token use")]
    WrongTokenUse,
}

impl AuthError {
    /// Bounded label for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "malformed",
            AuthError::Decode(_) => "decode",
            AuthError::KeySetUnavailable => "key_set_unavailable",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::UnsupportedKey => "unsupported_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::WrongTokenUse => "wrong_token_use",
        }
    }
}

impl From<TokenFormatError> for AuthError {
    fn from(err: TokenFormatError) -> Self {
        match err {
            TokenFormatError::InvalidBase64 | TokenFormatError::InvalidJson => AuthError::Decode(err),
            TokenFormatError::Empty
            | TokenFormatError::TooLarge
            | TokenFormatError::WrongSegmentCount
            | TokenFormatError::EmptySegment => AuthError::MalformedToken(err),
        }
    }
}

/// Errors returned to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, or rejected bearer token.
    #[error("Not authorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE_VALUE)],
                UNAUTHORIZED_BODY,
            )
                .into_response(),
        }
    }
}
