//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token, asks the [`TokenAuthenticator`] for an
//! allow/deny decision and either continues or answers 401. The 401 is the
//! same for every failure cause.

use crate::auth::TokenAuthenticator;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Custom header accepted when `Authorization` is absent.
pub const AUTHENTICATE_HEADER: &str = "authenticate";

/// Authorization scheme prefix, case-sensitive.
const BEARER_PREFIX: &str = "Bearer ";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token authenticator for the trusted user pool.
    pub authenticator: Arc<TokenAuthenticator>,
}

/// Extract the bearer token from request headers.
///
/// Reads `Authorization`, falling back to `Authenticate`. The value must be
/// `Bearer <token>` with a non-empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get(AUTHENTICATE_HEADER))?
        .to_str()
        .ok()?;

    value
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// # Response
///
/// - Returns 401 Unauthorized if the token is missing, not a Bearer token,
///   or rejected by the authenticator
/// - Continues to the next handler otherwise
#[instrument(skip_all, name = "dash.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = bearer_token(req.headers()) else {
        tracing::debug!(target: "dash.middleware.auth", "Missing or malformed bearer token");
        return Err(ApiError::Unauthorized);
    };

    if !state.authenticator.authenticate(token).await {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
