//! Session probe for the dashboard front end.
//!
//! Mounted behind `require_auth`, so reaching the handler means the bearer
//! token was accepted. The single-page app gates its client-side routes on
//! the same decision the API uses.

use axum::http::StatusCode;

/// Handler for GET /api/v1/session
///
/// # Response
///
/// - 204 No Content when the token is valid (401 is produced by the gate)
#[tracing::instrument(skip_all, name = "dash.session.check")]
pub async fn session_check() -> StatusCode {
    StatusCode::NO_CONTENT
}
