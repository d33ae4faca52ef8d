//! Liveness probe.

/// Returns "OK" while the process is running.
///
/// Checks no dependencies; the key set endpoint is only contacted when a
/// token is authenticated.
pub async fn health_check() -> &'static str {
    "OK"
}
