//! HTTP request handlers for the Dash API.

pub mod health;
pub mod metrics;
pub mod session;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use session::session_check;
