//! HTTP middleware for the Dash API.

pub mod auth;
pub mod http_metrics;
