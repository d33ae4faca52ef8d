//! Observability for the Dash API.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
