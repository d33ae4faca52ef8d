//! The Dash API Library
//!
//! This library provides the request-authorization core for The Dash
//! uptime dashboard API:
//!
//! - Identity token authentication against the user pool's JWKS
//! - The bearer-token request gate used by every protected endpoint
//! - Service configuration, metrics and a small HTTP shell
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/authenticator.rs -> auth/jwks.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token authenticator, trust configuration, key set client
//! - `config` - Service configuration from environment
//! - `errors` - Internal authentication taxonomy and HTTP error mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer token gate
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
