//! # Dash Test Utilities
//!
//! Shared test utilities for token authentication tests.
//!
//! This crate provides:
//! - Deterministic key fixtures (Ed25519 seeds, fixed RSA and P-256 keys)
//! - A claims builder for identity tokens
//! - A mock key set server (`MockJwksServer`) backed by wiremock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dash_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = TestKey::rsa_primary("k1");
//!     let server = MockJwksServer::start(&[&key]).await;
//!
//!     let claims = TestTokenBuilder::new(TEST_AUDIENCE, &server.issuer())
//!         .expires_in(3600)
//!         .build();
//!     let token = key.sign(&claims);
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;

/// App client id used as the expected audience throughout the tests.
pub const TEST_AUDIENCE: &str = "test-client-id";
