//! Identity token authentication.
//!
//! - `authenticator` - The validation pipeline behind `authenticate`
//! - `jwks` - Key set retrieval and optional caching
//! - `trust` - Expected audience and issuer

pub mod authenticator;
pub mod jwks;
pub mod trust;

pub use authenticator::TokenAuthenticator;
pub use jwks::{HttpJwksFetcher, Jwk, JwkSet, JwksClient, JwksFetcher};
pub use trust::TrustConfig;
