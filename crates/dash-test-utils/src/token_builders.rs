//! Builder patterns for test data construction
//!
//! Provides a fluent API for identity token claims.

use chrono::Utc;
use serde_json::{json, Map, Value};

/// Builder for identity token claims
///
/// Defaults describe a valid identity token: `token_use: "id"`, the given
/// audience and issuer, and expiry one hour from now.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new("my-client-id", "https://issuer.example")
///     .for_user("alice")
///     .expires_at(now + 1)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder for a valid identity token
    pub fn new(audience: &str, issuer: &str) -> Self {
        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("aud".to_string(), json!(audience));
        claims.insert("iss".to_string(), json!(issuer));
        claims.insert("token_use".to_string(), json!("id"));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("auth_time".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + 3600));
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the audience
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set `token_use`
    pub fn token_use(self, token_use: &str) -> Self {
        self.claim("token_use", json!(token_use))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at(Utc::now().timestamp() + seconds)
    }

    /// Set the absolute expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", json!(timestamp))
    }

    /// Set any claim to any JSON value
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}
