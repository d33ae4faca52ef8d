//! Mock key set endpoint for authentication tests
//!
//! Stands in for the user pool's `/.well-known/jwks.json`. The server's base
//! URI doubles as the issuer, so `<issuer>/.well-known/jwks.json` resolves to
//! the mock.

use crate::crypto_fixtures::TestKey;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Well-known path of the key set document.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A wiremock server publishing a key set.
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a server publishing the public JWKs of `keys`.
    pub async fn start(keys: &[&TestKey]) -> Self {
        Self::with_document(key_set(keys)).await
    }

    /// Start a server publishing an arbitrary JSON document.
    pub async fn with_document(document: Value) -> Self {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(200).set_body_json(document)).await;
        Self { server }
    }

    /// Start a server that answers every key set request with `status`.
    pub async fn failing(status: u16) -> Self {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(status)).await;
        Self { server }
    }

    /// Start a server that publishes `keys` only after `delay`.
    pub async fn slow(keys: &[&TestKey], delay: Duration) -> Self {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(key_set(keys))
                .set_delay(delay),
        )
        .await;
        Self { server }
    }

    /// Replace the published key set (key rotation).
    ///
    /// Also clears the recorded request history.
    pub async fn publish(&self, keys: &[&TestKey]) {
        self.server.reset().await;
        mount(
            &self.server,
            ResponseTemplate::new(200).set_body_json(key_set(keys)),
        )
        .await;
    }

    /// Issuer URL whose well-known key set is this server.
    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    /// Full key set URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set requests received since start (or last `publish`).
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Build a `{ "keys": [...] }` document from test keys.
pub fn key_set(keys: &[&TestKey]) -> Value {
    json!({
        "keys": keys.iter().map(|key| key.jwk_json()).collect::<Vec<_>>()
    })
}

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}
