//! Token authentication integration tests.
//!
//! Drives `TokenAuthenticator::authenticate` end to end: real HTTP key set
//! fetches against a wiremock JWKS endpoint, real signatures from fixed keys.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::clock::{Clock, FixedClock};
use common::jwt::MAX_JWT_SIZE_BYTES;
use dash_api::auth::{HttpJwksFetcher, JwksClient, JwksFetcher, TokenAuthenticator, TrustConfig};
use dash_test_utils::{
    rsa_primary_modulus, sign_hs256, MockJwksServer, TestKey, TestTokenBuilder, TEST_AUDIENCE,
};
use futures::future::join_all;
use jsonwebtoken::Algorithm;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;

/// Authenticator wired to a mock JWKS server.
struct TestAuth {
    authenticator: TokenAuthenticator,
    clock: Arc<FixedClock>,
}

impl TestAuth {
    fn new(server: &MockJwksServer) -> Self {
        Self::with_ttl(server, Duration::ZERO)
    }

    fn with_ttl(server: &MockJwksServer, cache_ttl: Duration) -> Self {
        let trust = TrustConfig::new(TEST_AUDIENCE, server.issuer()).unwrap();
        Self::with_trust(trust, cache_ttl, Duration::from_secs(5))
    }

    fn with_trust(trust: TrustConfig, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let fetcher: Arc<dyn JwksFetcher> = Arc::new(HttpJwksFetcher::new(fetch_timeout));
        let jwks_client = Arc::new(JwksClient::with_ttl(trust.jwks_url(), fetcher, cache_ttl));
        let clock = Arc::new(FixedClock::at(NOW));
        let authenticator =
            TokenAuthenticator::new(trust, jwks_client, Arc::clone(&clock) as Arc<dyn Clock>);
        Self {
            authenticator,
            clock,
        }
    }

    async fn authenticate(&self, token: &str) -> bool {
        self.authenticator.authenticate(token).await
    }
}

fn claims_for(server: &MockJwksServer) -> TestTokenBuilder {
    TestTokenBuilder::new(TEST_AUDIENCE, &server.issuer()).expires_at(NOW + 3600)
}

// ============================================================================
// Valid tokens
// ============================================================================

#[tokio::test]
async fn test_valid_rs256_token_accepted() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let token = key.sign(&claims_for(&server).build());
    assert!(auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_changing_only_audience_rejects() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let good = key.sign(&claims_for(&server).build());
    let other = key.sign(&claims_for(&server).audience("other-client").build());

    assert!(auth.authenticate(&good).await);
    assert!(!auth.authenticate(&other).await);
}

#[tokio::test]
async fn test_ec_and_eddsa_keys_accepted() {
    let ec = TestKey::ec_p256("ec-1");
    let ed = TestKey::ed25519(3, "ed-1");
    let server = MockJwksServer::start(&[&ec, &ed]).await;
    let auth = TestAuth::new(&server);

    assert!(auth.authenticate(&ec.sign(&claims_for(&server).build())).await);
    assert!(auth.authenticate(&ed.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_token_selects_key_by_kid() {
    let first = TestKey::rsa_primary("k1");
    let second = TestKey::rsa_secondary("k2");
    let server = MockJwksServer::start(&[&first, &second]).await;
    let auth = TestAuth::new(&server);

    assert!(auth.authenticate(&first.sign(&claims_for(&server).build())).await);
    assert!(auth.authenticate(&second.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_jwks_url_override() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let trust = TrustConfig::new(TEST_AUDIENCE, "https://issuer.example")
        .unwrap()
        .with_jwks_url(server.jwks_url())
        .unwrap();
    let auth = TestAuth::with_trust(trust, Duration::ZERO, Duration::from_secs(5));

    let claims = TestTokenBuilder::new(TEST_AUDIENCE, "https://issuer.example")
        .expires_at(NOW + 3600)
        .build();
    assert!(auth.authenticate(&key.sign(&claims)).await);
}

// ============================================================================
// Malformed input
// ============================================================================

#[tokio::test]
async fn test_malformed_tokens_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let not_json = format!("{}.{}.sig", "eyJhbGciOiJSUzI1NiJ9", "bm90IGpzb24");
    for token in [
        "",
        "single",
        "only.two",
        "one.two.three.four",
        ".payload.signature",
        "!!!invalid!!!.payload.signature",
        not_json.as_str(),
    ] {
        assert!(!auth.authenticate(token).await, "token {token:?} should be rejected");
    }

    // Structural failures never reach the network
    assert_eq!(server.fetch_count().await, 0);
}

#[tokio::test]
async fn test_oversized_token_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let padding = "x".repeat(MAX_JWT_SIZE_BYTES);
    let token = key.sign(&claims_for(&server).claim("padding", json!(padding)).build());
    assert!(token.len() > MAX_JWT_SIZE_BYTES);

    assert!(!auth.authenticate(&token).await);
    assert_eq!(server.fetch_count().await, 0);
}

// ============================================================================
// Key resolution
// ============================================================================

#[tokio::test]
async fn test_unknown_kid_rejected() {
    let published = TestKey::rsa_primary("k1");
    let retired = TestKey::rsa_secondary("k0");
    let server = MockJwksServer::start(&[&published]).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&retired.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_signature_from_different_key_rejected() {
    let published = TestKey::rsa_primary("k1");
    let impostor = TestKey::rsa_secondary("k1");
    let server = MockJwksServer::start(&[&published]).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&impostor.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_jwks_server_error_rejects_valid_token() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::failing(500).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&key.sign(&claims_for(&server).build())).await);
    assert_eq!(server.fetch_count().await, 1);
}

#[tokio::test]
async fn test_jwks_not_found_rejects_valid_token() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::failing(404).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&key.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_invalid_jwks_document_rejects_valid_token() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::with_document(json!({ "not_keys": [] })).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&key.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_jwks_timeout_rejects_valid_token() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::slow(&[&key], Duration::from_secs(2)).await;
    let trust = TrustConfig::new(TEST_AUDIENCE, server.issuer()).unwrap();
    let auth = TestAuth::with_trust(trust, Duration::ZERO, Duration::from_millis(200));

    assert!(!auth.authenticate(&key.sign(&claims_for(&server).build())).await);
}

// ============================================================================
// Algorithm selection
// ============================================================================

#[tokio::test]
async fn test_hs256_token_using_public_key_as_secret_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let token = sign_hs256(
        rsa_primary_modulus().as_bytes(),
        "k1",
        &claims_for(&server).build(),
    );
    assert!(!auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_header_alg_differing_from_key_alg_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    // Validly signed by the same RSA key, but with RS384 instead of the published RS256
    let token = key
        .clone()
        .with_algorithm(Algorithm::RS384)
        .sign(&claims_for(&server).build());
    assert!(!auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_key_alg_decides_verification() {
    // Key set publishes RS384 for this key; an RS384 token verifies
    let key = TestKey::rsa_primary("k1").with_algorithm(Algorithm::RS384);
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    assert!(auth.authenticate(&key.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_key_without_alg_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server =
        MockJwksServer::with_document(json!({ "keys": [key.jwk_json_without_alg()] })).await;
    let auth = TestAuth::new(&server);

    assert!(!auth.authenticate(&key.sign(&claims_for(&server).build())).await);
}

// ============================================================================
// Claims
// ============================================================================

#[tokio::test]
async fn test_expiry_boundary() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    // exp one second in the future
    let token = key.sign(&claims_for(&server).expires_at(NOW + 1).build());
    assert!(auth.authenticate(&token).await);

    // exp exactly now
    auth.clock.set(NOW + 1);
    assert!(!auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_issuer_mismatch_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let token = key.sign(
        &claims_for(&server)
            .issuer("https://cognito-idp.us-east-1.amazonaws.com/other-pool")
            .build(),
    );
    assert!(!auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_access_token_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let token = key.sign(&claims_for(&server).token_use("access").build());
    assert!(!auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_missing_claims_rejected() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    for claim in ["exp", "aud", "iss", "token_use"] {
        let token = key.sign(&claims_for(&server).without(claim).build());
        assert!(
            !auth.authenticate(&token).await,
            "token without {claim} should be rejected"
        );
    }
}

// ============================================================================
// Repeatability and caching
// ============================================================================

#[tokio::test]
async fn test_authenticate_is_idempotent() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let good = key.sign(&claims_for(&server).build());
    let bad = key.sign(&claims_for(&server).token_use("access").build());

    assert!(auth.authenticate(&good).await);
    assert!(auth.authenticate(&good).await);
    assert!(!auth.authenticate(&bad).await);
    assert!(!auth.authenticate(&bad).await);

    // No cache by default: one fetch per call
    assert_eq!(server.fetch_count().await, 4);
}

#[tokio::test]
async fn test_retired_key_rejected_after_rotation() {
    let old = TestKey::rsa_primary("k1");
    let new = TestKey::rsa_secondary("k2");
    let server = MockJwksServer::start(&[&old]).await;
    let auth = TestAuth::new(&server);

    let old_token = old.sign(&claims_for(&server).build());
    assert!(auth.authenticate(&old_token).await);

    server.publish(&[&new]).await;

    assert!(!auth.authenticate(&old_token).await);
    assert!(auth.authenticate(&new.sign(&claims_for(&server).build())).await);
}

#[tokio::test]
async fn test_cache_serves_repeat_lookups() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::with_ttl(&server, Duration::from_secs(60));

    let token = key.sign(&claims_for(&server).build());
    assert!(auth.authenticate(&token).await);
    assert!(auth.authenticate(&token).await);

    assert_eq!(server.fetch_count().await, 1);
}

#[tokio::test]
async fn test_cache_refetches_on_unknown_kid() {
    let first = TestKey::rsa_primary("k1");
    let rotated = TestKey::rsa_secondary("k2");
    let server = MockJwksServer::start(&[&first]).await;
    let auth = TestAuth::with_ttl(&server, Duration::from_secs(60));

    assert!(auth.authenticate(&first.sign(&claims_for(&server).build())).await);

    // New key published while the cache is still fresh
    server.publish(&[&first, &rotated]).await;

    assert!(auth.authenticate(&rotated.sign(&claims_for(&server).build())).await);
    assert_eq!(server.fetch_count().await, 1);
}

#[tokio::test]
async fn test_cache_does_not_keep_failures() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::failing(503).await;
    let auth = TestAuth::with_ttl(&server, Duration::from_secs(60));
    let token = key.sign(&claims_for(&server).build());

    assert!(!auth.authenticate(&token).await);

    server.publish(&[&key]).await;
    assert!(auth.authenticate(&token).await);
}

#[tokio::test]
async fn test_concurrent_authentications() {
    let key = TestKey::rsa_primary("k1");
    let server = MockJwksServer::start(&[&key]).await;
    let auth = TestAuth::new(&server);

    let good = key.sign(&claims_for(&server).build());
    let bad = key.sign(&claims_for(&server).audience("other-client").build());

    let results = join_all((0..16).map(|i| {
        let token = if i % 2 == 0 { &good } else { &bad };
        auth.authenticate(token)
    }))
    .await;

    for (i, accepted) in results.into_iter().enumerate() {
        assert_eq!(accepted, i % 2 == 0, "call {i}");
    }
}
