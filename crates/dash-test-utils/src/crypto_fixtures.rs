//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible signing keys in the three families a user pool key
//! set can publish (RSA, EC, OKP), together with their public JWK form.
//! Ed25519 keys are derived from a seed; RSA and P-256 keys are fixed PEM
//! fixtures checked into `fixtures/`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

const RSA_PRIMARY_PEM: &str = include_str!("../fixtures/rsa1_private.pem");
const RSA_PRIMARY_N: &str = "s-JfzebaNkxGkz-fHx8TmNIFOa_r8i-JpzLDhCt79RZabgERu_W3S231kxlBipzMO0eeQS5STGfVLQA8XoOpZ8Eh32GXMyuE3uotSdLqNt3WYgpwgAXJZTV5_AyITkCvdUv64D0je7nSWBRr7hIDgcrXzuHITBDMikYMyZQmDRdINDBQiSLWkW1GHaN3kGM7Xk0eZP4hGa7H9ft2pAbj3SBdOeGmwox52XsB1kf_0pV1-C1ufQN7iVXkumYxGeYybhGs1n04mmeEzE3zRwLRtLZqagxNsJclrxkFH3j7WqT2rfEJVgRwTmi4EVFWX94sHTJ0qZKg8KfUjV5J7EzytQ";

const RSA_SECONDARY_PEM: &str = include_str!("../fixtures/rsa2_private.pem");
const RSA_SECONDARY_N: &str = "mMVmfTouOQMovr1CId_hwxoXqKtX6__KSIml5R_j5OQ-cJRxrtqXoe9VyubBbcH4JyF5A8ELFe-HVzh1d6_N6YIpIpTFGwKOWr9D9d5Nqdrg0BsoJx5ceHKpi2TNvbyXwAZnfXHyq5qd-sOoYWNkqVcCW5qm0Y3w1e-InTWOVM5h5DLhrzBA86Dp70GME0Hri-fv4pPEZd8GApLqEG41RTfCu0M_bc98sBq2HlUIpZ63N1arFQnnrJXithM4jxbOOUI4hu0X2wYb2N6d-39367lx6oj_C08a2CsCGqDmuW8ADcQG8QvbQxFLZ8g_IxGYJWlmlsgo-EbqdvL75HvvfQ";

const RSA_EXPONENT: &str = "AQAB";

const EC_P256_PEM: &str = include_str!("../fixtures/ec1_private.pem");
const EC_P256_X: &str = "VTMygQbRo8INeJQb3TLpi6jtepsWKSb1G7Wcdv6BRQg";
const EC_P256_Y: &str = "AwGWhTVFlgcaUcLPzOpBJwq3vKNhGi_RjlxLn_qpUuY";

/// A signing key plus the public JWK a key set would publish for it.
#[derive(Clone)]
pub struct TestKey {
    kid: String,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    /// Public JWK members without `kid` and `alg`.
    public_jwk: Value,
}

impl TestKey {
    /// The first fixed RSA key, signing with RS256.
    pub fn rsa_primary(kid: &str) -> Self {
        Self::rsa(RSA_PRIMARY_PEM, RSA_PRIMARY_N, kid)
    }

    /// A second, unrelated RSA key, signing with RS256.
    ///
    /// Used for signature-mismatch and key-rotation tests.
    pub fn rsa_secondary(kid: &str) -> Self {
        Self::rsa(RSA_SECONDARY_PEM, RSA_SECONDARY_N, kid)
    }

    fn rsa(pem: &str, modulus: &str, kid: &str) -> Self {
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("RSA fixture PEM should parse");
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            encoding_key,
            public_jwk: json!({
                "kty": "RSA",
                "use": "sig",
                "n": modulus,
                "e": RSA_EXPONENT,
            }),
        }
    }

    /// The fixed P-256 key, signing with ES256.
    pub fn ec_p256(kid: &str) -> Self {
        let encoding_key =
            EncodingKey::from_ec_pem(EC_P256_PEM.as_bytes()).expect("EC fixture PEM should parse");
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::ES256,
            encoding_key,
            public_jwk: json!({
                "kty": "EC",
                "use": "sig",
                "crv": "P-256",
                "x": EC_P256_X,
                "y": EC_P256_Y,
            }),
        }
    }

    /// A deterministic Ed25519 key, signing with EdDSA.
    ///
    /// The same seed always produces the same keypair.
    pub fn ed25519(seed: u8, kid: &str) -> Self {
        let seed_bytes = seed_bytes(seed);
        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("Failed to create test keypair");
        let public_key_bytes = key_pair.public_key().as_ref().to_vec();
        let pkcs8 = build_pkcs8_from_seed(&seed_bytes);

        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::EdDSA,
            encoding_key: EncodingKey::from_ed_der(&pkcs8),
            public_jwk: json!({
                "kty": "OKP",
                "use": "sig",
                "crv": "Ed25519",
                "x": URL_SAFE_NO_PAD.encode(&public_key_bytes),
            }),
        }
    }

    /// Same key material, signing with `algorithm` (must be the same family).
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The public JWK, declaring this key's signing algorithm.
    pub fn jwk_json(&self) -> Value {
        self.jwk_json_with_alg(&algorithm_name(self.algorithm))
    }

    /// The public JWK, declaring an arbitrary `alg`.
    pub fn jwk_json_with_alg(&self, alg: &str) -> Value {
        let mut jwk = self.jwk_json_without_alg();
        jwk["alg"] = json!(alg);
        jwk
    }

    /// The public JWK with no `alg` member.
    pub fn jwk_json_without_alg(&self) -> Value {
        let mut jwk = self.public_jwk.clone();
        jwk["kid"] = json!(self.kid);
        jwk
    }

    /// Sign `claims` with a standard header (`alg`, `typ: JWT`, `kid`).
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());
        self.sign_with_header(&header, claims)
    }

    /// Sign `claims` with a caller-built header.
    ///
    /// The header's `alg` must belong to this key's family.
    pub fn sign_with_header(&self, header: &Header, claims: &Value) -> String {
        encode(header, claims, &self.encoding_key).expect("Failed to sign token")
    }
}

/// MAC `claims` with HS256 under `secret`, with the given `kid`.
///
/// Builds the classic algorithm-confusion token: public key material used as
/// an HMAC secret.
pub fn sign_hs256(secret: &[u8], kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("Failed to sign token")
}

/// Public modulus of the primary RSA fixture, as published in its JWK.
pub fn rsa_primary_modulus() -> &'static str {
    RSA_PRIMARY_N
}

/// JWK `alg` string for an algorithm.
pub fn algorithm_name(algorithm: Algorithm) -> String {
    serde_json::to_value(algorithm)
        .ok()
        .and_then(|v| v.as_str().map(ToString::to_string))
        .expect("Algorithm serializes to a string")
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    // Fill rest with deterministic pattern
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// ring does not expose PKCS#8 for a seeded keypair, so it is assembled by hand.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey: OCTET STRING { OCTET STRING (32-byte seed) }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
