//! Opaque tokens and fingerprints

use sha2::{Digest, Sha256};

/// A raw opaque token (refresh credential, share capability).
///
/// Handed to the client exactly once; the server persists only its
/// [`fingerprint`]. The Debug impl is redacted so a stray log line cannot
/// leak it.
#[derive(Clone, PartialEq, Eq)]
pub struct OpaqueToken(String);

impl OpaqueToken {
    /// Generates a token with 256 bits of entropy, URL-safe base64 encoded.
    #[must_use]
    pub fn generate() -> Self {
        use rand::RngExt;
        let mut rng = rand::rng();
        let random_bytes: [u8; 32] = rng.random();
        Self(base64_url_encode(&random_bytes))
    }

    /// Wraps a token value received from a client.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token value, for handing to the client.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex fingerprint used for storage and lookup.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl std::fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpaqueToken[REDACTED]")
    }
}

/// Collision-resistant one-way digest over a token (SHA-256, hex).
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encode bytes as URL-safe base64 (no padding)
fn base64_url_encode(input: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, input)
}
