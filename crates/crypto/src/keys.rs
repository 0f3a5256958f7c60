//! Master and per-user keys, key wrapping

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::{NONCE_LEN, TAG_LEN};

/// Key length in bytes for both master and per-user keys.
pub const KEY_LEN: usize = 32;

/// Fixed size of a wrapped user key: `nonce(12) ‖ tag(16) ‖ ciphertext(32)`.
pub const WRAPPED_LEN: usize = NONCE_LEN + TAG_LEN + KEY_LEN;

/// Server-held master key. Wraps per-user keys, never persisted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

/// Per-user data encryption key. Stored only in wrapped form.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserKey([u8; KEY_LEN]);

/// Opaque wrapped-key blob as stored on the account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey[REDACTED]")
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserKey[REDACTED]")
    }
}

impl MasterKey {
    /// Builds a master key from raw bytes. Fails unless exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Builds a master key from the base64 value the deployment environment
    /// provides. The decoded value must be exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = B64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Encrypts `user_key` under this master key with a fresh nonce.
    ///
    /// Output layout is fixed at `nonce ‖ tag ‖ ciphertext` (60 bytes) so
    /// rotation stays a pure data transformation.
    pub fn wrap(&self, user_key: &UserKey) -> Result<WrappedKey> {
        let cipher = self.cipher();
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let sealed = cipher
            .encrypt(&nonce, user_key.0.as_slice())
            .map_err(|_| CryptoError::EncryptionFailed)?;
        // aes-gcm appends the tag to the ciphertext; re-order to the
        // stored layout.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        let mut blob = Vec::with_capacity(WRAPPED_LEN);
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);
        Ok(WrappedKey(blob))
    }

    /// Inverse of [`MasterKey::wrap`]. Rejects blobs of the wrong size and
    /// any blob whose authentication tag does not verify.
    pub fn unwrap(&self, wrapped: &WrappedKey) -> Result<UserKey> {
        let blob = &wrapped.0;
        if blob.len() != WRAPPED_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "wrapped key must be {WRAPPED_LEN} bytes, got {}",
                blob.len()
            )));
        }
        let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let mut sealed = Vec::with_capacity(KEY_LEN + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);
        let mut plain = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), sealed.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let key = UserKey::from_bytes(&plain);
        plain.zeroize();
        key
    }

    pub(crate) fn cipher(&self) -> Aes256Gcm {
        // Length is KEY_LEN by construction.
        Aes256Gcm::new_from_slice(&self.0).expect("key length is 32")
    }
}

impl UserKey {
    /// Generates a fresh 32-byte key from the OS CSPRNG.
    pub fn generate() -> Self {
        use rand::RngExt;
        let mut rng = rand::rng();
        let bytes: [u8; KEY_LEN] = rng.random();
        Self(bytes)
    }

    /// Builds a user key from raw bytes. Fails unless exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new_from_slice(&self.0).expect("key length is 32")
    }

    /// Constant-time equality, for tests and duplicate analysis only.
    pub fn eq_ct(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}

impl WrappedKey {
    /// Wraps raw blob bytes loaded from storage.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The stored representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes into the stored representation.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Re-wraps a user key under a new master key.
///
/// The offline rotation pass runs this over every account row.
pub fn rewrap(wrapped: &WrappedKey, old: &MasterKey, new: &MasterKey) -> Result<WrappedKey> {
    let user_key = old.unwrap(wrapped)?;
    new.wrap(&user_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn master(byte: u8) -> MasterKey {
        MasterKey::from_bytes(&[byte; KEY_LEN]).unwrap()
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let mk = master(1);
        let uk = UserKey::generate();
        let wrapped = mk.wrap(&uk).unwrap();

        assert_eq!(wrapped.as_bytes().len(), WRAPPED_LEN);
        let unwrapped = mk.unwrap(&wrapped).unwrap();
        assert!(uk.eq_ct(&unwrapped));
    }

    #[test]
    fn wrap_is_randomised() {
        let mk = master(1);
        let uk = UserKey::generate();
        let a = mk.wrap(&uk).unwrap();
        let b = mk.wrap(&uk).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unwrap_with_wrong_master_fails() {
        let uk = UserKey::generate();
        let wrapped = master(1).wrap(&uk).unwrap();
        let err = master(2).unwrap(&wrapped).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed));
    }

    #[test]
    fn unwrap_rejects_tampered_blob() {
        let mk = master(1);
        let wrapped = mk.wrap(&UserKey::generate()).unwrap();

        // Flip one bit in each region: nonce, tag, ciphertext.
        for index in [0, NONCE_LEN, NONCE_LEN + TAG_LEN] {
            let mut bytes = wrapped.as_bytes().to_vec();
            bytes[index] ^= 0x01;
            let err = mk.unwrap(&WrappedKey::from_bytes(bytes)).unwrap_err();
            assert!(matches!(err, CryptoError::DecryptionFailed));
        }
    }

    #[test]
    fn unwrap_rejects_short_blob() {
        let err = master(1)
            .unwrap(&WrappedKey::from_bytes(vec![0u8; 10]))
            .unwrap_err();
        assert!(matches!(err, CryptoError::MalformedCiphertext(_)));
    }

    #[test]
    fn master_key_from_base64_enforces_length() {
        use base64::Engine;
        let ok = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        assert!(MasterKey::from_base64(&ok).is_ok());

        let short = base64::engine::general_purpose::STANDARD.encode([7u8; 16]);
        assert!(matches!(
            MasterKey::from_base64(&short).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        ));

        assert!(MasterKey::from_base64("not base64!!!").is_err());
    }

    #[test]
    fn rewrap_moves_key_between_masters() {
        let old = master(1);
        let new = master(2);
        let uk = UserKey::generate();

        let wrapped = old.wrap(&uk).unwrap();
        let rewrapped = rewrap(&wrapped, &old, &new).unwrap();

        assert!(old.unwrap(&rewrapped).is_err());
        assert!(uk.eq_ct(&new.unwrap(&rewrapped).unwrap()));
    }
}
