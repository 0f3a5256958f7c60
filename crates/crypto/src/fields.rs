//! Authenticated encryption of individual secret fields

use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::{CryptoError, Result};
use crate::keys::UserKey;
use crate::{NONCE_LEN, TAG_LEN};

/// The stored triple for one encrypted field.
///
/// The three components are written and rewritten together; mixing a
/// ciphertext with another record's nonce or tag fails authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Ciphertext without the tag
    pub ciphertext: Vec<u8>,
    /// 12-byte nonce, fresh per encryption
    pub nonce: Vec<u8>,
    /// 16-byte GCM authentication tag
    pub auth_tag: Vec<u8>,
}

impl UserKey {
    /// Encrypts a plaintext field under this key with a fresh nonce.
    ///
    /// Empty plaintexts are valid and round-trip to empty.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<EncryptedField> {
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let sealed = self
            .cipher()
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(EncryptedField {
            ciphertext: ciphertext.to_vec(),
            nonce: nonce.to_vec(),
            auth_tag: tag.to_vec(),
        })
    }

    /// Authenticated inverse of [`UserKey::encrypt_field`].
    pub fn decrypt_field(&self, field: &EncryptedField) -> Result<String> {
        if field.nonce.len() != NONCE_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                field.nonce.len()
            )));
        }
        if field.auth_tag.len() != TAG_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "auth tag must be {TAG_LEN} bytes, got {}",
                field.auth_tag.len()
            )));
        }
        let mut sealed = Vec::with_capacity(field.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&field.ciphertext);
        sealed.extend_from_slice(&field.auth_tag);
        let plain = self
            .cipher()
            .decrypt(Nonce::from_slice(&field.nonce), sealed.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;
        String::from_utf8(plain).map_err(|_| CryptoError::InvalidPlaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key() -> UserKey {
        UserKey::from_bytes(&[9u8; 32]).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let k = key();
        let field = k.encrypt_field("Hunter2A!").unwrap();
        assert_eq!(field.nonce.len(), NONCE_LEN);
        assert_eq!(field.auth_tag.len(), TAG_LEN);
        assert_eq!(k.decrypt_field(&field).unwrap(), "Hunter2A!");
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let k = key();
        let field = k.encrypt_field("").unwrap();
        assert!(field.ciphertext.is_empty());
        assert_eq!(k.decrypt_field(&field).unwrap(), "");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let k = key();
        let a = k.encrypt_field("same").unwrap();
        let b = k.encrypt_field("same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn one_bit_tamper_fails_each_component() {
        let k = key();
        let field = k.encrypt_field("secret value").unwrap();

        let mut bad = field.clone();
        bad.ciphertext[0] ^= 0x01;
        assert!(k.decrypt_field(&bad).is_err());

        let mut bad = field.clone();
        bad.nonce[0] ^= 0x01;
        assert!(k.decrypt_field(&bad).is_err());

        let mut bad = field.clone();
        bad.auth_tag[0] ^= 0x01;
        assert!(k.decrypt_field(&bad).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let field = key().encrypt_field("secret").unwrap();
        let other = UserKey::from_bytes(&[8u8; 32]).unwrap();
        assert!(matches!(
            other.decrypt_field(&field).unwrap_err(),
            CryptoError::DecryptionFailed
        ));
    }

    #[test]
    fn malformed_nonce_rejected_before_decrypt() {
        let k = key();
        let mut field = k.encrypt_field("secret").unwrap();
        field.nonce.truncate(4);
        assert!(matches!(
            k.decrypt_field(&field).unwrap_err(),
            CryptoError::MalformedCiphertext(_)
        ));
    }
}
