//! Error type for cryptographic operations

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Deliberately coarse: callers map every variant to a generic internal
/// error at the HTTP boundary, so the variants exist for logs and tests,
/// not for clients.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material has the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Wrapped-key blob or ciphertext is structurally malformed
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Decryption failed - wrong key or tampered data
    #[error("decryption failed - wrong key or tampered data")]
    DecryptionFailed,

    /// Encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decrypted bytes are not valid UTF-8
    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

/// Result type alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
