//! Service-layer error taxonomy
//!
//! Opaque kinds with implementation-facing messages. The HTTP surface maps
//! each kind to a status code; nothing here is written for end users.

use serde::Serialize;
use thiserror::Error;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Service-layer errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected by validation
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// Login rejected. Lookup failure and credential mismatch share this
    /// value so the response never discloses which one happened.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bearer credential missing, invalid or expired
    #[error("unauthenticated (expired: {expired})")]
    Unauthenticated {
        /// True when the credential was well-formed but past its lifetime;
        /// the caller should attempt a refresh rather than re-login.
        expired: bool,
    },

    /// Caller authenticated but not the owner of the target
    #[error("forbidden")]
    Forbidden,

    /// Target absent — or a share capability that is exhausted or expired,
    /// deliberately conflated to avoid disclosing capability existence
    #[error("not found")]
    NotFound,

    /// Uniqueness violation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Cryptographic failure. Never exposed to clients beyond a generic
    /// internal error.
    #[error("crypto error: {0}")]
    Crypto(#[from] strongbox_crypto::CryptoError),

    /// Catch-all
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<strongbox_store::StoreError> for ServiceError {
    fn from(err: strongbox_store::StoreError) -> Self {
        match err {
            strongbox_store::StoreError::NotFound => Self::NotFound,
            strongbox_store::StoreError::Conflict(what) => Self::Conflict(what),
            strongbox_store::StoreError::Database(message) => Self::Internal(message),
        }
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
