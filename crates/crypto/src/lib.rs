//! Strongbox crypto primitives
//!
//! The two-tier key hierarchy and the token helpers the rest of the
//! workspace builds on:
//!
//! - **Master key** — 32 bytes, supplied by the deployment environment,
//!   wraps per-user keys. Never touches the database.
//! - **User key** — 32 bytes, generated per account, encrypts that
//!   account's secret fields. Stored only in wrapped form.
//! - **Field encryption** — AES-256-GCM with a fresh 12-byte nonce per
//!   call; ciphertext, nonce and authentication tag are stored together
//!   and must be rewritten together.
//! - **Opaque tokens** — URL-safe random tokens (refresh credentials,
//!   share capabilities) persisted only as SHA-256 fingerprints.
//!
//! Key rotation is a pure data transformation: [`rewrap`] unwraps with the
//! old master key and wraps with the new one, no schema change involved.

#![forbid(unsafe_code)]

mod error;
mod fields;
mod keys;
mod token;

pub use error::CryptoError;
pub use fields::EncryptedField;
pub use keys::{KEY_LEN, MasterKey, UserKey, WRAPPED_LEN, WrappedKey, rewrap};
pub use token::{OpaqueToken, fingerprint};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
