//! Error type for store operations

use thiserror::Error;

/// Persistence errors surfaced to the service layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row absent, or present but owned by another account
    #[error("record not found")]
    NotFound,

    /// Uniqueness constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything the backend reports beyond the above
    #[error("database error: {0}")]
    Database(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}
