//! Postgres backend
//!
//! Runtime-checked sqlx queries over a shared [`PgPool`]. Multi-write
//! operations (entry + tag joins, collection delete + re-parenting, tag
//! replacement) run inside a single transaction; share consumption is one
//! conditional `UPDATE` so the view-count check and the increment cannot
//! interleave.

mod audit;
mod collections;
mod entries;
mod identity;
mod shares;
mod tags;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{Result, StoreError};

/// Shared handle for all Postgres-backed stores.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a bounded pool. The pool is the concurrency ceiling of the
    /// whole server; `max_connections` comes from configuration.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Applies embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escapes LIKE metacharacters and wraps in `%` for substring matching.
pub(crate) fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("plain"), "%plain%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }
}
