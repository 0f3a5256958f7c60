//! Share capabilities

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{NewShare, ShareCapability};
use crate::traits::ShareStore;

use super::PostgresStore;

#[async_trait]
impl ShareStore for PostgresStore {
    async fn create(&self, account_id: Uuid, share: NewShare) -> Result<ShareCapability> {
        let created = sqlx::query_as::<_, ShareCapability>(
            "INSERT INTO share_capabilities \
             (id, entry_id, account_id, token_fingerprint, max_views, expires_at, \
              include_secret, include_notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(share.entry_id)
        .bind(account_id)
        .bind(&share.token_fingerprint)
        .bind(share.max_views)
        .bind(share.expires_at)
        .bind(share.include_secret)
        .bind(share.include_notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn consume(
        &self,
        token_fingerprint: &str,
        accessor_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareCapability>> {
        // The check and the increment are one statement, so two concurrent
        // accessors cannot both take the last remaining view.
        let consumed = sqlx::query_as::<_, ShareCapability>(
            "UPDATE share_capabilities \
             SET view_count = view_count + 1, accessed_at = $3, accessor_address = $2 \
             WHERE token_fingerprint = $1 AND expires_at > $3 AND view_count < max_views \
             RETURNING *",
        )
        .bind(token_fingerprint)
        .bind(accessor_address)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consumed)
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<ShareCapability>> {
        let shares = sqlx::query_as::<_, ShareCapability>(
            "SELECT * FROM share_capabilities WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shares)
    }

    async fn revoke(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM share_capabilities WHERE id = $1 AND account_id = $2")
                .bind(id)
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
