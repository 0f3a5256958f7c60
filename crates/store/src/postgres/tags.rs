//! Tags and entry assignments

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::Tag;
use crate::traits::TagStore;

use super::PostgresStore;

#[async_trait]
impl TagStore for PostgresStore {
    async fn create(&self, account_id: Uuid, name: &str) -> Result<Tag> {
        // DO UPDATE (rather than DO NOTHING) makes the statement return
        // the surviving row, so concurrent creates all see the same tag.
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, account_id, name) VALUES ($1, $2, $3) \
             ON CONFLICT (account_id, name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE account_id = $1 ORDER BY name ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_entry_tags(
        &self,
        account_id: Uuid,
        entry_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT 1 FROM vault_entries WHERE id = $1 AND account_id = $2")
            .bind(entry_id)
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        sqlx::query("DELETE FROM vault_entry_tags WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO vault_entry_tags (entry_id, tag_id) \
                 SELECT $1, t.id FROM tags t WHERE t.account_id = $2 AND t.id = ANY($3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(entry_id)
            .bind(account_id)
            .bind(tag_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
