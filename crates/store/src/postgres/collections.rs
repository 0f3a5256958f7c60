//! Collections

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{Collection, NewCollection};
use crate::traits::CollectionStore;

use super::PostgresStore;

#[async_trait]
impl CollectionStore for PostgresStore {
    async fn create(&self, account_id: Uuid, collection: NewCollection) -> Result<Collection> {
        let created = sqlx::query_as::<_, Collection>(
            "INSERT INTO collections (id, account_id, name, description, icon, color) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.icon)
        .bind(&collection.color)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE account_id = $1 ORDER BY name ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collections)
    }

    async fn find(&self, account_id: Uuid, id: Uuid) -> Result<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE id = $1 AND account_id = $2",
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(collection)
    }

    async fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        collection: NewCollection,
    ) -> Result<Collection> {
        let updated = sqlx::query_as::<_, Collection>(
            "UPDATE collections SET name = $3, description = $4, icon = $5, color = $6 \
             WHERE id = $1 AND account_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(account_id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.icon)
        .bind(&collection.color)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        // Re-parenting and deletion commit together; the FK's ON DELETE
        // SET NULL would cover entries too, but the explicit update keeps
        // updated_at honest for list ordering.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE vault_entries SET collection_id = NULL, updated_at = NOW() \
             WHERE collection_id = $1 AND account_id = $2",
        )
        .bind(id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM collections WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn move_entries(
        &self,
        account_id: Uuid,
        entry_ids: &[Uuid],
        collection_id: Option<Uuid>,
    ) -> Result<u64> {
        if entry_ids.is_empty() {
            return Ok(0);
        }
        if let Some(target) = collection_id {
            sqlx::query("SELECT 1 FROM collections WHERE id = $1 AND account_id = $2")
                .bind(target)
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;
        }
        let result = sqlx::query(
            "UPDATE vault_entries SET collection_id = $3, updated_at = NOW() \
             WHERE account_id = $1 AND id = ANY($2)",
        )
        .bind(account_id)
        .bind(entry_ids)
        .bind(collection_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
