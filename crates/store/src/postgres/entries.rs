//! Vault entries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{EntryFilter, EntryUpdate, NewEntry, Tag, VaultEntry};
use crate::traits::EntryStore;

use super::{PostgresStore, like_pattern};

#[async_trait]
impl EntryStore for PostgresStore {
    async fn insert(&self, account_id: Uuid, entry: NewEntry) -> Result<VaultEntry> {
        let mut tx = self.pool.begin().await?;

        if let Some(collection_id) = entry.collection_id {
            require_collection(&mut tx, account_id, collection_id).await?;
        }

        let created = sqlx::query_as::<_, VaultEntry>(
            "INSERT INTO vault_entries \
             (id, account_id, title, username, site, notes, \
              secret_ciphertext, secret_nonce, secret_tag, \
              collection_id, is_favourite, is_pinned, strength) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&entry.title)
        .bind(&entry.username)
        .bind(&entry.site)
        .bind(&entry.notes)
        .bind(&entry.secret.ciphertext)
        .bind(&entry.secret.nonce)
        .bind(&entry.secret.auth_tag)
        .bind(entry.collection_id)
        .bind(entry.is_favourite)
        .bind(entry.is_pinned)
        .bind(entry.strength)
        .fetch_one(&mut *tx)
        .await?;

        if !entry.tag_ids.is_empty() {
            attach_tags(&mut tx, account_id, created.id, &entry.tag_ids).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list(&self, account_id: Uuid, filter: &EntryFilter) -> Result<Vec<VaultEntry>> {
        let mut qb = QueryBuilder::new("SELECT * FROM vault_entries WHERE account_id = ");
        qb.push_bind(account_id);

        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = like_pattern(query.trim());
            qb.push(" AND (title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR username ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR site ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR notes ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(collection_id) = filter.collection_id {
            qb.push(" AND collection_id = ");
            qb.push_bind(collection_id);
        }
        if !filter.tag_ids.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM vault_entry_tags vet \
                 WHERE vet.entry_id = vault_entries.id AND vet.tag_id = ANY(",
            );
            qb.push_bind(filter.tag_ids.clone());
            qb.push("))");
        }
        if let Some(is_favourite) = filter.is_favourite {
            qb.push(" AND is_favourite = ");
            qb.push_bind(is_favourite);
        }
        if let Some(is_pinned) = filter.is_pinned {
            qb.push(" AND is_pinned = ");
            qb.push_bind(is_pinned);
        }
        if let Some(min) = filter.strength_min {
            qb.push(" AND strength >= ");
            qb.push_bind(min);
        }
        if let Some(max) = filter.strength_max {
            qb.push(" AND strength <= ");
            qb.push_bind(max);
        }

        qb.push(" ORDER BY is_pinned DESC, is_favourite DESC, updated_at DESC, id ASC");

        let entries = qb
            .build_query_as::<VaultEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn get(&self, account_id: Uuid, id: Uuid) -> Result<Option<VaultEntry>> {
        let entry = sqlx::query_as::<_, VaultEntry>(
            "SELECT * FROM vault_entries WHERE id = $1 AND account_id = $2",
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn update(&self, account_id: Uuid, id: Uuid, update: EntryUpdate) -> Result<VaultEntry> {
        let mut tx = self.pool.begin().await?;

        let mut entry = sqlx::query_as::<_, VaultEntry>(
            "SELECT * FROM vault_entries WHERE id = $1 AND account_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if let Some(title) = update.title {
            entry.title = title;
        }
        if let Some(username) = update.username {
            entry.username = username;
        }
        if let Some(site) = update.site {
            entry.site = site;
        }
        if let Some(notes) = update.notes {
            entry.notes = notes;
        }
        if let Some((secret, strength)) = update.secret {
            entry.secret_ciphertext = secret.ciphertext;
            entry.secret_nonce = secret.nonce;
            entry.secret_tag = secret.auth_tag;
            entry.strength = Some(strength);
        }
        if let Some(collection_id) = update.collection_id {
            if let Some(target) = collection_id {
                require_collection(&mut tx, account_id, target).await?;
            }
            entry.collection_id = collection_id;
        }
        if let Some(is_favourite) = update.is_favourite {
            entry.is_favourite = is_favourite;
        }
        if let Some(is_pinned) = update.is_pinned {
            entry.is_pinned = is_pinned;
        }

        let updated = sqlx::query_as::<_, VaultEntry>(
            "UPDATE vault_entries SET \
             title = $3, username = $4, site = $5, notes = $6, \
             secret_ciphertext = $7, secret_nonce = $8, secret_tag = $9, \
             collection_id = $10, is_favourite = $11, is_pinned = $12, \
             strength = $13, updated_at = NOW() \
             WHERE id = $1 AND account_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(account_id)
        .bind(&entry.title)
        .bind(&entry.username)
        .bind(&entry.site)
        .bind(&entry.notes)
        .bind(&entry.secret_ciphertext)
        .bind(&entry.secret_nonce)
        .bind(&entry.secret_tag)
        .bind(entry.collection_id)
        .bind(entry.is_favourite)
        .bind(entry.is_pinned)
        .bind(entry.strength)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(tag_ids) = update.tag_ids {
            sqlx::query("DELETE FROM vault_entry_tags WHERE entry_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if !tag_ids.is_empty() {
                attach_tags(&mut tx, account_id, id, &tag_ids).await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn touch_last_used(&self, account_id: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE vault_entries SET last_used_at = $3 WHERE id = $1 AND account_id = $2",
        )
        .bind(id)
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vault_entries WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn bulk_delete(&self, account_id: Uuid, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result =
            sqlx::query("DELETE FROM vault_entries WHERE account_id = $1 AND id = ANY($2)")
                .bind(account_id)
                .bind(ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn set_favourite(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry> {
        let entry = sqlx::query_as::<_, VaultEntry>(
            "UPDATE vault_entries SET is_favourite = $3, updated_at = NOW() \
             WHERE id = $1 AND account_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(account_id)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        entry.ok_or(StoreError::NotFound)
    }

    async fn set_pinned(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry> {
        let entry = sqlx::query_as::<_, VaultEntry>(
            "UPDATE vault_entries SET is_pinned = $3, updated_at = NOW() \
             WHERE id = $1 AND account_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(account_id)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        entry.ok_or(StoreError::NotFound)
    }

    async fn all_for_account(&self, account_id: Uuid) -> Result<Vec<VaultEntry>> {
        let entries = sqlx::query_as::<_, VaultEntry>(
            "SELECT * FROM vault_entries WHERE account_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn tags_for_entry(&self, account_id: Uuid, id: Uuid) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.* FROM tags t \
             JOIN vault_entry_tags vet ON vet.tag_id = t.id \
             WHERE vet.entry_id = $1 AND t.account_id = $2 \
             ORDER BY t.name ASC",
        )
        .bind(id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn exists_duplicate(
        &self,
        account_id: Uuid,
        title: &str,
        username: &str,
        site: Option<&str>,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM vault_entries \
             WHERE account_id = $1 AND title = $2 AND username = $3 \
             AND site IS NOT DISTINCT FROM $4 LIMIT 1",
        )
        .bind(account_id)
        .bind(title)
        .bind(username)
        .bind(site)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}

/// Fails with `NotFound` unless the collection exists under this account.
async fn require_collection(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
    collection_id: Uuid,
) -> Result<()> {
    sqlx::query("SELECT 1 FROM collections WHERE id = $1 AND account_id = $2")
        .bind(collection_id)
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(|_| ())
        .ok_or(StoreError::NotFound)
}

/// Inserts tag joins, restricted to tags the account owns.
async fn attach_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
    entry_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<()> {
    sqlx::query(
        "INSERT INTO vault_entry_tags (entry_id, tag_id) \
         SELECT $1, t.id FROM tags t WHERE t.account_id = $2 AND t.id = ANY($3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(entry_id)
    .bind(account_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
