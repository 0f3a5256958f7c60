//! Accounts, OAuth links and refresh records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Account, NewAccount, OAuthProfile, RefreshTokenRecord};
use crate::traits::IdentityStore;

use super::PostgresStore;

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let created = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, email, credential_hash, display_name, wrapped_key) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.credential_hash)
        .bind(&account.display_name)
        .bind(&account.wrapped_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn set_wrapped_key(&self, account_id: Uuid, wrapped_key: &[u8]) -> Result<Account> {
        // COALESCE keeps an already-materialised key, so a racing first
        // sign-in cannot replace the winner's key.
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET wrapped_key = COALESCE(wrapped_key, $2), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(account_id)
        .bind(wrapped_key)
        .fetch_optional(&self.pool)
        .await?;
        account.ok_or(crate::StoreError::NotFound)
    }

    async fn find_or_create_oauth_link(
        &self,
        profile: OAuthProfile,
        fresh_wrapped_key: &[u8],
    ) -> Result<(Account, bool)> {
        let mut tx = self.pool.begin().await?;

        // 1. Existing link for (provider, provider_account_id)?
        let linked = sqlx::query_as::<_, Account>(
            "SELECT a.* FROM accounts a \
             JOIN oauth_links l ON l.account_id = a.id \
             WHERE l.provider = $1 AND l.provider_account_id = $2 \
             FOR UPDATE OF a",
        )
        .bind(&profile.provider)
        .bind(&profile.provider_account_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(account) = linked {
            sqlx::query(
                "UPDATE oauth_links SET access_token = $3, refresh_token = $4 \
                 WHERE provider = $1 AND provider_account_id = $2",
            )
            .bind(&profile.provider)
            .bind(&profile.provider_account_id)
            .bind(&profile.access_token)
            .bind(&profile.refresh_token)
            .execute(&mut *tx)
            .await?;

            let account = ensure_wrapped_key(&mut tx, account.id, fresh_wrapped_key).await?;
            tx.commit().await?;
            return Ok((account, false));
        }

        // 2. Account with the profile's email?
        let by_email = match &profile.email {
            Some(email) => {
                sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1 FOR UPDATE")
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let (account_id, created) = match by_email {
            Some(account) => (account.id, false),
            None => {
                let account = sqlx::query_as::<_, Account>(
                    "INSERT INTO accounts (id, email, display_name, wrapped_key) \
                     VALUES ($1, $2, $3, $4) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(&profile.email)
                .bind(&profile.display_name)
                .bind(fresh_wrapped_key)
                .fetch_one(&mut *tx)
                .await?;
                (account.id, true)
            }
        };

        sqlx::query(
            "INSERT INTO oauth_links \
             (id, account_id, provider, provider_account_id, access_token, refresh_token) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&profile.provider)
        .bind(&profile.provider_account_id)
        .bind(&profile.access_token)
        .bind(&profile.refresh_token)
        .execute(&mut *tx)
        .await?;

        let account = ensure_wrapped_key(&mut tx, account_id, fresh_wrapped_key).await?;
        tx.commit().await?;
        Ok((account, created))
    }

    async fn create_refresh_token(
        &self,
        account_id: Uuid,
        token_fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "INSERT INTO refresh_tokens (id, account_id, token_fingerprint, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(token_fingerprint)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_active_refresh(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens \
             WHERE token_fingerprint = $1 AND revoked = FALSE AND expires_at > $2",
        )
        .bind(token_fingerprint)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn revoke_refresh_by_fingerprint(&self, token_fingerprint: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_fingerprint = $1")
            .bind(token_fingerprint)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_refresh(&self, account_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE account_id = $1 AND revoked = FALSE",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn ensure_wrapped_key(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
    fresh_wrapped_key: &[u8],
) -> Result<Account> {
    let account = sqlx::query_as::<_, Account>(
        "UPDATE accounts SET wrapped_key = COALESCE(wrapped_key, $2), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(account_id)
    .bind(fresh_wrapped_key)
    .fetch_one(&mut **tx)
    .await?;
    Ok(account)
}
