//! Sharing engine
//!
//! One-time capability tokens bound to a single entry. The raw token is
//! returned exactly once at creation; the store keeps only a fingerprint.
//! Every failure mode on access — unknown token, expiry, exhausted views —
//! collapses to `NotFound` so a probe cannot learn whether a capability
//! exists.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use strongbox_crypto::{MasterKey, OpaqueToken, UserKey, WrappedKey, fingerprint};
use strongbox_store::{
    AuditAction, EntryStore, IdentityStore, NewShare, ShareCapability, ShareStore,
};

use crate::audit::{AuditService, ClientInfo};
use crate::error::{FieldError, Result, ServiceError};

const DEFAULT_MAX_VIEWS: i32 = 1;
const MAX_MAX_VIEWS: i32 = 100;
const DEFAULT_EXPIRES_IN_HOURS: i64 = 24;
const MAX_EXPIRES_IN_HOURS: i64 = 720;

/// Options for share creation.
#[derive(Debug, Clone, Default)]
pub struct CreateShareInput {
    pub max_views: Option<i32>,
    pub expires_in_hours: Option<i64>,
    pub include_secret: Option<bool>,
    pub include_notes: Option<bool>,
}

/// Metadata view of a capability. Never carries the raw token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub max_views: i32,
    pub view_count: i32,
    pub expires_at: DateTime<Utc>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub include_secret: bool,
    pub include_notes: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&ShareCapability> for ShareView {
    fn from(share: &ShareCapability) -> Self {
        Self {
            id: share.id,
            entry_id: share.entry_id,
            max_views: share.max_views,
            view_count: share.view_count,
            expires_at: share.expires_at,
            accessed_at: share.accessed_at,
            include_secret: share.include_secret,
            include_notes: share.include_notes,
            created_at: share.created_at,
        }
    }
}

/// What an anonymous accessor sees. Secret and notes appear only when the
/// capability was issued with the matching disclosure flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedEntryView {
    pub title: String,
    pub username: String,
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub views_remaining: i32,
    pub expires_at: DateTime<Utc>,
}

/// The sharing engine.
#[derive(Clone)]
pub struct ShareService {
    identity: Arc<dyn IdentityStore>,
    entries: Arc<dyn EntryStore>,
    shares: Arc<dyn ShareStore>,
    audit: AuditService,
    master_key: Arc<MasterKey>,
}

impl ShareService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        entries: Arc<dyn EntryStore>,
        shares: Arc<dyn ShareStore>,
        audit: AuditService,
        master_key: Arc<MasterKey>,
    ) -> Self {
        Self {
            identity,
            entries,
            shares,
            audit,
            master_key,
        }
    }

    /// Issues a capability for an owned entry. The raw token in the return
    /// value is the only time it ever leaves the server.
    pub async fn create_share(
        &self,
        account_id: Uuid,
        entry_id: Uuid,
        input: CreateShareInput,
        client: &ClientInfo,
    ) -> Result<(ShareView, OpaqueToken)> {
        let max_views = input.max_views.unwrap_or(DEFAULT_MAX_VIEWS);
        let expires_in_hours = input.expires_in_hours.unwrap_or(DEFAULT_EXPIRES_IN_HOURS);

        let mut errors = Vec::new();
        if !(1..=MAX_MAX_VIEWS).contains(&max_views) {
            errors.push(FieldError::new(
                "maxViews",
                format!("must be between 1 and {MAX_MAX_VIEWS}"),
            ));
        }
        if !(1..=MAX_EXPIRES_IN_HOURS).contains(&expires_in_hours) {
            errors.push(FieldError::new(
                "expiresInHours",
                format!("must be between 1 and {MAX_EXPIRES_IN_HOURS}"),
            ));
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        // Owner check is the scoped fetch itself.
        let entry = self
            .entries
            .get(account_id, entry_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let token = OpaqueToken::generate();
        let share = self
            .shares
            .create(
                account_id,
                NewShare {
                    entry_id,
                    token_fingerprint: token.fingerprint(),
                    max_views,
                    expires_at: Utc::now() + Duration::hours(expires_in_hours),
                    include_secret: input.include_secret.unwrap_or(true),
                    include_notes: input.include_notes.unwrap_or(false),
                },
            )
            .await?;

        self.audit
            .record(
                account_id,
                AuditAction::Share,
                client,
                Some((entry.id, entry.title.as_str())),
                Some(serde_json::json!({
                    "maxViews": max_views,
                    "expiresInHours": expires_in_hours,
                })),
            )
            .await;
        Ok(((&share).into(), token))
    }

    /// Public access by raw token. Consumption is atomic: the view-count
    /// check and the increment happen in one store operation.
    pub async fn access(
        &self,
        raw_token: &str,
        accessor_address: Option<&str>,
    ) -> Result<SharedEntryView> {
        let share = self
            .shares
            .consume(&fingerprint(raw_token), accessor_address, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound)?;

        let entry = self
            .entries
            .get(share.account_id, share.entry_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let password = if share.include_secret {
            let user_key = self.issuer_key(share.account_id).await?;
            Some(user_key.decrypt_field(&entry.encrypted_secret())?)
        } else {
            None
        };
        let notes = if share.include_notes {
            entry.notes.clone()
        } else {
            None
        };

        // Attributed to the issuing account; the accessor is anonymous.
        self.audit
            .record(
                share.account_id,
                AuditAction::ShareAccess,
                &ClientInfo {
                    address: accessor_address.map(str::to_string),
                    user_agent: None,
                },
                Some((entry.id, entry.title.as_str())),
                Some(serde_json::json!({
                    "viewCount": share.view_count,
                    "maxViews": share.max_views,
                })),
            )
            .await;

        Ok(SharedEntryView {
            title: entry.title,
            username: entry.username,
            site: entry.site,
            password,
            notes,
            views_remaining: share.max_views - share.view_count,
            expires_at: share.expires_at,
        })
    }

    /// Owner-scoped listing; metadata only.
    pub async fn list_shares(&self, account_id: Uuid) -> Result<Vec<ShareView>> {
        let shares = self.shares.list_for_account(account_id).await?;
        Ok(shares.iter().map(Into::into).collect())
    }

    /// Owner-scoped revocation.
    pub async fn revoke_share(&self, account_id: Uuid, id: Uuid) -> Result<()> {
        if !self.shares.revoke(account_id, id).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn issuer_key(&self, account_id: Uuid) -> Result<UserKey> {
        let account = self
            .identity
            .find_account_by_id(account_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let wrapped = account
            .wrapped_key
            .ok_or_else(|| ServiceError::internal("issuer account has no wrapped key"))?;
        Ok(self.master_key.unwrap(&WrappedKey::from_bytes(wrapped))?)
    }
}

impl std::fmt::Debug for ShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareService").finish_non_exhaustive()
    }
}
