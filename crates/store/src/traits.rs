//! Store traits — the seam between the service layer and the backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Account, AuditAction, AuditFilter, AuditRecord, AuditSummaryRow, Collection, EntryFilter,
    EntryUpdate, NewAccount, NewAuditRecord, NewCollection, NewEntry, NewShare, OAuthProfile,
    RefreshTokenRecord, ShareCapability, Tag, VaultEntry,
};

/// Accounts, OAuth links and refresh-credential records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Lazily materialises the wrapped per-user key on an account that
    /// lacks one. Loses the race gracefully: the stored value wins.
    async fn set_wrapped_key(&self, account_id: Uuid, wrapped_key: &[u8]) -> Result<Account>;

    /// Atomic find-or-create for an OAuth sign-in.
    ///
    /// Match order: existing `(provider, provider_account_id)` link, then an
    /// account carrying the profile's email, then a fresh account. When the
    /// resolved account lacks a wrapped key, `fresh_wrapped_key` is attached
    /// in the same transaction. Returns the account and whether it was
    /// created.
    async fn find_or_create_oauth_link(
        &self,
        profile: OAuthProfile,
        fresh_wrapped_key: &[u8],
    ) -> Result<(Account, bool)>;

    async fn create_refresh_token(
        &self,
        account_id: Uuid,
        token_fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord>;

    /// Active = not revoked and not expired at `now`.
    async fn find_active_refresh(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Idempotent: revoking an unknown or already-revoked fingerprint is Ok.
    async fn revoke_refresh_by_fingerprint(&self, token_fingerprint: &str) -> Result<()>;

    async fn revoke_all_refresh(&self, account_id: Uuid) -> Result<u64>;
}

/// Encrypted vault entries. Every operation is scoped by `account_id`.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Inserts the entry and its tag joins in one transaction.
    async fn insert(&self, account_id: Uuid, entry: NewEntry) -> Result<VaultEntry>;

    /// Filtered listing, ordered pinned-first, then favourites, then
    /// `updated_at` descending, ties broken by id.
    async fn list(&self, account_id: Uuid, filter: &EntryFilter) -> Result<Vec<VaultEntry>>;

    async fn get(&self, account_id: Uuid, id: Uuid) -> Result<Option<VaultEntry>>;

    /// Applies a partial update in one transaction. The ciphertext triple
    /// is only ever rewritten whole.
    async fn update(&self, account_id: Uuid, id: Uuid, update: EntryUpdate) -> Result<VaultEntry>;

    async fn touch_last_used(&self, account_id: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<()>;

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool>;

    /// Returns how many of the given ids were actually owned and deleted.
    async fn bulk_delete(&self, account_id: Uuid, ids: &[Uuid]) -> Result<u64>;

    async fn set_favourite(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry>;

    async fn set_pinned(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry>;

    /// Every entry the account owns, for health analysis and export.
    async fn all_for_account(&self, account_id: Uuid) -> Result<Vec<VaultEntry>>;

    /// Tag ids per entry, for DTO assembly.
    async fn tags_for_entry(&self, account_id: Uuid, id: Uuid) -> Result<Vec<Tag>>;

    /// Import-idempotency probe over `(title, username, site)`.
    async fn exists_duplicate(
        &self,
        account_id: Uuid,
        title: &str,
        username: &str,
        site: Option<&str>,
    ) -> Result<bool>;
}

/// Collections (folders).
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn create(&self, account_id: Uuid, collection: NewCollection) -> Result<Collection>;

    async fn list(&self, account_id: Uuid) -> Result<Vec<Collection>>;

    async fn find(&self, account_id: Uuid, id: Uuid) -> Result<Option<Collection>>;

    async fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        collection: NewCollection,
    ) -> Result<Collection>;

    /// Deletes the collection and re-parents its entries to uncategorised
    /// in the same transaction. Entries themselves survive.
    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool>;

    /// Moves owned entries into `collection_id` (`None` = uncategorised).
    /// Returns the number of entries moved.
    async fn move_entries(
        &self,
        account_id: Uuid,
        entry_ids: &[Uuid],
        collection_id: Option<Uuid>,
    ) -> Result<u64>;
}

/// Tags and their entry assignments.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Idempotent under `(account_id, name)`: concurrent creates collapse
    /// to the single existing row.
    async fn create(&self, account_id: Uuid, name: &str) -> Result<Tag>;

    async fn list(&self, account_id: Uuid) -> Result<Vec<Tag>>;

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool>;

    /// Replaces the tag set of an owned entry in one transaction.
    async fn set_entry_tags(&self, account_id: Uuid, entry_id: Uuid, tag_ids: &[Uuid])
    -> Result<()>;
}

/// Share capabilities.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn create(&self, account_id: Uuid, share: NewShare) -> Result<ShareCapability>;

    /// Atomic consumption: increments `view_count` and stamps the accessor
    /// only when the capability is unexpired and has views remaining;
    /// otherwise returns `None`. The backend must reject a second
    /// increment past `max_views` even under concurrency.
    async fn consume(
        &self,
        token_fingerprint: &str,
        accessor_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareCapability>>;

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<ShareCapability>>;

    async fn revoke(&self, account_id: Uuid, id: Uuid) -> Result<bool>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(
        &self,
        account_id: Uuid,
        action: AuditAction,
        record: NewAuditRecord,
    ) -> Result<AuditRecord>;

    /// Ordered by `created_at` then id, newest first.
    async fn query(&self, account_id: Uuid, filter: &AuditFilter) -> Result<Vec<AuditRecord>>;

    /// Per-action counts since `since`.
    async fn summary(&self, account_id: Uuid, since: DateTime<Utc>)
    -> Result<Vec<AuditSummaryRow>>;
}
