//! Vault engine
//!
//! CRUD, search and filtering, favourite/pin ordering, bulk operations,
//! health analysis and export/import over encrypted records. The
//! per-account key is unwrapped per request and dropped when the handler
//! returns; it is never persisted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use strongbox_crypto::{MasterKey, UserKey, WrappedKey};
use strongbox_store::{
    AuditAction, EntryFilter, EntryStore, EntryUpdate, IdentityStore, NewEntry, TagStore,
    VaultEntry,
};

use crate::audit::{AuditService, ClientInfo};
use crate::error::{FieldError, Result, ServiceError};
use crate::org::TagView;
use crate::strength::strength_score;

/// Entries older than this count as `old` in the health analysis.
const OLD_AFTER_DAYS: i64 = 90;

/// Listing view of an entry. Never carries the secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: Uuid,
    pub title: String,
    pub username: String,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub collection_id: Option<Uuid>,
    #[serde(rename = "isFavorite")]
    pub is_favourite: bool,
    pub is_pinned: bool,
    pub strength: Option<i16>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&VaultEntry> for EntrySummary {
    fn from(entry: &VaultEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            username: entry.username.clone(),
            site: entry.site.clone(),
            notes: entry.notes.clone(),
            collection_id: entry.collection_id,
            is_favourite: entry.is_favourite,
            is_pinned: entry.is_pinned,
            strength: entry.strength,
            last_used_at: entry.last_used_at,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Single-entry view including the decrypted secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetail {
    #[serde(flatten)]
    pub summary: EntrySummary,
    pub password: String,
    pub tags: Vec<TagView>,
}

/// Input for entry creation.
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    pub title: String,
    pub username: Option<String>,
    pub password: String,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub collection_id: Option<Uuid>,
    pub is_favourite: bool,
    pub is_pinned: bool,
}

/// Partial update. `None` leaves a field unchanged; the inner option of
/// the two-level fields distinguishes clearing from updating.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntryInput {
    pub title: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub site: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub collection_id: Option<Option<Uuid>>,
    pub is_favourite: Option<bool>,
    pub is_pinned: Option<bool>,
}

/// Health analysis over every owned entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub total: u32,
    pub strong: u32,
    pub medium: u32,
    pub weak: u32,
    pub no_secret: u32,
    pub old: u32,
    pub reused: u32,
    /// Share of strong entries, 0-100. Purely derived.
    pub score: u32,
}

/// One decrypted entry in an export payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedEntry {
    pub title: String,
    pub username: String,
    pub password: String,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    #[serde(rename = "isFavorite")]
    pub is_favourite: bool,
    pub is_pinned: bool,
}

/// One incoming entry in an import payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportEntryInput {
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, rename = "isFavorite")]
    pub is_favourite: bool,
    #[serde(default)]
    pub is_pinned: bool,
}

/// Outcome of a best-effort import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: u32,
    pub skipped: u32,
}

/// The vault engine.
#[derive(Clone)]
pub struct VaultService {
    identity: Arc<dyn IdentityStore>,
    entries: Arc<dyn EntryStore>,
    tags: Arc<dyn TagStore>,
    audit: AuditService,
    master_key: Arc<MasterKey>,
}

impl VaultService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        entries: Arc<dyn EntryStore>,
        tags: Arc<dyn TagStore>,
        audit: AuditService,
        master_key: Arc<MasterKey>,
    ) -> Self {
        Self {
            identity,
            entries,
            tags,
            audit,
            master_key,
        }
    }

    /// Creates an entry: scores the secret, encrypts it under the caller's
    /// key and records a `create` audit entry.
    pub async fn create(
        &self,
        account_id: Uuid,
        input: CreateEntryInput,
        client: &ClientInfo,
    ) -> Result<EntryDetail> {
        let input = validate_create(input)?;
        let user_key = self.user_key(account_id).await?;

        let strength = strength_score(&input.password);
        let secret = user_key.encrypt_field(&input.password)?;
        let tag_ids = self.resolve_tags(account_id, &input.tags).await?;

        let entry = self
            .entries
            .insert(
                account_id,
                NewEntry {
                    title: input.title,
                    username: input.username.unwrap_or_default(),
                    site: input.site,
                    notes: input.notes,
                    secret,
                    strength,
                    collection_id: input.collection_id,
                    is_favourite: input.is_favourite,
                    is_pinned: input.is_pinned,
                    tag_ids,
                },
            )
            .await?;

        debug!(account_id = %account_id, entry_id = %entry.id, "entry created");
        self.audit
            .record(
                account_id,
                AuditAction::Create,
                client,
                Some((entry.id, entry.title.as_str())),
                None,
            )
            .await;

        let tags = self.entries.tags_for_entry(account_id, entry.id).await?;
        Ok(EntryDetail {
            summary: (&entry).into(),
            password: input.password,
            tags: tags.into_iter().map(Into::into).collect(),
        })
    }

    /// Filtered listing. Secrets never appear in the result.
    pub async fn list(&self, account_id: Uuid, filter: &EntryFilter) -> Result<Vec<EntrySummary>> {
        let entries = self.entries.list(account_id, filter).await?;
        Ok(entries.iter().map(Into::into).collect())
    }

    /// Decrypts one entry, bumps `last_used_at` and records a `reveal`.
    pub async fn get(
        &self,
        account_id: Uuid,
        id: Uuid,
        client: &ClientInfo,
    ) -> Result<EntryDetail> {
        let entry = self
            .entries
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let user_key = self.user_key(account_id).await?;
        let password = user_key.decrypt_field(&entry.encrypted_secret())?;

        self.entries
            .touch_last_used(account_id, id, Utc::now())
            .await?;
        self.audit
            .record(
                account_id,
                AuditAction::Reveal,
                client,
                Some((entry.id, entry.title.as_str())),
                None,
            )
            .await;

        let tags = self.entries.tags_for_entry(account_id, id).await?;
        Ok(EntryDetail {
            summary: (&entry).into(),
            password,
            tags: tags.into_iter().map(Into::into).collect(),
        })
    }

    /// Applies a partial patch. A changed secret is re-encrypted with a
    /// fresh nonce, the ciphertext triple is rewritten whole, and the
    /// strength is recomputed from the new plaintext.
    pub async fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: UpdateEntryInput,
        client: &ClientInfo,
    ) -> Result<EntrySummary> {
        let input = validate_update(input)?;

        let secret = match &input.password {
            Some(password) => {
                let user_key = self.user_key(account_id).await?;
                Some((user_key.encrypt_field(password)?, strength_score(password)))
            }
            None => None,
        };
        let tag_ids = match &input.tags {
            Some(names) => Some(self.resolve_tags(account_id, names).await?),
            None => None,
        };

        let updated = self
            .entries
            .update(
                account_id,
                id,
                EntryUpdate {
                    title: input.title,
                    username: input.username,
                    site: input.site,
                    notes: input.notes,
                    secret,
                    collection_id: input.collection_id,
                    is_favourite: input.is_favourite,
                    is_pinned: input.is_pinned,
                    tag_ids,
                },
            )
            .await?;

        self.audit
            .record(
                account_id,
                AuditAction::Update,
                client,
                Some((updated.id, updated.title.as_str())),
                None,
            )
            .await;
        Ok((&updated).into())
    }

    pub async fn delete(&self, account_id: Uuid, id: Uuid, client: &ClientInfo) -> Result<()> {
        let entry = self
            .entries
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !self.entries.delete(account_id, id).await? {
            return Err(ServiceError::NotFound);
        }
        self.audit
            .record(
                account_id,
                AuditAction::Delete,
                client,
                Some((entry.id, entry.title.as_str())),
                None,
            )
            .await;
        Ok(())
    }

    /// Deletes the owned subset of `ids`; foreign ids are silently
    /// skipped. Returns the count actually deleted.
    pub async fn bulk_delete(
        &self,
        account_id: Uuid,
        ids: &[Uuid],
        client: &ClientInfo,
    ) -> Result<u64> {
        let deleted = self.entries.bulk_delete(account_id, ids).await?;
        self.audit
            .record(
                account_id,
                AuditAction::Delete,
                client,
                None,
                Some(serde_json::json!({ "count": deleted })),
            )
            .await;
        Ok(deleted)
    }

    /// Idempotent flip; returns the new value.
    pub async fn toggle_favourite(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let entry = self
            .entries
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let updated = self
            .entries
            .set_favourite(account_id, id, !entry.is_favourite)
            .await?;
        Ok(updated.is_favourite)
    }

    /// Idempotent flip; returns the new value.
    pub async fn toggle_pinned(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let entry = self
            .entries
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let updated = self
            .entries
            .set_pinned(account_id, id, !entry.is_pinned)
            .await?;
        Ok(updated.is_pinned)
    }

    /// Decrypts every owned secret once and classifies the vault.
    ///
    /// A record that fails to decrypt counts as `no_secret` and never
    /// fails the analysis.
    pub async fn health(&self, account_id: Uuid) -> Result<HealthReport> {
        let entries = self.entries.all_for_account(account_id).await?;
        let user_key = self.user_key(account_id).await?;
        let now = Utc::now();

        let mut report = HealthReport {
            total: entries.len() as u32,
            strong: 0,
            medium: 0,
            weak: 0,
            no_secret: 0,
            old: 0,
            reused: 0,
            score: 0,
        };
        let mut plaintext_counts: HashMap<String, u32> = HashMap::new();

        for entry in &entries {
            if now - entry.created_at > Duration::days(OLD_AFTER_DAYS) {
                report.old += 1;
            }
            match user_key.decrypt_field(&entry.encrypted_secret()) {
                Ok(plaintext) if !plaintext.is_empty() => {
                    match strength_score(&plaintext) {
                        4 => report.strong += 1,
                        2 | 3 => report.medium += 1,
                        _ => report.weak += 1,
                    }
                    *plaintext_counts.entry(plaintext).or_insert(0) += 1;
                }
                _ => report.no_secret += 1,
            }
        }

        // Every member of a duplicate set contributes one to `reused`.
        report.reused = plaintext_counts
            .values()
            .filter(|count| **count >= 2)
            .sum();
        report.score = if report.total == 0 {
            100
        } else {
            report.strong * 100 / report.total
        };
        Ok(report)
    }

    /// Decrypts all owned entries for export and records an `export`.
    pub async fn export(&self, account_id: Uuid, client: &ClientInfo) -> Result<Vec<ExportedEntry>> {
        let entries = self.entries.all_for_account(account_id).await?;
        let user_key = self.user_key(account_id).await?;

        let mut exported = Vec::with_capacity(entries.len());
        for entry in &entries {
            let password = user_key.decrypt_field(&entry.encrypted_secret())?;
            let tags = self.entries.tags_for_entry(account_id, entry.id).await?;
            exported.push(ExportedEntry {
                title: entry.title.clone(),
                username: entry.username.clone(),
                password,
                site: entry.site.clone(),
                notes: entry.notes.clone(),
                tags: tags.into_iter().map(|t| t.name).collect(),
                is_favourite: entry.is_favourite,
                is_pinned: entry.is_pinned,
            });
        }

        self.audit
            .record(
                account_id,
                AuditAction::Export,
                client,
                None,
                Some(serde_json::json!({ "count": exported.len() })),
            )
            .await;
        Ok(exported)
    }

    /// Best-effort import. Entries failing validation or encryption are
    /// skipped, as is any entry duplicating an existing
    /// `(title, username, site)`. One `import` audit carries the counts.
    pub async fn import(
        &self,
        account_id: Uuid,
        entries: Vec<ImportEntryInput>,
        client: &ClientInfo,
    ) -> Result<ImportReport> {
        let user_key = self.user_key(account_id).await?;
        let mut report = ImportReport {
            imported: 0,
            skipped: 0,
        };

        for incoming in entries {
            let title = incoming.title.trim();
            if title.is_empty() || title.chars().count() > 200 {
                report.skipped += 1;
                continue;
            }
            let username = incoming.username.unwrap_or_default();
            let duplicate = self
                .entries
                .exists_duplicate(account_id, title, &username, incoming.site.as_deref())
                .await?;
            if duplicate {
                report.skipped += 1;
                continue;
            }
            let Ok(secret) = user_key.encrypt_field(&incoming.password) else {
                report.skipped += 1;
                continue;
            };
            let tag_ids = self.resolve_tags(account_id, &incoming.tags).await?;
            let inserted = self
                .entries
                .insert(
                    account_id,
                    NewEntry {
                        title: title.to_string(),
                        username,
                        site: incoming.site,
                        notes: incoming.notes,
                        secret,
                        strength: strength_score(&incoming.password),
                        collection_id: None,
                        is_favourite: incoming.is_favourite,
                        is_pinned: incoming.is_pinned,
                        tag_ids,
                    },
                )
                .await;
            match inserted {
                Ok(_) => report.imported += 1,
                Err(_) => report.skipped += 1,
            }
        }

        self.audit
            .record(
                account_id,
                AuditAction::Import,
                client,
                None,
                Some(serde_json::json!({
                    "imported": report.imported,
                    "skipped": report.skipped,
                })),
            )
            .await;
        Ok(report)
    }

    /// Records a client-observed clipboard copy of an entry's secret.
    pub async fn record_copy(&self, account_id: Uuid, id: Uuid, client: &ClientInfo) -> Result<()> {
        let entry = self
            .entries
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.audit
            .record(
                account_id,
                AuditAction::Copy,
                client,
                Some((entry.id, entry.title.as_str())),
                None,
            )
            .await;
        Ok(())
    }

    /// Unwraps the caller's key for the duration of one request.
    async fn user_key(&self, account_id: Uuid) -> Result<UserKey> {
        let account = self
            .identity
            .find_account_by_id(account_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let wrapped = account
            .wrapped_key
            .ok_or_else(|| ServiceError::internal("account has no wrapped key"))?;
        Ok(self.master_key.unwrap(&WrappedKey::from_bytes(wrapped))?)
    }

    /// Resolves tag names to owned tag rows, creating missing ones.
    async fn resolve_tags(&self, account_id: Uuid, names: &[String]) -> Result<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > 50 {
                continue;
            }
            let tag = self.tags.create(account_id, name).await?;
            ids.push(tag.id);
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService").finish_non_exhaustive()
    }
}

fn validate_create(mut input: CreateEntryInput) -> Result<CreateEntryInput> {
    input.title = input.title.trim().to_string();
    let mut errors = text_field_errors(
        Some(&input.title),
        input.username.as_deref(),
        input.site.as_deref(),
        input.notes.as_deref(),
        Some(&input.password),
    );
    if input.tags.len() > 20 {
        errors.push(FieldError::new("tags", "must be at most 20 tags"));
    }
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(ServiceError::Validation(errors))
    }
}

fn validate_update(mut input: UpdateEntryInput) -> Result<UpdateEntryInput> {
    if let Some(title) = &input.title {
        input.title = Some(title.trim().to_string());
    }
    let errors = text_field_errors(
        input.title.as_deref(),
        input.username.as_deref(),
        input.site.as_ref().and_then(|s| s.as_deref()),
        input.notes.as_ref().and_then(|n| n.as_deref()),
        input.password.as_deref(),
    );
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(ServiceError::Validation(errors))
    }
}

/// Field checks shared by create and update. `None` means the field is
/// not being changed and is skipped.
fn text_field_errors(
    title: Option<&str>,
    username: Option<&str>,
    site: Option<&str>,
    notes: Option<&str>,
    password: Option<&str>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if title.is_some_and(|t| t.is_empty() || t.chars().count() > 200) {
        errors.push(FieldError::new(
            "title",
            "must be between 1 and 200 characters",
        ));
    }
    if username.is_some_and(|u| u.chars().count() > 200) {
        errors.push(FieldError::new(
            "username",
            "must be at most 200 characters",
        ));
    }
    if site.is_some_and(|s| s.chars().count() > 500) {
        errors.push(FieldError::new("site", "must be at most 500 characters"));
    }
    if notes.is_some_and(|n| n.chars().count() > 5000) {
        errors.push(FieldError::new("notes", "must be at most 5000 characters"));
    }
    if password.is_some_and(|p| p.chars().count() > 1024) {
        errors.push(FieldError::new(
            "password",
            "must be at most 1024 characters",
        ));
    }
    errors
}
