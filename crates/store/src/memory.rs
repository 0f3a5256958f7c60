//! In-memory backend
//!
//! A faithful in-process twin of the Postgres backend, used by service-
//! and API-level tests. Semantics that matter to callers are preserved:
//! email and `(account_id, name)` uniqueness, atomic share consumption,
//! re-parenting on collection delete, cascade of join rows, and the list
//! ordering contract.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{
    Account, AuditAction, AuditFilter, AuditRecord, AuditSummaryRow, Collection, EntryFilter,
    EntryUpdate, NewAccount, NewAuditRecord, NewCollection, NewEntry, NewShare, OAuthProfile,
    RefreshTokenRecord, ShareCapability, Tag, VaultEntry,
};
use crate::traits::{
    AuditStore, CollectionStore, EntryStore, IdentityStore, ShareStore, TagStore,
};

#[derive(Debug, Clone)]
struct OAuthLinkRow {
    account_id: Uuid,
    provider: String,
    provider_account_id: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    oauth_links: Vec<OAuthLinkRow>,
    refresh_tokens: Vec<RefreshTokenRecord>,
    entries: HashMap<Uuid, VaultEntry>,
    collections: HashMap<Uuid, Collection>,
    tags: HashMap<Uuid, Tag>,
    entry_tags: HashSet<(Uuid, Uuid)>,
    shares: HashMap<Uuid, ShareCapability>,
    audit: Vec<AuditRecord>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(entry: &VaultEntry, filter: &EntryFilter, entry_tags: &HashSet<(Uuid, Uuid)>) -> bool {
    if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let needle = query.trim().to_lowercase();
        let haystacks = [
            Some(entry.title.as_str()),
            Some(entry.username.as_str()),
            entry.site.as_deref(),
            entry.notes.as_deref(),
        ];
        if !haystacks
            .iter()
            .flatten()
            .any(|h| h.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    if let Some(collection_id) = filter.collection_id {
        if entry.collection_id != Some(collection_id) {
            return false;
        }
    }
    if !filter.tag_ids.is_empty()
        && !filter
            .tag_ids
            .iter()
            .any(|tag_id| entry_tags.contains(&(entry.id, *tag_id)))
    {
        return false;
    }
    if let Some(is_favourite) = filter.is_favourite {
        if entry.is_favourite != is_favourite {
            return false;
        }
    }
    if let Some(is_pinned) = filter.is_pinned {
        if entry.is_pinned != is_pinned {
            return false;
        }
    }
    if let Some(min) = filter.strength_min {
        if entry.strength.is_none_or(|s| s < min) {
            return false;
        }
    }
    if let Some(max) = filter.strength_max {
        if entry.strength.is_none_or(|s| s > max) {
            return false;
        }
    }
    true
}

fn sort_for_list(entries: &mut [VaultEntry]) {
    entries.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.is_favourite.cmp(&a.is_favourite))
            .then(b.updated_at.cmp(&a.updated_at))
            .then(a.id.cmp(&b.id))
    });
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        if let Some(email) = &account.email {
            if state
                .accounts
                .values()
                .any(|a| a.email.as_deref() == Some(email))
            {
                return Err(StoreError::Conflict("accounts_email_key".into()));
            }
        }
        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            credential_hash: account.credential_hash,
            display_name: account.display_name,
            wrapped_key: account.wrapped_key,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_wrapped_key(&self, account_id: Uuid, wrapped_key: &[u8]) -> Result<Account> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;
        if account.wrapped_key.is_none() {
            account.wrapped_key = Some(wrapped_key.to_vec());
            account.updated_at = Utc::now();
        }
        Ok(account.clone())
    }

    async fn find_or_create_oauth_link(
        &self,
        profile: OAuthProfile,
        fresh_wrapped_key: &[u8],
    ) -> Result<(Account, bool)> {
        let mut state = self.state.write().await;

        let linked_id = state
            .oauth_links
            .iter()
            .find(|l| {
                l.provider == profile.provider
                    && l.provider_account_id == profile.provider_account_id
            })
            .map(|l| l.account_id);

        let (account_id, created) = if let Some(id) = linked_id {
            (id, false)
        } else {
            let by_email = profile.email.as_deref().and_then(|email| {
                state
                    .accounts
                    .values()
                    .find(|a| a.email.as_deref() == Some(email))
                    .map(|a| a.id)
            });
            let (id, created) = match by_email {
                Some(id) => (id, false),
                None => {
                    let now = Utc::now();
                    let account = Account {
                        id: Uuid::new_v4(),
                        email: profile.email.clone(),
                        credential_hash: None,
                        display_name: profile.display_name.clone(),
                        wrapped_key: Some(fresh_wrapped_key.to_vec()),
                        created_at: now,
                        updated_at: now,
                    };
                    let id = account.id;
                    state.accounts.insert(id, account);
                    (id, true)
                }
            };
            state.oauth_links.push(OAuthLinkRow {
                account_id: id,
                provider: profile.provider.clone(),
                provider_account_id: profile.provider_account_id.clone(),
            });
            (id, created)
        };

        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;
        if account.wrapped_key.is_none() {
            account.wrapped_key = Some(fresh_wrapped_key.to_vec());
            account.updated_at = Utc::now();
        }
        Ok((account.clone(), created))
    }

    async fn create_refresh_token(
        &self,
        account_id: Uuid,
        token_fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord> {
        let mut state = self.state.write().await;
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            account_id,
            token_fingerprint: token_fingerprint.to_string(),
            revoked: false,
            expires_at,
            created_at: Utc::now(),
        };
        state.refresh_tokens.push(record.clone());
        Ok(record)
    }

    async fn find_active_refresh(
        &self,
        token_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .refresh_tokens
            .iter()
            .find(|r| r.token_fingerprint == token_fingerprint && !r.revoked && r.expires_at > now)
            .cloned())
    }

    async fn revoke_refresh_by_fingerprint(&self, token_fingerprint: &str) -> Result<()> {
        let mut state = self.state.write().await;
        for record in &mut state.refresh_tokens {
            if record.token_fingerprint == token_fingerprint {
                record.revoked = true;
            }
        }
        Ok(())
    }

    async fn revoke_all_refresh(&self, account_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut revoked = 0;
        for record in &mut state.refresh_tokens {
            if record.account_id == account_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert(&self, account_id: Uuid, entry: NewEntry) -> Result<VaultEntry> {
        let mut state = self.state.write().await;

        if let Some(collection_id) = entry.collection_id {
            let owned = state
                .collections
                .get(&collection_id)
                .is_some_and(|c| c.account_id == account_id);
            if !owned {
                return Err(StoreError::NotFound);
            }
        }

        let now = Utc::now();
        let created = VaultEntry {
            id: Uuid::new_v4(),
            account_id,
            title: entry.title,
            username: entry.username,
            site: entry.site,
            notes: entry.notes,
            secret_ciphertext: entry.secret.ciphertext,
            secret_nonce: entry.secret.nonce,
            secret_tag: entry.secret.auth_tag,
            collection_id: entry.collection_id,
            is_favourite: entry.is_favourite,
            is_pinned: entry.is_pinned,
            strength: Some(entry.strength),
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        for tag_id in &entry.tag_ids {
            if state
                .tags
                .get(tag_id)
                .is_some_and(|t| t.account_id == account_id)
            {
                state.entry_tags.insert((created.id, *tag_id));
            }
        }
        state.entries.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self, account_id: Uuid, filter: &EntryFilter) -> Result<Vec<VaultEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<VaultEntry> = state
            .entries
            .values()
            .filter(|e| e.account_id == account_id)
            .filter(|e| matches_filter(e, filter, &state.entry_tags))
            .cloned()
            .collect();
        sort_for_list(&mut entries);
        Ok(entries)
    }

    async fn get(&self, account_id: Uuid, id: Uuid) -> Result<Option<VaultEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&id)
            .filter(|e| e.account_id == account_id)
            .cloned())
    }

    async fn update(&self, account_id: Uuid, id: Uuid, update: EntryUpdate) -> Result<VaultEntry> {
        let mut state = self.state.write().await;

        if let Some(Some(target)) = update.collection_id {
            let owned = state
                .collections
                .get(&target)
                .is_some_and(|c| c.account_id == account_id);
            if !owned {
                return Err(StoreError::NotFound);
            }
        }

        let entry = state
            .entries
            .get_mut(&id)
            .filter(|e| e.account_id == account_id)
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
            entry.collection_id = collection_id;
        }
        if let Some(is_favourite) = update.is_favourite {
            entry.is_favourite = is_favourite;
        }
        if let Some(is_pinned) = update.is_pinned {
            entry.is_pinned = is_pinned;
        }
        entry.updated_at = Utc::now();
        let updated = entry.clone();

        if let Some(tag_ids) = update.tag_ids {
            state.entry_tags.retain(|(entry_id, _)| *entry_id != id);
            for tag_id in tag_ids {
                if state
                    .tags
                    .get(&tag_id)
                    .is_some_and(|t| t.account_id == account_id)
                {
                    state.entry_tags.insert((id, tag_id));
                }
            }
        }

        Ok(updated)
    }

    async fn touch_last_used(&self, account_id: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(entry) = state
            .entries
            .get_mut(&id)
            .filter(|e| e.account_id == account_id)
        {
            entry.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .entries
            .get(&id)
            .is_some_and(|e| e.account_id == account_id);
        if !owned {
            return Ok(false);
        }
        state.entries.remove(&id);
        state.entry_tags.retain(|(entry_id, _)| *entry_id != id);
        state.shares.retain(|_, s| s.entry_id != id);
        Ok(true)
    }

    async fn bulk_delete(&self, account_id: Uuid, ids: &[Uuid]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            if EntryStore::delete(self, account_id, *id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn set_favourite(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(&id)
            .filter(|e| e.account_id == account_id)
            .ok_or(StoreError::NotFound)?;
        entry.is_favourite = value;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_pinned(&self, account_id: Uuid, id: Uuid, value: bool) -> Result<VaultEntry> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(&id)
            .filter(|e| e.account_id == account_id)
            .ok_or(StoreError::NotFound)?;
        entry.is_pinned = value;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn all_for_account(&self, account_id: Uuid) -> Result<Vec<VaultEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<VaultEntry> = state
            .entries
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn tags_for_entry(&self, account_id: Uuid, id: Uuid) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .entry_tags
            .iter()
            .filter(|(entry_id, _)| *entry_id == id)
            .filter_map(|(_, tag_id)| state.tags.get(tag_id))
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn exists_duplicate(
        &self,
        account_id: Uuid,
        title: &str,
        username: &str,
        site: Option<&str>,
    ) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.entries.values().any(|e| {
            e.account_id == account_id
                && e.title == title
                && e.username == username
                && e.site.as_deref() == site
        }))
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn create(&self, account_id: Uuid, collection: NewCollection) -> Result<Collection> {
        let mut state = self.state.write().await;
        let created = Collection {
            id: Uuid::new_v4(),
            account_id,
            name: collection.name,
            description: collection.description,
            icon: collection.icon,
            color: collection.color,
            created_at: Utc::now(),
        };
        state.collections.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Collection>> {
        let state = self.state.read().await;
        let mut collections: Vec<Collection> = state
            .collections
            .values()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(collections)
    }

    async fn find(&self, account_id: Uuid, id: Uuid) -> Result<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(&id)
            .filter(|c| c.account_id == account_id)
            .cloned())
    }

    async fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        collection: NewCollection,
    ) -> Result<Collection> {
        let mut state = self.state.write().await;
        let existing = state
            .collections
            .get_mut(&id)
            .filter(|c| c.account_id == account_id)
            .ok_or(StoreError::NotFound)?;
        existing.name = collection.name;
        existing.description = collection.description;
        existing.icon = collection.icon;
        existing.color = collection.color;
        Ok(existing.clone())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .collections
            .get(&id)
            .is_some_and(|c| c.account_id == account_id);
        if !owned {
            return Ok(false);
        }
        state.collections.remove(&id);
        let now = Utc::now();
        for entry in state.entries.values_mut() {
            if entry.collection_id == Some(id) {
                entry.collection_id = None;
                entry.updated_at = now;
            }
        }
        Ok(true)
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
        let mut state = self.state.write().await;
        if let Some(target) = collection_id {
            let owned = state
                .collections
                .get(&target)
                .is_some_and(|c| c.account_id == account_id);
            if !owned {
                return Err(StoreError::NotFound);
            }
        }
        let now = Utc::now();
        let mut moved = 0;
        for id in entry_ids {
            if let Some(entry) = state
                .entries
                .get_mut(id)
                .filter(|e| e.account_id == account_id)
            {
                entry.collection_id = collection_id;
                entry.updated_at = now;
                moved += 1;
            }
        }
        Ok(moved)
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn create(&self, account_id: Uuid, name: &str) -> Result<Tag> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .tags
            .values()
            .find(|t| t.account_id == account_id && t.name == name)
        {
            return Ok(existing.clone());
        }
        let created = Tag {
            id: Uuid::new_v4(),
            account_id,
            name: name.to_string(),
        };
        state.tags.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .tags
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .tags
            .get(&id)
            .is_some_and(|t| t.account_id == account_id);
        if !owned {
            return Ok(false);
        }
        state.tags.remove(&id);
        state.entry_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(true)
    }

    async fn set_entry_tags(
        &self,
        account_id: Uuid,
        entry_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let owned = state
            .entries
            .get(&entry_id)
            .is_some_and(|e| e.account_id == account_id);
        if !owned {
            return Err(StoreError::NotFound);
        }
        state.entry_tags.retain(|(id, _)| *id != entry_id);
        for tag_id in tag_ids {
            if state
                .tags
                .get(tag_id)
                .is_some_and(|t| t.account_id == account_id)
            {
                state.entry_tags.insert((entry_id, *tag_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn create(&self, account_id: Uuid, share: NewShare) -> Result<ShareCapability> {
        let mut state = self.state.write().await;
        if state
            .shares
            .values()
            .any(|s| s.token_fingerprint == share.token_fingerprint)
        {
            return Err(StoreError::Conflict("share_capabilities_token_fingerprint_key".into()));
        }
        let created = ShareCapability {
            id: Uuid::new_v4(),
            entry_id: share.entry_id,
            account_id,
            token_fingerprint: share.token_fingerprint,
            max_views: share.max_views,
            view_count: 0,
            expires_at: share.expires_at,
            accessed_at: None,
            accessor_address: None,
            include_secret: share.include_secret,
            include_notes: share.include_notes,
            created_at: Utc::now(),
        };
        state.shares.insert(created.id, created.clone());
        Ok(created)
    }

    async fn consume(
        &self,
        token_fingerprint: &str,
        accessor_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareCapability>> {
        // One write lock spans the check and the increment, mirroring the
        // single conditional UPDATE of the Postgres backend.
        let mut state = self.state.write().await;
        let share = state
            .shares
            .values_mut()
            .find(|s| s.token_fingerprint == token_fingerprint);
        let Some(share) = share else {
            return Ok(None);
        };
        if share.expires_at <= now || share.view_count >= share.max_views {
            return Ok(None);
        }
        share.view_count += 1;
        share.accessed_at = Some(now);
        share.accessor_address = accessor_address.map(str::to_string);
        Ok(Some(share.clone()))
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<ShareCapability>> {
        let state = self.state.read().await;
        let mut shares: Vec<ShareCapability> = state
            .shares
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn revoke(&self, account_id: Uuid, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .shares
            .get(&id)
            .is_some_and(|s| s.account_id == account_id);
        if !owned {
            return Ok(false);
        }
        state.shares.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(
        &self,
        account_id: Uuid,
        action: AuditAction,
        record: NewAuditRecord,
    ) -> Result<AuditRecord> {
        let mut state = self.state.write().await;
        let created = AuditRecord {
            id: Uuid::new_v4(),
            account_id,
            action,
            entry_id: record.entry_id,
            entry_title: record.entry_title,
            network_address: record.network_address,
            user_agent: record.user_agent,
            details: record.details,
            created_at: Utc::now(),
        };
        state.audit.push(created.clone());
        Ok(created)
    }

    async fn query(&self, account_id: Uuid, filter: &AuditFilter) -> Result<Vec<AuditRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<AuditRecord> = state
            .audit
            .iter()
            .filter(|r| r.account_id == account_id)
            .filter(|r| filter.action.is_none_or(|a| r.action == a))
            .filter(|r| filter.from.is_none_or(|from| r.created_at >= from))
            .filter(|r| filter.to.is_none_or(|to| r.created_at <= to))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn summary(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditSummaryRow>> {
        let state = self.state.read().await;
        let mut counts: HashMap<AuditAction, i64> = HashMap::new();
        for record in state
            .audit
            .iter()
            .filter(|r| r.account_id == account_id && r.created_at >= since)
        {
            *counts.entry(record.action).or_insert(0) += 1;
        }
        let mut rows: Vec<AuditSummaryRow> = counts
            .into_iter()
            .map(|(action, count)| AuditSummaryRow { action, count })
            .collect();
        rows.sort_by(|a, b| a.action.as_str().cmp(b.action.as_str()));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strongbox_crypto::EncryptedField;

    fn secret() -> EncryptedField {
        EncryptedField {
            ciphertext: vec![1, 2, 3],
            nonce: vec![0; 12],
            auth_tag: vec![0; 16],
        }
    }

    fn new_entry(title: &str) -> NewEntry {
        NewEntry {
            title: title.to_string(),
            username: String::new(),
            site: None,
            notes: None,
            secret: secret(),
            strength: 2,
            collection_id: None,
            is_favourite: false,
            is_pinned: false,
            tag_ids: vec![],
        }
    }

    #[tokio::test]
    async fn entries_are_scoped_by_account() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let entry = store.insert(a, new_entry("Gmail")).await.unwrap();
        assert!(store.get(b, entry.id).await.unwrap().is_none());
        assert!(store.get(a, entry.id).await.unwrap().is_some());
        assert_eq!(store.bulk_delete(b, &[entry.id]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tag_create_is_idempotent() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        let first = TagStore::create(&store, account, "work").await.unwrap();
        let second = TagStore::create(&store, account, "work").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(TagStore::list(&store, account).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn share_consumption_saturates_at_max_views() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        let entry = store.insert(account, new_entry("Gmail")).await.unwrap();

        let share = ShareStore::create(
            &store,
            account,
            NewShare {
                entry_id: entry.id,
                token_fingerprint: "fp".into(),
                max_views: 2,
                expires_at: Utc::now() + chrono::Duration::hours(1),
                include_secret: true,
                include_notes: false,
            },
        )
        .await
        .unwrap();

        let now = Utc::now();
        assert!(store.consume("fp", None, now).await.unwrap().is_some());
        assert!(store.consume("fp", None, now).await.unwrap().is_some());
        assert!(store.consume("fp", None, now).await.unwrap().is_none());

        let listed = store.list_for_account(account).await.unwrap();
        assert_eq!(listed[0].id, share.id);
        assert_eq!(listed[0].view_count, 2);
    }

    #[tokio::test]
    async fn expired_share_rejects_even_with_views_remaining() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        let entry = store.insert(account, new_entry("Gmail")).await.unwrap();

        ShareStore::create(
            &store,
            account,
            NewShare {
                entry_id: entry.id,
                token_fingerprint: "fp".into(),
                max_views: 5,
                expires_at: Utc::now() - chrono::Duration::minutes(1),
                include_secret: true,
                include_notes: false,
            },
        )
        .await
        .unwrap();

        assert!(store.consume("fp", None, Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collection_delete_reparents_entries() {
        let store = MemoryStore::new();
        let account = Uuid::new_v4();
        let collection = CollectionStore::create(
            &store,
            account,
            NewCollection {
                name: "Work".into(),
                description: None,
                icon: None,
                color: None,
            },
        )
        .await
        .unwrap();

        let mut entry = new_entry("Gmail");
        entry.collection_id = Some(collection.id);
        let entry = store.insert(account, entry).await.unwrap();

        assert!(CollectionStore::delete(&store, account, collection.id).await.unwrap());
        let survivor = store.get(account, entry.id).await.unwrap().unwrap();
        assert_eq!(survivor.collection_id, None);
    }
}
