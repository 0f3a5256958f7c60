//! Entities and input records for the Strongbox data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_crypto::EncryptedField;
use uuid::Uuid;

/// Identity principal. Has a credential hash, at least one OAuth link, or
/// both; usable for vault operations only once `wrapped_key` is set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: Option<String>,
    pub credential_hash: Option<String>,
    pub display_name: Option<String>,
    /// Per-user key wrapped under the master key (60-byte blob)
    pub wrapped_key: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: Option<String>,
    pub credential_hash: Option<String>,
    pub display_name: Option<String>,
    pub wrapped_key: Option<Vec<u8>>,
}

/// Profile data from an identity provider, used by find-or-link.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider: String,
    pub provider_account_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Long-lived refresh credential handle. The raw token is never stored,
/// only its fingerprint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_fingerprint: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An encrypted credential record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VaultEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub username: String,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub secret_ciphertext: Vec<u8>,
    pub secret_nonce: Vec<u8>,
    pub secret_tag: Vec<u8>,
    pub collection_id: Option<Uuid>,
    pub is_favourite: bool,
    pub is_pinned: bool,
    /// 0..=4, None when unknown
    pub strength: Option<i16>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultEntry {
    /// The stored ciphertext triple as one value.
    #[must_use]
    pub fn encrypted_secret(&self) -> EncryptedField {
        EncryptedField {
            ciphertext: self.secret_ciphertext.clone(),
            nonce: self.secret_nonce.clone(),
            auth_tag: self.secret_tag.clone(),
        }
    }
}

/// Input for entry creation. Tag assignments land in the same transaction
/// as the row itself.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub username: String,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub secret: EncryptedField,
    pub strength: i16,
    pub collection_id: Option<Uuid>,
    pub is_favourite: bool,
    pub is_pinned: bool,
    pub tag_ids: Vec<Uuid>,
}

/// Partial update for an entry.
///
/// Two-level options distinguish "leave unchanged" (`None`) from "set to
/// null" (`Some(None)`). A secret change always carries its recomputed
/// strength so the triple and the score move together.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub title: Option<String>,
    pub username: Option<String>,
    pub site: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub secret: Option<(EncryptedField, i16)>,
    pub collection_id: Option<Option<Uuid>>,
    pub is_favourite: Option<bool>,
    pub is_pinned: Option<bool>,
    pub tag_ids: Option<Vec<Uuid>>,
}

/// List filter. All predicates are conjunctive; `tag_ids` matches entries
/// carrying any of the given tags.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Case-insensitive substring over title, username, site and notes
    pub query: Option<String>,
    pub collection_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_favourite: Option<bool>,
    pub is_pinned: Option<bool>,
    pub strength_min: Option<i16>,
    pub strength_max: Option<i16>,
}

/// Folder owned by an account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for collection creation.
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Label owned by an account, unique per `(account_id, name)`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
}

/// Bounded-use read grant on a single entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShareCapability {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub token_fingerprint: String,
    pub max_views: i32,
    pub view_count: i32,
    pub expires_at: DateTime<Utc>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub accessor_address: Option<String>,
    pub include_secret: bool,
    pub include_notes: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for share creation. The raw token stays with the caller; only the
/// fingerprint comes through here.
#[derive(Debug, Clone)]
pub struct NewShare {
    pub entry_id: Uuid,
    pub token_fingerprint: String,
    pub max_views: i32,
    pub expires_at: DateTime<Utc>,
    pub include_secret: bool,
    pub include_notes: bool,
}

/// Security-relevant action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    Logout,
    Reveal,
    Copy,
    Create,
    Update,
    Delete,
    Export,
    Import,
    Share,
    ShareAccess,
}

impl AuditAction {
    /// Stable storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Reveal => "reveal",
            Self::Copy => "copy",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Import => "import",
            Self::Share => "share",
            Self::ShareAccess => "share_access",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "logout" => Ok(Self::Logout),
            "reveal" => Ok(Self::Reveal),
            "copy" => Ok(Self::Copy),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "export" => Ok(Self::Export),
            "import" => Ok(Self::Import),
            "share" => Ok(Self::Share),
            "share_access" => Ok(Self::ShareAccess),
            other => Err(format!("unknown audit action '{other}'")),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record. Never updated, never deleted.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub action: AuditAction,
    pub entry_id: Option<Uuid>,
    pub entry_title: Option<String>,
    pub network_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for an audit append.
#[derive(Debug, Clone, Default)]
pub struct NewAuditRecord {
    pub entry_id: Option<Uuid>,
    pub entry_title: Option<String>,
    pub network_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Query filter for the audit log.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// One row of the per-action summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSummaryRow {
    pub action: AuditAction,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn audit_action_round_trips_through_storage_form() {
        for action in [
            AuditAction::Login,
            AuditAction::Logout,
            AuditAction::Reveal,
            AuditAction::Copy,
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::Export,
            AuditAction::Import,
            AuditAction::Share,
            AuditAction::ShareAccess,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("drop_table".parse::<AuditAction>().is_err());
    }
}
