//! Authentication and session core
//!
//! Registration, login, OAuth find-or-link, bearer issuance and refresh
//! rotation policy. Refresh tokens are opaque, stored only as SHA-256
//! fingerprints, and are NOT rotated on use: a record lives until logout,
//! revoke-all or expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use strongbox_crypto::{MasterKey, OpaqueToken, UserKey, fingerprint};
use strongbox_store::{Account, AuditAction, IdentityStore, NewAccount, OAuthProfile};

use crate::audit::{AuditService, ClientInfo};
use crate::error::{FieldError, Result, ServiceError};
use crate::password::{hash_password, validate_password_policy, verify_password};
use crate::tokens::TokenIssuer;

/// Public view of an account, safe to serialise to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.display_name.clone(),
            created_at: account.created_at,
        }
    }
}

/// Credentials minted on successful registration, login or OAuth sign-in.
#[derive(Debug)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: OpaqueToken,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Authentication and session service.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityStore>,
    audit: AuditService,
    tokens: TokenIssuer,
    master_key: Arc<MasterKey>,
    hash_cost: u32,
    refresh_ttl_secs: i64,
    /// Verified against when the account lookup fails, so a missing email
    /// costs the same time as a wrong password.
    timing_pad_hash: String,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        audit: AuditService,
        tokens: TokenIssuer,
        master_key: Arc<MasterKey>,
        hash_cost: u32,
        refresh_ttl_secs: i64,
    ) -> Result<Self> {
        let timing_pad_hash = hash_password("strongbox-timing-pad", hash_cost)?;
        Ok(Self {
            identity,
            audit,
            tokens,
            master_key,
            hash_cost,
            refresh_ttl_secs,
            timing_pad_hash,
        })
    }

    /// Registers a new password account with a fresh wrapped per-user key.
    pub async fn register(
        &self,
        input: RegisterInput,
        client: &ClientInfo,
    ) -> Result<(AccountView, AuthTokens)> {
        let email = normalise_email(&input.email);
        let mut errors = validate_email(&email);
        errors.extend(validate_password_policy(&input.password));
        if let Some(name) = &input.name {
            if name.chars().count() > 100 {
                errors.push(FieldError::new("name", "must be at most 100 characters"));
            }
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        if self.identity.find_account_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email already registered".into()));
        }

        let credential_hash = hash_password(&input.password, self.hash_cost)?;
        let wrapped_key = self.master_key.wrap(&UserKey::generate())?;

        let account = self
            .identity
            .create_account(NewAccount {
                email: Some(email),
                credential_hash: Some(credential_hash),
                display_name: input.name,
                wrapped_key: Some(wrapped_key.into_bytes()),
            })
            .await?;

        info!(account_id = %account.id, "account registered");
        let tokens = self.issue_tokens(&account).await?;
        self.audit
            .record(account.id, AuditAction::Login, client, None, None)
            .await;
        Ok(((&account).into(), tokens))
    }

    /// Verifies an email/password pair and issues tokens.
    ///
    /// Unknown email and wrong password produce the identical error, and
    /// both paths run one hash verification.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<(AccountView, AuthTokens)> {
        let email = normalise_email(email);
        let account = self.identity.find_account_by_email(&email).await?;

        let stored_hash = account
            .as_ref()
            .and_then(|a| a.credential_hash.as_deref())
            .unwrap_or(&self.timing_pad_hash);
        let verified = verify_password(password, stored_hash);

        let Some(account) = account.filter(|a| a.credential_hash.is_some() && verified) else {
            return Err(ServiceError::InvalidCredentials);
        };

        let tokens = self.issue_tokens(&account).await?;
        self.audit
            .record(account.id, AuditAction::Login, client, None, None)
            .await;
        Ok(((&account).into(), tokens))
    }

    /// Exchanges a valid refresh token for a new bearer credential.
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<(AccountView, String)> {
        let record = self
            .identity
            .find_active_refresh(&fingerprint(raw_refresh_token), Utc::now())
            .await?
            .ok_or(ServiceError::Unauthenticated { expired: false })?;

        let account = self
            .identity
            .find_account_by_id(record.account_id)
            .await?
            .ok_or(ServiceError::Unauthenticated { expired: false })?;

        let access_token = self.tokens.issue(account.id, account.email.as_deref())?;
        Ok(((&account).into(), access_token))
    }

    /// Revokes the refresh record behind the cookie. Idempotent: an
    /// unknown or already-revoked token succeeds quietly.
    pub async fn logout(&self, raw_refresh_token: &str, client: &ClientInfo) -> Result<()> {
        let fp = fingerprint(raw_refresh_token);
        // Resolve the account first so the audit entry can be attributed;
        // a dead token simply skips the audit.
        let record = self.identity.find_active_refresh(&fp, Utc::now()).await?;
        self.identity.revoke_refresh_by_fingerprint(&fp).await?;
        if let Some(record) = record {
            self.audit
                .record(record.account_id, AuditAction::Logout, client, None, None)
                .await;
        }
        Ok(())
    }

    /// Revokes every active refresh record for the account.
    pub async fn revoke_all(&self, account_id: Uuid, client: &ClientInfo) -> Result<u64> {
        let revoked = self.identity.revoke_all_refresh(account_id).await?;
        self.audit
            .record(
                account_id,
                AuditAction::Logout,
                client,
                None,
                Some(serde_json::json!({ "revokedSessions": revoked })),
            )
            .await;
        Ok(revoked)
    }

    /// Completes an OAuth sign-in: find-or-link the account and issue
    /// tokens. A wrapped per-user key is guaranteed to exist afterwards.
    pub async fn oauth_sign_in(
        &self,
        profile: OAuthProfile,
        client: &ClientInfo,
    ) -> Result<(AccountView, AuthTokens)> {
        let provider = profile.provider.clone();
        let fresh_wrapped = self.master_key.wrap(&UserKey::generate())?;
        let (account, created) = self
            .identity
            .find_or_create_oauth_link(profile, fresh_wrapped.as_bytes())
            .await?;

        info!(account_id = %account.id, provider = %provider, created, "oauth sign-in");
        let tokens = self.issue_tokens(&account).await?;
        self.audit
            .record(
                account.id,
                AuditAction::Login,
                client,
                None,
                Some(serde_json::json!({ "provider": provider })),
            )
            .await;
        Ok(((&account).into(), tokens))
    }

    /// The authenticated caller's own account.
    pub async fn me(&self, account_id: Uuid) -> Result<AccountView> {
        let account = self
            .identity
            .find_account_by_id(account_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok((&account).into())
    }

    async fn issue_tokens(&self, account: &Account) -> Result<AuthTokens> {
        let access_token = self.tokens.issue(account.id, account.email.as_deref())?;
        let refresh_token = OpaqueToken::generate();
        let refresh_expires_at = Utc::now() + Duration::seconds(self.refresh_ttl_secs);
        self.identity
            .create_refresh_token(account.id, &refresh_token.fingerprint(), refresh_expires_at)
            .await?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("hash_cost", &self.hash_cost)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let well_formed = email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if !well_formed {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn email_normalisation_and_validation() {
        assert_eq!(normalise_email("  A@X.Test "), "a@x.test");
        assert!(validate_email("a@x.test").is_empty());
        assert!(!validate_email("not-an-email").is_empty());
        assert!(!validate_email("@x.test").is_empty());
        assert!(!validate_email("a@nodot").is_empty());
    }
}
