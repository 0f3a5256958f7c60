//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use strongbox_service::{
    AuditService, AuthService, OrgService, ServiceError, ShareService, TokenIssuer, VaultService,
};
use strongbox_store::{
    AuditStore, CollectionStore, EntryStore, IdentityStore, ShareStore, TagStore,
};

use crate::config::AppConfig;
use crate::rate_limit::RateLimiters;

/// Everything a handler needs. Cheap to clone; services share `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub vault: VaultService,
    pub org: OrgService,
    pub shares: ShareService,
    pub audit: AuditService,
    pub tokens: TokenIssuer,
    pub config: Arc<AppConfig>,
    pub rate: Arc<RateLimiters>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Wires the full service stack over one storage backend. Both the
    /// Postgres store and the in-memory test store satisfy the bound.
    pub fn from_backend<B>(config: AppConfig, backend: B) -> Result<Self, ServiceError>
    where
        B: IdentityStore
            + EntryStore
            + CollectionStore
            + TagStore
            + ShareStore
            + AuditStore
            + Clone
            + 'static,
    {
        let identity: Arc<dyn IdentityStore> = Arc::new(backend.clone());
        let entries: Arc<dyn EntryStore> = Arc::new(backend.clone());
        let collections: Arc<dyn CollectionStore> = Arc::new(backend.clone());
        let tags: Arc<dyn TagStore> = Arc::new(backend.clone());
        let share_store: Arc<dyn ShareStore> = Arc::new(backend.clone());
        let audit_store: Arc<dyn AuditStore> = Arc::new(backend);

        let audit = AuditService::new(audit_store);
        let tokens = TokenIssuer::new(&config.jwt_secret, config.access_ttl_secs);

        let auth = AuthService::new(
            identity.clone(),
            audit.clone(),
            tokens.clone(),
            config.master_key.clone(),
            config.hash_cost,
            config.refresh_ttl_secs,
        )?;
        let vault = VaultService::new(
            identity.clone(),
            entries.clone(),
            tags.clone(),
            audit.clone(),
            config.master_key.clone(),
        );
        let org = OrgService::new(collections, tags);
        let shares = ShareService::new(
            identity,
            entries,
            share_store,
            audit.clone(),
            config.master_key.clone(),
        );

        let rate = Arc::new(RateLimiters::new(
            config.auth_rate_per_window,
            config.general_rate_per_window,
        ));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::internal(format!("http client: {e}")))?;

        Ok(Self {
            auth,
            vault,
            org,
            shares,
            audit,
            tokens,
            config: Arc::new(config),
            rate,
            http,
        })
    }
}
