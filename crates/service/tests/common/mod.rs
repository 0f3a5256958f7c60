//! Shared test stack over the in-memory backend

#![allow(dead_code)]

use std::sync::Arc;

use strongbox_crypto::MasterKey;
use strongbox_service::{
    AuditService, AuthService, OrgService, ShareService, TokenIssuer, VaultService,
};
use strongbox_store::memory::MemoryStore;

pub const JWT_SECRET: &[u8] = b"test-signing-secret-test-signing-secret";

pub struct TestStack {
    pub auth: AuthService,
    pub vault: VaultService,
    pub org: OrgService,
    pub shares: ShareService,
    pub audit: AuditService,
    pub store: MemoryStore,
}

pub fn stack() -> TestStack {
    let store = MemoryStore::new();
    let master_key = Arc::new(MasterKey::from_bytes(&[7u8; 32]).unwrap());
    let audit = AuditService::new(Arc::new(store.clone()));
    let tokens = TokenIssuer::new(JWT_SECRET, 900);

    let auth = AuthService::new(
        Arc::new(store.clone()),
        audit.clone(),
        tokens,
        master_key.clone(),
        1,
        3600,
    )
    .unwrap();
    let vault = VaultService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        audit.clone(),
        master_key.clone(),
    );
    let org = OrgService::new(Arc::new(store.clone()), Arc::new(store.clone()));
    let shares = ShareService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        audit.clone(),
        master_key,
    );

    TestStack {
        auth,
        vault,
        org,
        shares,
        audit,
        store,
    }
}
