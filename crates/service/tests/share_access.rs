//! Capability token issuance, consumption and disclosure

mod common;

use pretty_assertions::assert_eq;
use strongbox_service::{
    ClientInfo, CreateEntryInput, CreateShareInput, RegisterInput, ServiceError,
};
use strongbox_store::AuditAction;
use uuid::Uuid;

async fn account_with_entry(stack: &common::TestStack) -> (Uuid, Uuid) {
    let (user, _) = stack
        .auth
        .register(
            RegisterInput {
                email: "owner@x.test".to_string(),
                password: "Passw0rd!".to_string(),
                name: None,
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();
    let entry = stack
        .vault
        .create(
            user.id,
            CreateEntryInput {
                title: "Gmail".to_string(),
                username: Some("alice".to_string()),
                password: "Hunter2A!".to_string(),
                site: Some("https://mail.test".to_string()),
                notes: Some("the recovery codes are in the safe".to_string()),
                tags: vec![],
                collection_id: None,
                is_favourite: false,
                is_pinned: false,
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();
    (user.id, entry.summary.id)
}

#[tokio::test]
async fn token_is_accepted_exactly_max_views_times() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let (view, token) = stack
        .shares
        .create_share(
            owner,
            entry_id,
            CreateShareInput {
                max_views: Some(2),
                expires_in_hours: Some(24),
                include_secret: Some(true),
                include_notes: Some(false),
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();
    assert_eq!(view.view_count, 0);

    let first = stack.shares.access(token.reveal(), None).await.unwrap();
    assert_eq!(first.password.as_deref(), Some("Hunter2A!"));
    assert_eq!(first.notes, None);
    assert_eq!(first.views_remaining, 1);

    let second = stack.shares.access(token.reveal(), None).await.unwrap();
    assert_eq!(second.views_remaining, 0);

    let third = stack.shares.access(token.reveal(), None).await.unwrap_err();
    assert!(matches!(third, ServiceError::NotFound));
}

#[tokio::test]
async fn unknown_and_exhausted_tokens_share_one_error() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let (_, token) = stack
        .shares
        .create_share(owner, entry_id, CreateShareInput::default(), &ClientInfo::default())
        .await
        .unwrap();
    stack.shares.access(token.reveal(), None).await.unwrap();

    let exhausted = stack.shares.access(token.reveal(), None).await.unwrap_err();
    let unknown = stack.shares.access("no-such-token", None).await.unwrap_err();
    assert_eq!(exhausted.to_string(), unknown.to_string());
}

#[tokio::test]
async fn notes_disclosure_is_opt_in() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let (_, token) = stack
        .shares
        .create_share(
            owner,
            entry_id,
            CreateShareInput {
                include_secret: Some(false),
                include_notes: Some(true),
                ..CreateShareInput::default()
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();

    let view = stack.shares.access(token.reveal(), None).await.unwrap();
    assert_eq!(view.password, None);
    assert_eq!(
        view.notes.as_deref(),
        Some("the recovery codes are in the safe")
    );
    assert_eq!(view.title, "Gmail");
    assert_eq!(view.username, "alice");
}

#[tokio::test]
async fn share_creation_is_owner_only() {
    let stack = common::stack();
    let (_, entry_id) = account_with_entry(&stack).await;

    let (stranger, _) = stack
        .auth
        .register(
            RegisterInput {
                email: "stranger@x.test".to_string(),
                password: "Passw0rd!".to_string(),
                name: None,
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();

    let err = stack
        .shares
        .create_share(
            stranger.id,
            entry_id,
            CreateShareInput::default(),
            &ClientInfo::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn listing_exposes_metadata_and_revoke_kills_the_token() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let (created, token) = stack
        .shares
        .create_share(owner, entry_id, CreateShareInput::default(), &ClientInfo::default())
        .await
        .unwrap();

    let listed = stack.shares.list_shares(owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].max_views, 1);

    stack.shares.revoke_share(owner, created.id).await.unwrap();
    assert!(stack.shares.list_shares(owner).await.unwrap().is_empty());
    assert!(stack.shares.access(token.reveal(), None).await.is_err());
}

#[tokio::test]
async fn invalid_share_options_are_rejected() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let err = stack
        .shares
        .create_share(
            owner,
            entry_id,
            CreateShareInput {
                max_views: Some(0),
                expires_in_hours: Some(10_000),
                ..CreateShareInput::default()
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation, got {other:?}"),
    }
}

#[tokio::test]
async fn access_audits_against_the_issuer_with_accessor_address() {
    let stack = common::stack();
    let (owner, entry_id) = account_with_entry(&stack).await;

    let (_, token) = stack
        .shares
        .create_share(owner, entry_id, CreateShareInput::default(), &ClientInfo::default())
        .await
        .unwrap();
    stack
        .shares
        .access(token.reveal(), Some("198.51.100.7"))
        .await
        .unwrap();

    let records = stack
        .audit
        .query(owner, strongbox_service::AuditQuery::default())
        .await
        .unwrap();
    let access = records
        .iter()
        .find(|r| r.action == AuditAction::ShareAccess)
        .expect("share_access audit record");
    assert_eq!(access.account_id, owner);
    assert_eq!(access.network_address.as_deref(), Some("198.51.100.7"));
}
