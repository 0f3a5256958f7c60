//! Vault engine end-to-end scenarios over the in-memory backend

mod common;

use pretty_assertions::assert_eq;
use strongbox_service::{
    ClientInfo, CreateEntryInput, ImportEntryInput, RegisterInput, ServiceError, UpdateEntryInput,
};
use strongbox_store::{AuditAction, EntryFilter};
use uuid::Uuid;

fn entry_input(title: &str, password: &str) -> CreateEntryInput {
    CreateEntryInput {
        title: title.to_string(),
        username: None,
        password: password.to_string(),
        site: None,
        notes: None,
        tags: vec![],
        collection_id: None,
        is_favourite: false,
        is_pinned: false,
    }
}

async fn register(stack: &common::TestStack, email: &str) -> Uuid {
    let (user, _) = stack
        .auth
        .register(
            RegisterInput {
                email: email.to_string(),
                password: "Passw0rd!".to_string(),
                name: None,
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();
    user.id
}

#[tokio::test]
async fn create_list_get_round_trip_with_audit() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let created = stack
        .vault
        .create(account, entry_input("Gmail", "Hunter2A!"), &client)
        .await
        .unwrap();
    assert_eq!(created.password, "Hunter2A!");
    assert_eq!(created.summary.strength, Some(4));

    let listed = stack
        .vault
        .list(account, &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Gmail");

    let detail = stack
        .vault
        .get(account, created.summary.id, &client)
        .await
        .unwrap();
    assert_eq!(detail.password, "Hunter2A!");
    assert!(detail.summary.last_used_at.is_none());

    // Audit trail: login, create, reveal.
    let actions: Vec<AuditAction> = stack
        .audit
        .query(account, strongbox_service::AuditQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert!(actions.contains(&AuditAction::Create));
    assert!(actions.contains(&AuditAction::Reveal));

    // last_used_at was bumped by the reveal.
    let after = stack
        .vault
        .get(account, created.summary.id, &client)
        .await
        .unwrap();
    assert!(after.summary.last_used_at.is_some());
}

#[tokio::test]
async fn secret_update_recomputes_strength() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let created = stack
        .vault
        .create(account, entry_input("Weak", "aaa"), &client)
        .await
        .unwrap();
    assert_eq!(created.summary.strength, Some(0));

    let updated = stack
        .vault
        .update(
            account,
            created.summary.id,
            UpdateEntryInput {
                password: Some("Correct-Horse-Battery-Staple-9".to_string()),
                ..UpdateEntryInput::default()
            },
            &client,
        )
        .await
        .unwrap();
    assert_eq!(updated.strength, Some(4));

    let listed = stack
        .vault
        .list(account, &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(listed[0].strength, Some(4));

    let health = stack.vault.health(account).await.unwrap();
    assert_eq!(health.strong, 1);
    assert_eq!(health.weak, 0);
}

#[tokio::test]
async fn other_accounts_cannot_observe_an_entry() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let a = register(&stack, "a@x.test").await;
    let b = register(&stack, "b@x.test").await;

    let created = stack
        .vault
        .create(a, entry_input("Gmail", "Hunter2A!"), &client)
        .await
        .unwrap();

    // Not Forbidden: existence is not confirmed.
    let err = stack
        .vault
        .get(b, created.summary.id, &client)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    assert!(stack
        .vault
        .list(b, &EntryFilter::default())
        .await
        .unwrap()
        .is_empty());

    let deleted = stack
        .vault
        .bulk_delete(b, &[created.summary.id], &client)
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn health_counts_reuse_per_duplicate_occurrence() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    for title in ["One", "Two", "Three"] {
        stack
            .vault
            .create(account, entry_input(title, "reuse-me"), &client)
            .await
            .unwrap();
    }

    let health = stack.vault.health(account).await.unwrap();
    assert_eq!(health.total, 3);
    assert_eq!(health.reused, 3);
}

#[tokio::test]
async fn health_classifies_empty_secret_as_no_secret() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    stack
        .vault
        .create(account, entry_input("Empty", ""), &client)
        .await
        .unwrap();
    stack
        .vault
        .create(account, entry_input("Strong", "Hunter2A!"), &client)
        .await
        .unwrap();

    let health = stack.vault.health(account).await.unwrap();
    assert_eq!(health.total, 2);
    assert_eq!(health.no_secret, 1);
    assert_eq!(health.strong, 1);
    assert_eq!(health.score, 50);
}

#[tokio::test]
async fn list_orders_pinned_then_favourites_then_recency() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let plain = stack
        .vault
        .create(account, entry_input("Plain", "Hunter2A!"), &client)
        .await
        .unwrap();
    let favourite = stack
        .vault
        .create(account, entry_input("Favourite", "Hunter2A!"), &client)
        .await
        .unwrap();
    let pinned = stack
        .vault
        .create(account, entry_input("Pinned", "Hunter2A!"), &client)
        .await
        .unwrap();

    stack
        .vault
        .toggle_favourite(account, favourite.summary.id)
        .await
        .unwrap();
    stack
        .vault
        .toggle_pinned(account, pinned.summary.id)
        .await
        .unwrap();

    let listed = stack
        .vault
        .list(account, &EntryFilter::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|e| e.id).collect();
    assert_eq!(
        ids,
        vec![pinned.summary.id, favourite.summary.id, plain.summary.id]
    );
}

#[tokio::test]
async fn filters_compose() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let mut input = entry_input("Gmail account", "Hunter2A!");
    input.tags = vec!["work".to_string()];
    stack.vault.create(account, input, &client).await.unwrap();
    stack
        .vault
        .create(account, entry_input("Bank", "aaa"), &client)
        .await
        .unwrap();

    let by_query = stack
        .vault
        .list(
            account,
            &EntryFilter {
                query: Some("gmail".to_string()),
                ..EntryFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_query.len(), 1);
    assert_eq!(by_query[0].title, "Gmail account");

    let work_tag = stack.org.list_tags(account).await.unwrap();
    let by_tag = stack
        .vault
        .list(
            account,
            &EntryFilter {
                tag_ids: vec![work_tag[0].id],
                ..EntryFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_tag.len(), 1);

    let by_strength = stack
        .vault
        .list(
            account,
            &EntryFilter {
                strength_min: Some(3),
                ..EntryFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_strength.len(), 1);
    assert_eq!(by_strength[0].title, "Gmail account");
}

#[tokio::test]
async fn toggles_flip_and_report_the_new_value() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let created = stack
        .vault
        .create(account, entry_input("Gmail", "Hunter2A!"), &client)
        .await
        .unwrap();
    let id = created.summary.id;

    assert!(stack.vault.toggle_favourite(account, id).await.unwrap());
    assert!(!stack.vault.toggle_favourite(account, id).await.unwrap());
    assert!(stack.vault.toggle_pinned(account, id).await.unwrap());
}

#[tokio::test]
async fn export_then_import_skips_duplicates_and_counts() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    stack
        .vault
        .create(account, entry_input("Gmail", "Hunter2A!"), &client)
        .await
        .unwrap();

    let exported = stack.vault.export(account, &client).await.unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].password, "Hunter2A!");

    let report = stack
        .vault
        .import(
            account,
            vec![
                // Duplicate of the existing entry: skipped.
                ImportEntryInput {
                    title: "Gmail".into(),
                    username: None,
                    password: "Hunter2A!".into(),
                    site: None,
                    notes: None,
                    tags: vec![],
                    is_favourite: false,
                    is_pinned: false,
                },
                // Fresh entry: imported.
                ImportEntryInput {
                    title: "Bank".into(),
                    username: Some("alice".into()),
                    password: "An0ther-Secret!".into(),
                    site: Some("https://bank.test".into()),
                    notes: None,
                    tags: vec!["finance".into()],
                    is_favourite: true,
                    is_pinned: false,
                },
                // Invalid title: skipped.
                ImportEntryInput {
                    title: "   ".into(),
                    username: None,
                    password: "x".into(),
                    site: None,
                    notes: None,
                    tags: vec![],
                    is_favourite: false,
                    is_pinned: false,
                },
            ],
            &client,
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 2);

    let listed = stack
        .vault
        .list(account, &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn delete_requires_ownership_and_audits() {
    let stack = common::stack();
    let client = ClientInfo::default();
    let account = register(&stack, "a@x.test").await;

    let created = stack
        .vault
        .create(account, entry_input("Gmail", "Hunter2A!"), &client)
        .await
        .unwrap();

    stack
        .vault
        .delete(account, created.summary.id, &client)
        .await
        .unwrap();
    let err = stack
        .vault
        .delete(account, created.summary.id, &client)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    let actions: Vec<AuditAction> = stack
        .audit
        .query(account, strongbox_service::AuditQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert!(actions.contains(&AuditAction::Delete));
}
