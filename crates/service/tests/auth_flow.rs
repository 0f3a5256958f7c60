//! Registration, login, refresh and revocation

mod common;

use pretty_assertions::assert_eq;
use strongbox_service::{ClientInfo, RegisterInput, ServiceError, TokenIssuer};

fn register_input(email: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        password: "Passw0rd!".to_string(),
        name: Some("Tester".to_string()),
    }
}

#[tokio::test]
async fn register_issues_tokens_and_wraps_a_key() {
    let stack = common::stack();
    let client = ClientInfo::default();

    let (user, tokens) = stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();

    assert_eq!(user.email.as_deref(), Some("a@x.test"));
    assert_eq!(user.name.as_deref(), Some("Tester"));

    // The bearer credential verifies against the same issuer.
    let issuer = TokenIssuer::new(common::JWT_SECRET, 900);
    let claims = issuer.verify(&tokens.access_token).unwrap();
    assert_eq!(claims.account_id, user.id);

    // The refresh token round-trips into a new bearer.
    let (refreshed_user, _access) = stack
        .auth
        .refresh(tokens.refresh_token.reveal())
        .await
        .unwrap();
    assert_eq!(refreshed_user.id, user.id);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let stack = common::stack();
    let client = ClientInfo::default();

    stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();
    let err = stack
        .auth
        .register(register_input("A@X.test"), &client)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn weak_passwords_are_rejected_with_field_errors() {
    let stack = common::stack();
    let client = ClientInfo::default();

    for password in ["Sh0rt!", "nouppercase1", "NOLOWERCASE1", "NoDigitsHere"] {
        let err = stack
            .auth
            .register(
                RegisterInput {
                    email: "weak@x.test".into(),
                    password: password.into(),
                    name: None,
                },
                &client,
            )
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.iter().all(|e| e.field == "password"));
            }
            other => panic!("expected validation, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let stack = common::stack();
    let client = ClientInfo::default();

    stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();

    let wrong_password = stack
        .auth
        .login("a@x.test", "Wr0ngPass!", &client)
        .await
        .unwrap_err();
    let unknown_email = stack
        .auth
        .login("ghost@x.test", "Passw0rd!", &client)
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
    assert!(matches!(unknown_email, ServiceError::InvalidCredentials));
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let stack = common::stack();
    let client = ClientInfo::default();

    let (_, tokens) = stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();
    let raw = tokens.refresh_token.reveal().to_string();

    // Works before logout, fails after; logout itself stays idempotent.
    stack.auth.refresh(&raw).await.unwrap();
    stack.auth.logout(&raw, &client).await.unwrap();
    stack.auth.logout(&raw, &client).await.unwrap();

    let err = stack.auth.refresh(&raw).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Unauthenticated { expired: false }
    ));
}

#[tokio::test]
async fn revoke_all_kills_every_session() {
    let stack = common::stack();
    let client = ClientInfo::default();

    let (user, first) = stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();
    let (_, second) = stack
        .auth
        .login("a@x.test", "Passw0rd!", &client)
        .await
        .unwrap();

    let revoked = stack.auth.revoke_all(user.id, &client).await.unwrap();
    assert_eq!(revoked, 2);

    for raw in [first.refresh_token.reveal(), second.refresh_token.reveal()] {
        assert!(stack.auth.refresh(raw).await.is_err());
    }
}

#[tokio::test]
async fn oauth_sign_in_links_by_email_and_materialises_a_key() {
    let stack = common::stack();
    let client = ClientInfo::default();

    let (registered, _) = stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();

    let profile = strongbox_store::OAuthProfile {
        provider: "github".into(),
        provider_account_id: "gh-123".into(),
        email: Some("a@x.test".into()),
        display_name: Some("Tester".into()),
        access_token: None,
        refresh_token: None,
    };
    let (linked, _) = stack.auth.oauth_sign_in(profile.clone(), &client).await.unwrap();
    assert_eq!(linked.id, registered.id);

    // Second sign-in resolves through the provider link.
    let (again, _) = stack.auth.oauth_sign_in(profile, &client).await.unwrap();
    assert_eq!(again.id, registered.id);
}

#[tokio::test]
async fn login_writes_an_audit_record() {
    let stack = common::stack();
    let client = ClientInfo {
        address: Some("203.0.113.9".into()),
        user_agent: Some("cli/1.0".into()),
    };

    let (user, _) = stack
        .auth
        .register(register_input("a@x.test"), &client)
        .await
        .unwrap();

    let records = stack
        .audit
        .query(user.id, strongbox_service::AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, strongbox_store::AuditAction::Login);
    assert_eq!(records[0].network_address.as_deref(), Some("203.0.113.9"));
}
