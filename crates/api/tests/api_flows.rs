//! End-to-end flows through the router over the in-memory backend

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use strongbox_api::{AppConfig, AppState, router};
use strongbox_crypto::MasterKey;
use strongbox_service::TokenIssuer;
use strongbox_store::memory::MemoryStore;

const JWT_SECRET: &[u8] = b"api-test-signing-secret-api-test-secret";

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        master_key: Arc::new(MasterKey::from_bytes(&[7u8; 32]).unwrap()),
        jwt_secret: JWT_SECRET.to_vec(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 3600,
        hash_cost: 1,
        frontend_origin: "http://localhost:5173".parse().unwrap(),
        frontend_url: "http://localhost:5173".into(),
        google: None,
        github: None,
        port: 0,
        production: false,
        max_body_bytes: 64 * 1024,
        db_max_connections: 1,
        auth_rate_per_window: 50,
        general_rate_per_window: 500,
    }
}

fn app() -> Router {
    app_with_config(test_config())
}

fn app_with_config(config: AppConfig) -> Router {
    let state = AppState::from_backend(config, MemoryStore::new()).unwrap();
    router(state)
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    bearer: Option<&str>,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, http::HeaderMap, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("x-forwarded-for", "203.0.113.10");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, value)
}

async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, headers, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        None,
        Some(json!({ "email": email, "password": "Passw0rd!", "name": "Tester" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let access = body["accessToken"].as_str().unwrap().to_string();
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    (access, set_cookie)
}

#[tokio::test]
async fn register_sets_a_scoped_http_only_refresh_cookie() {
    let app = app();
    let (_, set_cookie) = register(&app, "a@x.test").await;

    assert!(set_cookie.starts_with("strongbox_refresh="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/api/auth"));
    // Not production: no Secure attribute.
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn vault_flow_hides_secrets_in_lists_and_reveals_on_get() {
    let app = app();
    let (access, _) = register(&app, "a@x.test").await;

    let (status, _, created) = send(
        &app,
        "POST",
        "/api/passwords",
        Some(&access),
        None,
        Some(json!({ "title": "Gmail", "password": "Hunter2A!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["entry"]["strength"], json!(4));

    let (status, _, listed) = send(&app, "GET", "/api/passwords", Some(&access), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = listed["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].get("password").is_none());

    let (status, _, detail) = send(
        &app,
        "GET",
        &format!("/api/passwords/{entry_id}"),
        Some(&access),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["entry"]["password"], json!("Hunter2A!"));

    // Audit trail now holds login, create and reveal.
    let (_, _, audit) = send(&app, "GET", "/api/audit", Some(&access), None, None).await;
    let actions: Vec<&str> = audit["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"create"));
    assert!(actions.contains(&"reveal"));
    assert!(actions.contains(&"login"));
}

#[tokio::test]
async fn missing_expired_and_garbage_bearers_are_distinguished() {
    let app = app();

    let (status, _, body) = send(&app, "GET", "/api/auth/me", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("TOKEN_INVALID"));

    let expired = TokenIssuer::new(JWT_SECRET, -60)
        .issue(uuid::Uuid::new_v4(), None)
        .unwrap();
    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&expired), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("TOKEN_EXPIRED"));

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some("garbage"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("TOKEN_INVALID"));
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = app();
    let (access, _) = register(&app, "a@x.test").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/passwords",
        Some(&access),
        None,
        Some(json!({ "title": "Gmail", "password": "x", "surprise": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], json!("body"));
}

#[tokio::test]
async fn other_accounts_get_404_not_403() {
    let app = app();
    let (owner, _) = register(&app, "a@x.test").await;
    let (stranger, _) = register(&app, "b@x.test").await;

    let (_, _, created) = send(
        &app,
        "POST",
        "/api/passwords",
        Some(&owner),
        None,
        Some(json!({ "title": "Gmail", "password": "Hunter2A!" })),
    )
    .await;
    let entry_id = created["entry"]["id"].as_str().unwrap();

    let (status, _, _) = send(
        &app,
        "GET",
        &format!("/api/passwords/{entry_id}"),
        Some(&stranger),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn share_token_works_exactly_max_views_times() {
    let app = app();
    let (access, _) = register(&app, "a@x.test").await;

    let (_, _, created) = send(
        &app,
        "POST",
        "/api/passwords",
        Some(&access),
        None,
        Some(json!({ "title": "Gmail", "password": "Hunter2A!", "notes": "keep quiet" })),
    )
    .await;
    let entry_id = created["entry"]["id"].as_str().unwrap();

    let (status, _, share) = send(
        &app,
        "POST",
        &format!("/api/passwords/{entry_id}/share"),
        Some(&access),
        None,
        Some(json!({ "maxViews": 2, "expiresInHours": 24 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = share["token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, _, body) =
            send(&app, "GET", &format!("/api/share/{token}"), None, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entry"]["password"], json!("Hunter2A!"));
        // Notes were not included in the grant.
        assert!(body["entry"].get("notes").is_none());
    }

    let (status, _, _) = send(&app, "GET", &format!("/api/share/{token}"), None, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Listing shows metadata but never the raw token.
    let (_, _, listed) = send(&app, "GET", "/api/shares", Some(&access), None, None).await;
    assert_eq!(listed["shares"][0]["viewCount"], json!(2));
    assert!(listed["shares"][0].get("token").is_none());
    assert!(listed["shares"][0].get("tokenFingerprint").is_none());
}

#[tokio::test]
async fn refresh_rotates_bearer_and_logout_kills_it() {
    let app = app();
    let (access, set_cookie) = register(&app, "a@x.test").await;
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let (status, _, refreshed) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["accessToken"].is_string());

    let (status, headers, _) = send(
        &app,
        "POST",
        "/api/auth/logout",
        Some(&access),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Logout clears the cookie.
    let cleared = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.starts_with("strongbox_refresh=;"));

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_bucket_rate_limits_by_client_address() {
    let mut config = test_config();
    config.auth_rate_per_window = 3;
    let app = app_with_config(config);

    let body = json!({ "email": "a@x.test", "password": "wrong" });
    let mut last_status = StatusCode::OK;
    for _ in 0..4 {
        let (status, _, _) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            None,
            Some(body.clone()),
        )
        .await;
        last_status = status;
    }
    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);

    // A different client address still has budget.
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("x-forwarded-for", "203.0.113.99")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn validation_errors_list_field_and_message() {
    let app = app();
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        None,
        Some(json!({ "email": "a@x.test", "password": "weak" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e["field"] == json!("password")));
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = app();
    let (status, _, body) = send(&app, "GET", "/api/health", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn vault_health_classifies_reuse() {
    let app = app();
    let (access, _) = register(&app, "a@x.test").await;

    for title in ["One", "Two", "Three"] {
        send(
            &app,
            "POST",
            "/api/passwords",
            Some(&access),
            None,
            Some(json!({ "title": title, "password": "reuse-me" })),
        )
        .await;
    }

    let (status, _, health) = send(
        &app,
        "GET",
        "/api/passwords/health",
        Some(&access),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["total"], json!(3));
    assert_eq!(health["reused"], json!(3));
}
