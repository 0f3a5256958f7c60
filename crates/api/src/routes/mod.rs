//! Route modules and the `/api` router

pub mod audit;
pub mod auth;
pub mod collections;
pub mod passwords;
pub mod shares;
pub mod tags;

use axum::Json;
use axum::Router;
use axum::routing::get;
use serde_json::{Value, json};

use crate::state::AppState;

/// Everything mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(passwords::router())
        .merge(collections::router())
        .merge(tags::router())
        .merge(shares::router())
        .merge(audit::router())
}

/// Liveness probe; public.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
