//! Tag routes

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{AppJson, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list).post(create))
        .route("/tags/{id}", axum::routing::delete(delete_one))
        .route("/passwords/{id}/tags", post(set_entry_tags))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TagBody {
    name: String,
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Response, ApiError> {
    let tags = state.org.list_tags(claims.account_id).await?;
    Ok(Json(json!({ "tags": tags })).into_response())
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    AppJson(body): AppJson<TagBody>,
) -> Result<Response, ApiError> {
    let tag = state.org.create_tag(claims.account_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(json!({ "tag": tag }))).into_response())
}

async fn delete_one(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.org.delete_tag(claims.account_id, id).await?;
    Ok(Json(json!({ "message": "Tag deleted" })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SetTagsBody {
    tags: Vec<String>,
}

async fn set_entry_tags(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<SetTagsBody>,
) -> Result<Response, ApiError> {
    let tags = state
        .org
        .set_entry_tags(claims.account_id, id, &body.tags)
        .await?;
    Ok(Json(json!({ "tags": tags })).into_response())
}
