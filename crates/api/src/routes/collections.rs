//! Collection routes

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use strongbox_service::org::CollectionInput;

use crate::error::ApiError;
use crate::extract::{AppJson, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list).post(create))
        .route("/collections/move", post(move_entries))
        .route("/collections/{id}", axum::routing::put(update).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CollectionBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

impl From<CollectionBody> for CollectionInput {
    fn from(body: CollectionBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            icon: body.icon,
            color: body.color,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Response, ApiError> {
    let collections = state.org.list_collections(claims.account_id).await?;
    Ok(Json(json!({ "collections": collections })).into_response())
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    AppJson(body): AppJson<CollectionBody>,
) -> Result<Response, ApiError> {
    let collection = state
        .org
        .create_collection(claims.account_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "collection": collection }))).into_response())
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<CollectionBody>,
) -> Result<Response, ApiError> {
    let collection = state
        .org
        .update_collection(claims.account_id, id, body.into())
        .await?;
    Ok(Json(json!({ "collection": collection })).into_response())
}

async fn delete_one(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.org.delete_collection(claims.account_id, id).await?;
    Ok(Json(json!({ "message": "Collection deleted" })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MoveBody {
    entry_ids: Vec<Uuid>,
    /// Absent or null moves the entries to uncategorised.
    #[serde(default)]
    collection_id: Option<Uuid>,
}

async fn move_entries(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    AppJson(body): AppJson<MoveBody>,
) -> Result<Response, ApiError> {
    let moved = state
        .org
        .move_entries(claims.account_id, &body.entry_ids, body.collection_id)
        .await?;
    Ok(Json(json!({ "moved": moved })).into_response())
}
