//! Vault entry routes

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use http::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use uuid::Uuid;

use strongbox_service::{
    CreateEntryInput, FieldError, ImportEntryInput, UpdateEntryInput,
};
use strongbox_store::EntryFilter;

use crate::error::ApiError;
use crate::extract::{AppJson, ClientMeta, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/passwords", get(list).post(create))
        .route("/passwords/direct-save", post(direct_save))
        .route("/passwords/health", get(health))
        .route("/passwords/export", get(export))
        .route("/passwords/import", post(import))
        .route("/passwords/bulk-delete", post(bulk_delete))
        .route("/passwords/{id}", get(get_one).put(update).delete(delete_one))
        .route("/passwords/{id}/favorite", post(toggle_favorite))
        .route("/passwords/{id}/pin", post(toggle_pin))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListQuery {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    collection_id: Option<Uuid>,
    /// Comma-separated tag ids
    #[serde(default)]
    tag_ids: Option<String>,
    #[serde(default)]
    is_favorite: Option<bool>,
    #[serde(default)]
    is_pinned: Option<bool>,
    #[serde(default)]
    strength_min: Option<i16>,
    #[serde(default)]
    strength_max: Option<i16>,
}

impl ListQuery {
    fn into_filter(self) -> Result<EntryFilter, ApiError> {
        let mut tag_ids = Vec::new();
        if let Some(raw) = &self.tag_ids {
            for piece in raw.split(',').filter(|p| !p.trim().is_empty()) {
                let id = piece.trim().parse::<Uuid>().map_err(|_| {
                    ApiError::BadRequest(vec![FieldError::new("tagIds", "must be UUIDs")])
                })?;
                tag_ids.push(id);
            }
        }
        Ok(EntryFilter {
            query: self.query,
            collection_id: self.collection_id,
            tag_ids,
            is_favourite: self.is_favorite,
            is_pinned: self.is_pinned,
            strength_min: self.strength_min,
            strength_max: self.strength_max,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateEntryBody {
    title: String,
    #[serde(default)]
    username: Option<String>,
    password: String,
    #[serde(default)]
    site: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    collection_id: Option<Uuid>,
    #[serde(default)]
    is_favorite: bool,
    #[serde(default)]
    is_pinned: bool,
}

impl From<CreateEntryBody> for CreateEntryInput {
    fn from(body: CreateEntryBody) -> Self {
        Self {
            title: body.title,
            username: body.username,
            password: body.password,
            site: body.site,
            notes: body.notes,
            tags: body.tags,
            collection_id: body.collection_id,
            is_favourite: body.is_favorite,
            is_pinned: body.is_pinned,
        }
    }
}

/// `None` = field absent = unchanged; `Some(None)` = explicit null.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateEntryBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    site: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    notes: Option<Option<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    collection_id: Option<Option<Uuid>>,
    #[serde(default)]
    is_favorite: Option<bool>,
    #[serde(default)]
    is_pinned: Option<bool>,
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filter = query.into_filter()?;
    let entries = state.vault.list(claims.account_id, &filter).await?;
    Ok(Json(json!({ "entries": entries })).into_response())
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    AppJson(body): AppJson<CreateEntryBody>,
) -> Result<Response, ApiError> {
    let entry = state
        .vault
        .create(claims.account_id, body.into(), &client)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "entry": entry, "message": "Password saved" })),
    )
        .into_response())
}

/// Same semantics as `create`; kept as a separate route for clients of
/// the quick-save flow, which expect its distinct confirmation message.
async fn direct_save(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    AppJson(body): AppJson<CreateEntryBody>,
) -> Result<Response, ApiError> {
    let entry = state
        .vault
        .create(claims.account_id, body.into(), &client)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "entry": entry, "message": "Password saved directly" })),
    )
        .into_response())
}

async fn get_one(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let entry = state.vault.get(claims.account_id, id, &client).await?;
    Ok(Json(json!({ "entry": entry })).into_response())
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<UpdateEntryBody>,
) -> Result<Response, ApiError> {
    let entry = state
        .vault
        .update(
            claims.account_id,
            id,
            UpdateEntryInput {
                title: body.title,
                username: body.username,
                password: body.password,
                site: body.site,
                notes: body.notes,
                tags: body.tags,
                collection_id: body.collection_id,
                is_favourite: body.is_favorite,
                is_pinned: body.is_pinned,
            },
            &client,
        )
        .await?;
    Ok(Json(json!({ "entry": entry, "message": "Password updated" })).into_response())
}

async fn delete_one(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.vault.delete(claims.account_id, id, &client).await?;
    Ok(Json(json!({ "message": "Password deleted" })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BulkDeleteBody {
    entry_ids: Vec<Uuid>,
}

async fn bulk_delete(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    AppJson(body): AppJson<BulkDeleteBody>,
) -> Result<Response, ApiError> {
    let count = state
        .vault
        .bulk_delete(claims.account_id, &body.entry_ids, &client)
        .await?;
    Ok(Json(json!({ "count": count })).into_response())
}

async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let is_favorite = state.vault.toggle_favourite(claims.account_id, id).await?;
    Ok(Json(json!({ "isFavorite": is_favorite })).into_response())
}

async fn toggle_pin(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let is_pinned = state.vault.toggle_pinned(claims.account_id, id).await?;
    Ok(Json(json!({ "isPinned": is_pinned })).into_response())
}

async fn health(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Response, ApiError> {
    let report = state.vault.health(claims.account_id).await?;
    Ok(Json(report).into_response())
}

async fn export(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
) -> Result<Response, ApiError> {
    let entries = state.vault.export(claims.account_id, &client).await?;
    Ok(Json(json!({ "entries": entries })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ImportBody {
    entries: Vec<ImportEntryInput>,
}

async fn import(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    AppJson(body): AppJson<ImportBody>,
) -> Result<Response, ApiError> {
    let report = state
        .vault
        .import(claims.account_id, body.entries, &client)
        .await?;
    Ok(Json(report).into_response())
}
