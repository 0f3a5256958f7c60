//! Sharing routes

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use strongbox_service::CreateShareInput;

use crate::error::ApiError;
use crate::extract::{AppJson, ClientMeta, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/passwords/{id}/share", post(create))
        .route("/shares", get(list))
        .route("/shares/{id}", axum::routing::delete(revoke))
        // Public capability lookup: no bearer, same 404 for every failure.
        .route("/share/{token}", get(access))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct CreateShareBody {
    max_views: Option<i32>,
    expires_in_hours: Option<i64>,
    include_secret: Option<bool>,
    include_notes: Option<bool>,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<CreateShareBody>,
) -> Result<Response, ApiError> {
    let (share, token) = state
        .shares
        .create_share(
            claims.account_id,
            id,
            CreateShareInput {
                max_views: body.max_views,
                expires_in_hours: body.expires_in_hours,
                include_secret: body.include_secret,
                include_notes: body.include_notes,
            },
            &client,
        )
        .await?;

    // The raw token appears here and nowhere else.
    Ok((
        StatusCode::CREATED,
        Json(json!({ "share": share, "token": token.reveal() })),
    )
        .into_response())
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Response, ApiError> {
    let shares = state.shares.list_shares(claims.account_id).await?;
    Ok(Json(json!({ "shares": shares })).into_response())
}

async fn revoke(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.shares.revoke_share(claims.account_id, id).await?;
    Ok(Json(json!({ "message": "Share revoked" })).into_response())
}

async fn access(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let view = state
        .shares
        .access(&token, client.address.as_deref())
        .await?;
    Ok(Json(json!({ "entry": view })).into_response())
}
