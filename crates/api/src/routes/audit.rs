//! Audit log routes

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use strongbox_service::{AuditQuery, FieldError};
use strongbox_store::{AuditAction, AuditRecord};

use crate::error::ApiError;
use crate::extract::{AppJson, ClientMeta, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audit", get(query))
        .route("/audit/summary", get(summary))
        .route("/audit/copy", post(record_copy))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AuditQueryParams {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    to: Option<DateTime<Utc>>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

/// Wire view of an audit record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditRecordView {
    id: Uuid,
    action: AuditAction,
    entry_id: Option<Uuid>,
    entry_title: Option<String>,
    network_address: Option<String>,
    user_agent: Option<String>,
    details: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordView {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id,
            action: record.action,
            entry_id: record.entry_id,
            entry_title: record.entry_title,
            network_address: record.network_address,
            user_agent: record.user_agent,
            details: record.details,
            created_at: record.created_at,
        }
    }
}

async fn query(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Query(params): Query<AuditQueryParams>,
) -> Result<Response, ApiError> {
    let action = match &params.action {
        Some(raw) => Some(raw.parse::<AuditAction>().map_err(|_| {
            ApiError::BadRequest(vec![FieldError::new("action", "unknown audit action")])
        })?),
        None => None,
    };

    let records = state
        .audit
        .query(
            claims.account_id,
            AuditQuery {
                action,
                from: params.from,
                to: params.to,
                limit: params.limit,
                offset: params.offset,
            },
        )
        .await?;
    let records: Vec<AuditRecordView> = records.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "records": records })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SummaryParams {
    #[serde(default)]
    days: Option<i64>,
}

async fn summary(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Query(params): Query<SummaryParams>,
) -> Result<Response, ApiError> {
    let rows = state.audit.summary(claims.account_id, params.days).await?;
    let summary: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|row| json!({ "action": row.action, "count": row.count }))
        .collect();
    Ok(Json(json!({ "summary": summary })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CopyBody {
    entry_id: Uuid,
}

/// Clipboard copies happen client-side; this endpoint lets clients put
/// them on the audit trail anyway.
async fn record_copy(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ClientMeta(client): ClientMeta,
    AppJson(body): AppJson<CopyBody>,
) -> Result<Response, ApiError> {
    state
        .vault
        .record_copy(claims.account_id, body.entry_id, &client)
        .await?;
    Ok(Json(json!({ "message": "Copy recorded" })).into_response())
}
