//! Append-only audit log
//!
//! No UPDATE or DELETE statement exists in this module; the append-only
//! invariant holds because nothing else touches the table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{AuditAction, AuditFilter, AuditRecord, AuditSummaryRow, NewAuditRecord};
use crate::traits::AuditStore;

use super::PostgresStore;

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append(
        &self,
        account_id: Uuid,
        action: AuditAction,
        record: NewAuditRecord,
    ) -> Result<AuditRecord> {
        let row = sqlx::query(
            "INSERT INTO audit_records \
             (id, account_id, action, entry_id, entry_title, network_address, user_agent, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(action.as_str())
        .bind(record.entry_id)
        .bind(&record.entry_title)
        .bind(&record.network_address)
        .bind(&record.user_agent)
        .bind(&record.details)
        .fetch_one(&self.pool)
        .await?;
        record_from_row(&row)
    }

    async fn query(&self, account_id: Uuid, filter: &AuditFilter) -> Result<Vec<AuditRecord>> {
        let mut qb = QueryBuilder::new("SELECT * FROM audit_records WHERE account_id = ");
        qb.push_bind(account_id);

        if let Some(action) = filter.action {
            qb.push(" AND action = ");
            qb.push_bind(action.as_str());
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ");
            qb.push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn summary(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditSummaryRow>> {
        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM audit_records \
             WHERE account_id = $1 AND created_at >= $2 \
             GROUP BY action ORDER BY action ASC",
        )
        .bind(account_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let action: String = row.try_get("action").map_err(StoreError::from)?;
                let count: i64 = row.try_get("count").map_err(StoreError::from)?;
                Ok(AuditSummaryRow {
                    action: action.parse().map_err(StoreError::Database)?,
                    count,
                })
            })
            .collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<AuditRecord> {
    let action: String = row.try_get("action")?;
    Ok(AuditRecord {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        action: action.parse().map_err(StoreError::Database)?,
        entry_id: row.try_get("entry_id")?,
        entry_title: row.try_get("entry_title")?,
        network_address: row.try_get("network_address")?,
        user_agent: row.try_get("user_agent")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}
