//! Audit log service
//!
//! Appenders are fire-and-forget: a failed write is reported on the log
//! and never fails the principal operation. The query side is ordinary.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use strongbox_store::{
    AuditAction, AuditFilter, AuditRecord, AuditStore, AuditSummaryRow, NewAuditRecord,
};

use crate::error::Result;

/// Request-scoped client metadata carried into audit records.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub address: Option<String>,
    pub user_agent: Option<String>,
}

/// Query parameters for the audit log, clamped to sane windows.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;
const DEFAULT_SUMMARY_DAYS: i64 = 30;
const MAX_SUMMARY_DAYS: i64 = 365;

/// Append-only audit log over an [`AuditStore`].
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Fire-and-forget append. Errors are logged, never propagated.
    pub async fn record(
        &self,
        account_id: Uuid,
        action: AuditAction,
        client: &ClientInfo,
        entry: Option<(Uuid, &str)>,
        details: Option<serde_json::Value>,
    ) {
        let record = NewAuditRecord {
            entry_id: entry.map(|(id, _)| id),
            entry_title: entry.map(|(_, title)| title.to_string()),
            network_address: client.address.clone(),
            user_agent: client.user_agent.clone(),
            details,
        };
        if let Err(error) = self.store.append(account_id, action, record).await {
            warn!(%account_id, %action, %error, "audit write failed");
        }
    }

    /// Filtered, paginated history for the account.
    pub async fn query(&self, account_id: Uuid, query: AuditQuery) -> Result<Vec<AuditRecord>> {
        let filter = AuditFilter {
            action: query.action,
            from: query.from,
            to: query.to,
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: query.offset.unwrap_or(0).max(0),
        };
        Ok(self.store.query(account_id, &filter).await?)
    }

    /// Per-action counts over the last `days` days.
    pub async fn summary(
        &self,
        account_id: Uuid,
        days: Option<i64>,
    ) -> Result<Vec<AuditSummaryRow>> {
        let days = days.unwrap_or(DEFAULT_SUMMARY_DAYS).clamp(1, MAX_SUMMARY_DAYS);
        let since = Utc::now() - Duration::days(days);
        Ok(self.store.summary(account_id, since).await?)
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strongbox_store::memory::MemoryStore;

    #[tokio::test]
    async fn query_clamps_limit_and_offset() {
        let store = MemoryStore::new();
        let service = AuditService::new(Arc::new(store));
        let account = Uuid::new_v4();

        for _ in 0..3 {
            service
                .record(account, AuditAction::Login, &ClientInfo::default(), None, None)
                .await;
        }

        let records = service
            .query(
                account,
                AuditQuery {
                    limit: Some(100_000),
                    offset: Some(-5),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn summary_groups_by_action() {
        let store = MemoryStore::new();
        let service = AuditService::new(Arc::new(store));
        let account = Uuid::new_v4();
        let client = ClientInfo::default();

        service.record(account, AuditAction::Login, &client, None, None).await;
        service.record(account, AuditAction::Login, &client, None, None).await;
        service.record(account, AuditAction::Export, &client, None, None).await;

        let summary = service.summary(account, None).await.unwrap();
        assert_eq!(
            summary,
            vec![
                AuditSummaryRow {
                    action: AuditAction::Export,
                    count: 1
                },
                AuditSummaryRow {
                    action: AuditAction::Login,
                    count: 2
                },
            ]
        );
    }
}
