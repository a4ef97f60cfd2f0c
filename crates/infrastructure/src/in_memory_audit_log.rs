//! In-memory audit trail for tests and local development.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tessera_application::{AuditLogRepository, AuditQuery, NewAuditRecord};
use tessera_core::AppResult;
use tessera_domain::AuditRecord;

/// Append-only in-memory audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
    next_id: AtomicI64,
}

impl InMemoryAuditLog {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLog {
    async fn append(&self, record: NewAuditRecord) -> AppResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.records.write().await.push(AuditRecord {
            id,
            recorded_at: Utc::now(),
            user_id: record.user_id,
            action: record.action,
            resource_type: record.resource_type,
            resource_id: record.resource_id,
            decision: record.decision,
            reason: record.reason,
            client_ip: record.client_ip,
            user_agent: record.user_agent,
        });
        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.read().await;
        let mut matched: Vec<AuditRecord> = records
            .iter()
            .filter(|record| {
                query
                    .user_id
                    .as_ref()
                    .is_none_or(|user_id| record.user_id.as_ref() == Some(user_id))
                    && query.from.is_none_or(|from| record.recorded_at >= from)
                    && query.to.is_none_or(|to| record.recorded_at < to)
            })
            .cloned()
            .collect();

        matched.sort_by(|left, right| {
            right
                .recorded_at
                .cmp(&left.recorded_at)
                .then(right.id.cmp(&left.id))
        });

        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit
        };
        Ok(matched.into_iter().skip(query.offset).take(limit).collect())
    }
}
