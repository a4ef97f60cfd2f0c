//! Access-decision recording and audit queries.

use std::sync::Arc;

use tessera_core::AppResult;
use tessera_domain::AuditRecord;

use crate::ports::{AuditLogRepository, AuditQuery, NewAuditRecord};

/// Application service over the append-only audit trail.
#[derive(Clone)]
pub struct AuditService {
    audit_log: Arc<dyn AuditLogRepository>,
}

impl AuditService {
    /// Creates a new service over the given repository.
    #[must_use]
    pub fn new(audit_log: Arc<dyn AuditLogRepository>) -> Self {
        Self { audit_log }
    }

    /// Records one access decision, best-effort.
    ///
    /// Audit is advisory: a failed write is logged and swallowed so it can
    /// never fail or roll back the authorization decision it describes.
    pub async fn record_decision(&self, record: NewAuditRecord) {
        if let Err(error) = self.audit_log.append(record).await {
            tracing::warn!("failed to record access decision: {error}");
        }
    }

    /// Returns audit records matching the query, newest first.
    pub async fn query(&self, query: AuditQuery) -> AppResult<Vec<AuditRecord>> {
        self.audit_log.query(query).await
    }
}
