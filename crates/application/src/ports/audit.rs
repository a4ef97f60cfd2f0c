use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_core::AppResult;
use tessera_domain::{AccessDecision, AuditRecord};

/// Payload for appending one audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditRecord {
    /// Subject user the record concerns, when one exists.
    pub user_id: Option<String>,
    /// Action tag.
    pub action: String,
    /// Optional resource type.
    pub resource_type: Option<String>,
    /// Optional resource identifier.
    pub resource_id: Option<String>,
    /// Outcome of the decision or change.
    pub decision: AccessDecision,
    /// Optional free-text or JSON detail.
    pub reason: Option<String>,
    /// Client network address, when known.
    pub client_ip: Option<String>,
    /// Client user agent, when known.
    pub user_agent: Option<String>,
}

/// Filters for querying the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Restrict to records for one user.
    pub user_id: Option<String>,
    /// Restrict to records at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Restrict to records before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Rows skipped for offset pagination.
    pub offset: usize,
}

/// Port for the append-only authorization audit trail.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Appends one record. Records are never updated or deleted.
    async fn append(&self, record: NewAuditRecord) -> AppResult<()>;

    /// Returns records matching the query, newest first.
    async fn query(&self, query: AuditQuery) -> AppResult<Vec<AuditRecord>>;
}
