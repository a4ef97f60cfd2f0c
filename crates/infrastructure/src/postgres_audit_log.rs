//! PostgreSQL-backed audit trail.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tessera_application::{AuditLogRepository, AuditQuery, NewAuditRecord};
use tessera_core::{AppError, AppResult};
use tessera_domain::{AccessDecision, AuditRecord};

/// Append-only audit log over `authz_audit_log`.
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: i64,
    recorded_at: DateTime<Utc>,
    user_id: Option<String>,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    decision: String,
    reason: Option<String>,
    client_ip: Option<String>,
    user_agent: Option<String>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = AppError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let decision = AccessDecision::from_str(row.decision.as_str())?;
        Ok(Self {
            id: row.id,
            recorded_at: row.recorded_at,
            user_id: row.user_id,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            decision,
            reason: row.reason,
            client_ip: row.client_ip,
            user_agent: row.user_agent,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLog {
    async fn append(&self, record: NewAuditRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_audit_log
                (user_id, action, resource_type, resource_id, decision, reason,
                 client_ip, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.user_id.as_deref())
        .bind(record.action.as_str())
        .bind(record.resource_type.as_deref())
        .bind(record.resource_id.as_deref())
        .bind(record.decision.as_str())
        .bind(record.reason.as_deref())
        .bind(record.client_ip.as_deref())
        .bind(record.user_agent.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to append audit record: {error}")))?;

        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> AppResult<Vec<AuditRecord>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, recorded_at, user_id, action, resource_type, resource_id,
                   decision, reason, client_ip, user_agent
            FROM authz_audit_log
            WHERE ($1::TEXT IS NULL OR user_id = $1)
                AND ($2::TIMESTAMPTZ IS NULL OR recorded_at >= $2)
                AND ($3::TIMESTAMPTZ IS NULL OR recorded_at < $3)
            ORDER BY recorded_at DESC, id DESC
            LIMIT NULLIF($4, 0) OFFSET $5
            "#,
        )
        .bind(query.user_id.as_deref())
        .bind(query.from)
        .bind(query.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to query audit records: {error}")))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}
