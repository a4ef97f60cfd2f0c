//! Transactional cascading revocations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_application::{RevocationStore, UserCascade};
use tessera_core::{AppError, AppResult};

use super::PostgresAuthorizationStore;

#[async_trait]
impl RevocationStore for PostgresAuthorizationStore {
    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<UserCascade> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Storage(format!("failed to begin cascade transaction: {error}"))
        })?;

        let role_assignments = sqlx::query(
            r#"
            UPDATE authz_user_roles
            SET revoked_at = $2, revoked_by = $3
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(at)
        .bind(revoked_by)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to revoke role assignments: {error}")))?
        .rows_affected();

        let resource_permissions = sqlx::query(
            r#"
            UPDATE authz_resource_permissions
            SET revoked_at = $2, revoked_by = $3
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(at)
        .bind(revoked_by)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to revoke resource permissions: {error}"))
        })?
        .rows_affected();

        let delegations = sqlx::query(
            r#"
            UPDATE authz_delegations
            SET revoked_at = $2, revoked_by = $3
            WHERE (delegator_id = $1 OR delegatee_id = $1)
                AND revoked_at IS NULL
                AND valid_from <= $2
                AND (valid_until IS NULL OR valid_until > $2)
            "#,
        )
        .bind(user_id)
        .bind(at)
        .bind(revoked_by)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to revoke delegations: {error}")))?
        .rows_affected();

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit cascade transaction: {error}"))
        })?;

        Ok(UserCascade {
            role_assignments,
            resource_permissions,
            delegations,
        })
    }

    async fn revoke_all_for_role(
        &self,
        role_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Storage(format!("failed to begin cascade transaction: {error}"))
        })?;

        let affected_user_ids = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE authz_user_roles
            SET revoked_at = $2, revoked_by = $3
            WHERE role_id = $1 AND revoked_at IS NULL
            RETURNING user_id
            "#,
        )
        .bind(role_id)
        .bind(at)
        .bind(revoked_by)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to revoke role assignments: {error}"))
        })?;

        sqlx::query(
            r#"
            UPDATE authz_role_permissions
            SET revoked_at = $2, revoked_by = $3
            WHERE role_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(role_id)
        .bind(at)
        .bind(revoked_by)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to revoke role permissions: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit cascade transaction: {error}"))
        })?;

        Ok(affected_user_ids.into_iter().collect())
    }

    async fn revoke_all_for_permission(
        &self,
        permission_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let affected_role_ids = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE authz_role_permissions
            SET revoked_at = $2, revoked_by = $3
            WHERE permission_id = $1 AND revoked_at IS NULL
            RETURNING role_id
            "#,
        )
        .bind(permission_id)
        .bind(at)
        .bind(revoked_by)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to revoke role permissions: {error}"))
        })?;

        Ok(affected_role_ids.into_iter().collect())
    }
}
