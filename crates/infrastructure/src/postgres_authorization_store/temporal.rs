//! Temporal table repositories: assignments, grants, delegations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_application::{
    DelegationRepository, NewDelegation, NewResourcePermission, NewRolePermission, NewUserRole,
    ResourcePermissionRepository, RolePermissionRepository, UserRoleRepository,
};
use tessera_core::{AppError, AppResult};
use tessera_domain::{Delegation, ResourcePermission, RolePermission, UserRole};

use super::{
    DelegationRow, PostgresAuthorizationStore, ResourcePermissionRow, RolePermissionRow,
    UserRoleRow, is_unique_violation,
};

#[async_trait]
impl UserRoleRepository for PostgresAuthorizationStore {
    async fn insert(&self, grant: NewUserRole) -> AppResult<UserRole> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO authz_user_roles
                (user_id, role_id, organization_id, granted_at, granted_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(grant.user_id.as_str())
        .bind(grant.role_id.as_str())
        .bind(grant.organization_id.as_deref())
        .bind(grant.granted_at)
        .bind(grant.granted_by.as_str())
        .bind(grant.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::DuplicateAssignment {
                    user_id: grant.user_id.clone(),
                    role_id: grant.role_id.clone(),
                };
            }
            AppError::Storage(format!("failed to insert role assignment: {error}"))
        })?;

        Ok(UserRole {
            id,
            user_id: grant.user_id,
            role_id: grant.role_id,
            organization_id: grant.organization_id,
            granted_at: grant.granted_at,
            granted_by: grant.granted_by,
            expires_at: grant.expires_at,
            revoked_at: None,
            revoked_by: None,
        })
    }

    async fn update(&self, assignment: &UserRole) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE authz_user_roles
            SET revoked_at = $2, revoked_by = $3
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.revoked_at)
        .bind(assignment.revoked_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to update role assignment: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Storage(format!(
                "user-role row {} does not exist",
                assignment.id
            )));
        }

        Ok(())
    }

    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<UserRole>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT id, user_id, role_id, organization_id, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by
            FROM authz_user_roles
            WHERE user_id = $1 AND revoked_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list role assignments: {error}")))?;

        Ok(rows.into_iter().map(UserRole::from).collect())
    }

    async fn find_active_pair(&self, user_id: &str, role_id: &str) -> AppResult<Option<UserRole>> {
        let row = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT id, user_id, role_id, organization_id, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by
            FROM authz_user_roles
            WHERE user_id = $1 AND role_id = $2 AND revoked_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role assignment: {error}")))?;

        Ok(row.map(UserRole::from))
    }

    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<UserRole>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT id, user_id, role_id, organization_id, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by
            FROM authz_user_roles
            WHERE role_id = $1 AND revoked_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list role assignments: {error}")))?;

        Ok(rows.into_iter().map(UserRole::from).collect())
    }

    async fn find_window_by_user(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<UserRole>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT id, user_id, role_id, organization_id, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by
            FROM authz_user_roles
            WHERE user_id = $1
                AND granted_at <= $2
                AND (revoked_at IS NULL OR revoked_at > $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to window role assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(UserRole::from).collect())
    }

    async fn find_active_permission_ids(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role_permissions.permission_id
            FROM authz_user_roles AS user_roles
            INNER JOIN authz_role_permissions AS role_permissions
                ON role_permissions.role_id = user_roles.role_id
            WHERE user_roles.user_id = $1
                AND user_roles.revoked_at IS NULL
                AND role_permissions.revoked_at IS NULL
                AND (user_roles.expires_at IS NULL OR user_roles.expires_at > $2)
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to resolve role permissions: {error}"))
        })?;

        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl RolePermissionRepository for PostgresAuthorizationStore {
    async fn insert(&self, grant: NewRolePermission) -> AppResult<RolePermission> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO authz_role_permissions (role_id, permission_id, granted_at, granted_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(grant.role_id.as_str())
        .bind(grant.permission_id.as_str())
        .bind(grant.granted_at)
        .bind(grant.granted_by.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "role '{}' already holds permission '{}'",
                    grant.role_id, grant.permission_id
                ));
            }
            AppError::Storage(format!("failed to insert role permission: {error}"))
        })?;

        Ok(RolePermission {
            id,
            role_id: grant.role_id,
            permission_id: grant.permission_id,
            granted_at: grant.granted_at,
            granted_by: grant.granted_by,
            revoked_at: None,
            revoked_by: None,
        })
    }

    async fn update(&self, grant: &RolePermission) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE authz_role_permissions
            SET revoked_at = $2, revoked_by = $3
            WHERE id = $1
            "#,
        )
        .bind(grant.id)
        .bind(grant.revoked_at)
        .bind(grant.revoked_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to update role permission: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Storage(format!(
                "role-permission row {} does not exist",
                grant.id
            )));
        }

        Ok(())
    }

    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<RolePermission>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT id, role_id, permission_id, granted_at, granted_by, revoked_at, revoked_by
            FROM authz_role_permissions
            WHERE role_id = $1 AND revoked_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list role permissions: {error}")))?;

        Ok(rows.into_iter().map(RolePermission::from).collect())
    }

    async fn find_active_pair(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<Option<RolePermission>> {
        let row = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT id, role_id, permission_id, granted_at, granted_by, revoked_at, revoked_by
            FROM authz_role_permissions
            WHERE role_id = $1 AND permission_id = $2 AND revoked_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role permission: {error}")))?;

        Ok(row.map(RolePermission::from))
    }

}

#[async_trait]
impl ResourcePermissionRepository for PostgresAuthorizationStore {
    async fn insert(&self, grant: NewResourcePermission) -> AppResult<ResourcePermission> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO authz_resource_permissions
                (user_id, resource_type, resource_id, permission, granted_at, granted_by,
                 expires_at, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(grant.user_id.as_str())
        .bind(grant.resource_type.as_str())
        .bind(grant.resource_id.as_str())
        .bind(grant.permission.as_str())
        .bind(grant.granted_at)
        .bind(grant.granted_by.as_str())
        .bind(grant.expires_at)
        .bind(grant.reason.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to insert resource permission: {error}"))
        })?;

        Ok(ResourcePermission {
            id,
            user_id: grant.user_id,
            resource_type: grant.resource_type,
            resource_id: grant.resource_id,
            permission: grant.permission,
            granted_at: grant.granted_at,
            granted_by: grant.granted_by,
            expires_at: grant.expires_at,
            revoked_at: None,
            revoked_by: None,
            reason: grant.reason,
        })
    }

    async fn update(&self, grant: &ResourcePermission) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE authz_resource_permissions
            SET revoked_at = $2, revoked_by = $3
            WHERE id = $1
            "#,
        )
        .bind(grant.id)
        .bind(grant.revoked_at)
        .bind(grant.revoked_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to update resource permission: {error}"))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Storage(format!(
                "resource-permission row {} does not exist",
                grant.id
            )));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ResourcePermission>> {
        let row = sqlx::query_as::<_, ResourcePermissionRow>(
            r#"
            SELECT id, user_id, resource_type, resource_id, permission, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by, reason
            FROM authz_resource_permissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to load resource permission: {error}"))
        })?;

        Ok(row.map(ResourcePermission::from))
    }

    async fn find_active_by_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>> {
        let rows = sqlx::query_as::<_, ResourcePermissionRow>(
            r#"
            SELECT id, user_id, resource_type, resource_id, permission, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by, reason
            FROM authz_resource_permissions
            WHERE user_id = $1
                AND revoked_at IS NULL
                AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to list resource permissions: {error}"))
        })?;

        Ok(rows.into_iter().map(ResourcePermission::from).collect())
    }

    async fn find_window_by_user(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>> {
        let rows = sqlx::query_as::<_, ResourcePermissionRow>(
            r#"
            SELECT id, user_id, resource_type, resource_id, permission, granted_at, granted_by,
                   expires_at, revoked_at, revoked_by, reason
            FROM authz_resource_permissions
            WHERE user_id = $1
                AND granted_at <= $2
                AND (revoked_at IS NULL OR revoked_at > $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to window resource permissions: {error}"))
        })?;

        Ok(rows.into_iter().map(ResourcePermission::from).collect())
    }
}

#[async_trait]
impl DelegationRepository for PostgresAuthorizationStore {
    async fn insert(&self, delegation: NewDelegation) -> AppResult<Delegation> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO authz_delegations
                (delegator_id, delegatee_id, scope, resource_type, resource_ids,
                 valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(delegation.delegator_id.as_str())
        .bind(delegation.delegatee_id.as_str())
        .bind(delegation.scope.as_str())
        .bind(delegation.resource_type.as_deref())
        .bind(delegation.resource_ids.as_deref())
        .bind(delegation.valid_from)
        .bind(delegation.valid_until)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to insert delegation: {error}")))?;

        Ok(Delegation {
            id,
            delegator_id: delegation.delegator_id,
            delegatee_id: delegation.delegatee_id,
            scope: delegation.scope,
            resource_type: delegation.resource_type,
            resource_ids: delegation.resource_ids,
            valid_from: delegation.valid_from,
            valid_until: delegation.valid_until,
            revoked_at: None,
            revoked_by: None,
        })
    }

    async fn update(&self, delegation: &Delegation) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE authz_delegations
            SET revoked_at = $2, revoked_by = $3
            WHERE id = $1
            "#,
        )
        .bind(delegation.id)
        .bind(delegation.revoked_at)
        .bind(delegation.revoked_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to update delegation: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::Storage(format!(
                "delegation row {} does not exist",
                delegation.id
            )));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Delegation>> {
        let row = sqlx::query_as::<_, DelegationRow>(
            r#"
            SELECT id, delegator_id, delegatee_id, scope, resource_type, resource_ids,
                   valid_from, valid_until, revoked_at, revoked_by
            FROM authz_delegations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load delegation: {error}")))?;

        row.map(Delegation::try_from).transpose()
    }

    async fn find_active_for_delegatee(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>> {
        let rows = sqlx::query_as::<_, DelegationRow>(
            r#"
            SELECT id, delegator_id, delegatee_id, scope, resource_type, resource_ids,
                   valid_from, valid_until, revoked_at, revoked_by
            FROM authz_delegations
            WHERE delegatee_id = $1
                AND revoked_at IS NULL
                AND valid_from <= $2
                AND (valid_until IS NULL OR valid_until > $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list delegations: {error}")))?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

    async fn find_active_by_delegator(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>> {
        let rows = sqlx::query_as::<_, DelegationRow>(
            r#"
            SELECT id, delegator_id, delegatee_id, scope, resource_type, resource_ids,
                   valid_from, valid_until, revoked_at, revoked_by
            FROM authz_delegations
            WHERE delegator_id = $1
                AND revoked_at IS NULL
                AND valid_from <= $2
                AND (valid_until IS NULL OR valid_until > $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list delegations: {error}")))?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

}
