//! Catalog entity repositories: users, roles, permissions.

use async_trait::async_trait;

use tessera_application::{PermissionRepository, RoleRepository, UserRepository};
use tessera_core::{AppError, AppResult};
use tessera_domain::{PermissionDefinition, Role, User};

use super::{PermissionRow, PostgresAuthorizationStore, RoleRow, UserRow, is_unique_violation};

#[async_trait]
impl UserRepository for PostgresAuthorizationStore {
    async fn find_active(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, subject, email, display_name, deleted, deleted_at, deleted_by
            FROM authz_users
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load user: {error}")))?;

        Ok(row.map(User::from))
    }

    async fn find_any(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, subject, email, display_name, deleted, deleted_at, deleted_by
            FROM authz_users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load user: {error}")))?;

        Ok(row.map(User::from))
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, subject, email, display_name, deleted, deleted_at, deleted_by
            FROM authz_users
            WHERE NOT deleted
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list users: {error}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn save(&self, user: User) -> AppResult<User> {
        sqlx::query(
            r#"
            INSERT INTO authz_users (id, subject, email, display_name, deleted, deleted_at, deleted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                subject = EXCLUDED.subject,
                email = EXCLUDED.email,
                display_name = EXCLUDED.display_name,
                deleted = EXCLUDED.deleted,
                deleted_at = EXCLUDED.deleted_at,
                deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(user.id.as_str())
        .bind(user.subject.as_str())
        .bind(user.email.as_str())
        .bind(user.display_name.as_deref())
        .bind(user.deletion.deleted)
        .bind(user.deletion.deleted_at)
        .bind(user.deletion.deleted_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "user subject '{}' or email '{}' is already in use",
                    user.subject, user.email
                ));
            }
            AppError::Storage(format!("failed to save user: {error}"))
        })?;

        Ok(user)
    }
}

#[async_trait]
impl RoleRepository for PostgresAuthorizationStore {
    async fn find_active(&self, role_id: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, parent_role_id, deleted, deleted_at, deleted_by
            FROM authz_roles
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn find_any(&self, role_id: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, parent_role_id, deleted, deleted_at, deleted_by
            FROM authz_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn list_active(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, parent_role_id, deleted, deleted_at, deleted_by
            FROM authz_roles
            WHERE NOT deleted
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn save(&self, role: Role) -> AppResult<Role> {
        sqlx::query(
            r#"
            INSERT INTO authz_roles (id, name, description, parent_role_id, deleted, deleted_at, deleted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                parent_role_id = EXCLUDED.parent_role_id,
                deleted = EXCLUDED.deleted,
                deleted_at = EXCLUDED.deleted_at,
                deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(role.id.as_str())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.parent_role_id.as_deref())
        .bind(role.deletion.deleted)
        .bind(role.deletion.deleted_at)
        .bind(role.deletion.deleted_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "role name '{}' is already in use",
                    role.name
                ));
            }
            AppError::Storage(format!("failed to save role: {error}"))
        })?;

        Ok(role)
    }
}

#[async_trait]
impl PermissionRepository for PostgresAuthorizationStore {
    async fn find_active(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, resource_type, action, deleted, deleted_at, deleted_by
            FROM authz_permissions
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load permission: {error}")))?;

        Ok(row.map(PermissionDefinition::from))
    }

    async fn find_any(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, resource_type, action, deleted, deleted_at, deleted_by
            FROM authz_permissions
            WHERE id = $1
            "#,
        )
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load permission: {error}")))?;

        Ok(row.map(PermissionDefinition::from))
    }

    async fn list_active(&self) -> AppResult<Vec<PermissionDefinition>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, resource_type, action, deleted, deleted_at, deleted_by
            FROM authz_permissions
            WHERE NOT deleted
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list permissions: {error}")))?;

        Ok(rows.into_iter().map(PermissionDefinition::from).collect())
    }

    async fn save(&self, permission: PermissionDefinition) -> AppResult<PermissionDefinition> {
        sqlx::query(
            r#"
            INSERT INTO authz_permissions (id, name, resource_type, action, deleted, deleted_at, deleted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                resource_type = EXCLUDED.resource_type,
                action = EXCLUDED.action,
                deleted = EXCLUDED.deleted,
                deleted_at = EXCLUDED.deleted_at,
                deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(permission.id.as_str())
        .bind(permission.name.as_str())
        .bind(permission.resource_type.as_str())
        .bind(permission.action.as_str())
        .bind(permission.deletion.deleted)
        .bind(permission.deletion.deleted_at)
        .bind(permission.deletion.deleted_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to save permission: {error}")))?;

        Ok(permission)
    }
}
