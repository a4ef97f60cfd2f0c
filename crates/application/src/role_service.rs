//! Role catalog lifecycle and role-permission maintenance.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::{Role, RolePermission};

use crate::ports::{NewRolePermission, PermissionRepository, RolePermissionRepository, RoleRepository};
use crate::revocation_service::CascadingRevocationService;

/// Input payload for creating or updating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInput {
    /// Unique name among non-deleted roles.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Optional parent role reference. Stored only; not traversed when
    /// resolving permissions.
    pub parent_role_id: Option<String>,
}

/// Application service for role lifecycle and the role-permission catalog.
#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    role_permissions: Arc<dyn RolePermissionRepository>,
    revocation: CascadingRevocationService,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        role_permissions: Arc<dyn RolePermissionRepository>,
        revocation: CascadingRevocationService,
    ) -> Self {
        Self {
            roles,
            permissions,
            role_permissions,
            revocation,
        }
    }

    /// Returns a non-deleted role by id.
    pub async fn get_role(&self, role_id: &str) -> AppResult<Role> {
        self.roles
            .find_active(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Role, role_id))
    }

    /// Lists all non-deleted roles.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.roles.list_active().await
    }

    /// Creates a role with a generated id.
    pub async fn create_role(&self, input: RoleInput) -> AppResult<Role> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        self.roles
            .save(Role::new(input.name, input.description, input.parent_role_id))
            .await
    }

    /// Updates a role's name, description, and parent reference.
    pub async fn update_role(&self, role_id: &str, input: RoleInput) -> AppResult<Role> {
        let mut role = self.get_role(role_id).await?;
        role.name = input.name;
        role.description = input.description;
        role.parent_role_id = input.parent_role_id;
        self.roles.save(role).await
    }

    /// Soft-deletes a role, revoking every active assignment and permission
    /// grant first. Returns the users that held the role.
    pub async fn delete_role(
        &self,
        role_id: &str,
        deleted_by: &str,
    ) -> AppResult<BTreeSet<String>> {
        let mut role = self.get_role(role_id).await?;

        let affected_user_ids = self
            .revocation
            .revoke_all_for_role(role_id, deleted_by)
            .await?;

        role.mark_deleted(deleted_by, Utc::now());
        self.roles.save(role).await?;

        Ok(affected_user_ids)
    }

    /// Restores a soft-deleted role. Previously revoked assignments and
    /// grants stay revoked.
    pub async fn restore_role(&self, role_id: &str) -> AppResult<Role> {
        let mut role = self
            .roles
            .find_any(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Role, role_id))?;

        if !role.is_deleted() {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is not deleted"
            )));
        }

        role.restore();
        self.roles.save(role).await
    }

    /// Grants a catalog permission to a role.
    pub async fn grant_permission(
        &self,
        role_id: &str,
        permission_id: &str,
        granted_by: &str,
    ) -> AppResult<RolePermission> {
        self.get_role(role_id).await?;
        self.permissions
            .find_active(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Permission, permission_id))?;

        if self
            .role_permissions
            .find_active_pair(role_id, permission_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' already holds permission '{permission_id}'"
            )));
        }

        self.role_permissions
            .insert(NewRolePermission {
                role_id: role_id.to_owned(),
                permission_id: permission_id.to_owned(),
                granted_at: Utc::now(),
                granted_by: granted_by.to_owned(),
            })
            .await
    }

    /// Revokes a role's active grant of a catalog permission.
    pub async fn revoke_permission(
        &self,
        role_id: &str,
        permission_id: &str,
        revoked_by: &str,
    ) -> AppResult<RolePermission> {
        let mut grant = self
            .role_permissions
            .find_active_pair(role_id, permission_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    EntityKind::RolePermission,
                    format!("{role_id}:{permission_id}"),
                )
            })?;

        grant.revoke(revoked_by, Utc::now());
        self.role_permissions.update(&grant).await?;

        Ok(grant)
    }
}
