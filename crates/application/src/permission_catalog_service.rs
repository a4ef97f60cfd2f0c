//! Permission catalog lifecycle.

use std::sync::Arc;

use chrono::Utc;

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::PermissionDefinition;

use crate::ports::PermissionRepository;
use crate::revocation_service::{CascadingRevocationService, PermissionCascade};

/// Application service for permission definitions with soft deletion.
#[derive(Clone)]
pub struct PermissionCatalogService {
    permissions: Arc<dyn PermissionRepository>,
    revocation: CascadingRevocationService,
}

impl PermissionCatalogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        revocation: CascadingRevocationService,
    ) -> Self {
        Self {
            permissions,
            revocation,
        }
    }

    /// Returns a non-deleted permission by id.
    pub async fn get_permission(&self, permission_id: &str) -> AppResult<PermissionDefinition> {
        self.permissions
            .find_active(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Permission, permission_id))
    }

    /// Lists all non-deleted permissions.
    pub async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        self.permissions.list_active().await
    }

    /// Creates a permission whose id follows the `resource:action`
    /// convention.
    pub async fn create_permission(
        &self,
        resource_type: &str,
        action: &str,
        name: &str,
    ) -> AppResult<PermissionDefinition> {
        if resource_type.trim().is_empty() || action.trim().is_empty() {
            return Err(AppError::Validation(
                "permission resource type and action must not be empty".to_owned(),
            ));
        }

        self.permissions
            .save(PermissionDefinition::new(resource_type, action, name))
            .await
    }

    /// Soft-deletes a permission, revoking every role's active grant of it
    /// first. Returns the roles and users the cascade reached.
    pub async fn delete_permission(
        &self,
        permission_id: &str,
        deleted_by: &str,
    ) -> AppResult<PermissionCascade> {
        let mut permission = self.get_permission(permission_id).await?;

        let cascade = self
            .revocation
            .revoke_all_for_permission(permission_id, deleted_by)
            .await?;

        permission.mark_deleted(deleted_by, Utc::now());
        self.permissions.save(permission).await?;

        Ok(cascade)
    }

    /// Restores a soft-deleted permission. Previously revoked grants stay
    /// revoked.
    pub async fn restore_permission(&self, permission_id: &str) -> AppResult<PermissionDefinition> {
        let mut permission = self
            .permissions
            .find_any(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Permission, permission_id))?;

        if !permission.is_deleted() {
            return Err(AppError::Conflict(format!(
                "permission '{permission_id}' is not deleted"
            )));
        }

        permission.restore();
        self.permissions.save(permission).await
    }
}
