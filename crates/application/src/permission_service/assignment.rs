use chrono::Utc;

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::UserRole;

use crate::events::PermissionChangeEvent;
use crate::ports::NewUserRole;

use super::PermissionService;

impl PermissionService {
    /// Assigns a role to a user under tiered governance.
    ///
    /// Check order: protected-role lockout, granter permission tier, target
    /// user exists, target role exists, no duplicate active assignment.
    /// Re-assignment after a revocation inserts a fresh row; the revoked
    /// row stays behind as history.
    pub async fn assign_role(
        &self,
        user_id: &str,
        role_id: &str,
        granted_by: &str,
    ) -> AppResult<UserRole> {
        if self.policy.is_protected(role_id) {
            return Err(AppError::ProtectedRole {
                role_id: role_id.to_owned(),
            });
        }

        let granter_permissions = self
            .effective_permissions(granted_by)
            .await?
            .all_permission_ids();
        let tier = self.policy.tier_of(role_id);
        if !self.policy.assignment_permitted(tier, &granter_permissions) {
            return Err(AppError::PermissionDenied {
                subject: granted_by.to_owned(),
                required: self.policy.required_assignment_permission(tier).to_owned(),
            });
        }

        self.users
            .find_active(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::User, user_id))?;

        self.roles
            .find_active(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Role, role_id))?;

        if self
            .user_roles
            .find_active_pair(user_id, role_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateAssignment {
                user_id: user_id.to_owned(),
                role_id: role_id.to_owned(),
            });
        }

        // A concurrent assign racing past the check above is caught by the
        // store's single-active-row constraint and surfaces as the same
        // duplicate-assignment error.
        let assignment = self
            .user_roles
            .insert(NewUserRole {
                user_id: user_id.to_owned(),
                role_id: role_id.to_owned(),
                organization_id: None,
                granted_at: Utc::now(),
                granted_by: granted_by.to_owned(),
                expires_at: None,
            })
            .await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::role_assigned(
                user_id, role_id, granted_by,
            ));

        Ok(assignment)
    }

    /// Revokes a user's active role assignment.
    ///
    /// The row is never deleted; revocation stamps `revoked_at` and
    /// `revoked_by` so history is preserved.
    pub async fn revoke_role(
        &self,
        user_id: &str,
        role_id: &str,
        revoked_by: &str,
    ) -> AppResult<UserRole> {
        if self.policy.is_protected(role_id) {
            return Err(AppError::ProtectedRole {
                role_id: role_id.to_owned(),
            });
        }

        let revoker_permissions = self
            .effective_permissions(revoked_by)
            .await?
            .all_permission_ids();
        if !revoker_permissions.contains(&self.policy.revoke_permission) {
            return Err(AppError::PermissionDenied {
                subject: revoked_by.to_owned(),
                required: self.policy.revoke_permission.clone(),
            });
        }

        let mut assignment = self
            .user_roles
            .find_active_pair(user_id, role_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(EntityKind::RoleAssignment, format!("{user_id}:{role_id}"))
            })?;

        assignment.revoke(revoked_by, Utc::now());
        self.user_roles.update(&assignment).await?;

        self.dispatcher.dispatch(PermissionChangeEvent::role_revoked(
            user_id, role_id, revoked_by,
        ));

        Ok(assignment)
    }
}
