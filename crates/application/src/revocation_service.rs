//! Cascading revocation for soft-deleted entities.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use tessera_core::{AppResult, EntityKind};

use crate::dispatcher::ChangeDispatcher;
use crate::events::PermissionChangeEvent;
use crate::ports::{RevocationStore, UserCascade, UserRoleRepository};

/// Affected entities from a permission cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCascade {
    /// Roles whose grant of the permission was revoked.
    pub affected_role_ids: BTreeSet<String>,
    /// Users reached through those roles' active assignments.
    pub affected_user_ids: BTreeSet<String>,
}

/// Application service revoking every dependent row of a soft-deleted
/// user, role, or permission.
///
/// Each cascade runs as one storage transaction behind the
/// [`RevocationStore`] port; a storage failure aborts the whole cascade
/// and no notification is emitted, so the caller's soft-delete must not
/// proceed either.
#[derive(Clone)]
pub struct CascadingRevocationService {
    store: Arc<dyn RevocationStore>,
    user_roles: Arc<dyn UserRoleRepository>,
    dispatcher: ChangeDispatcher,
}

impl CascadingRevocationService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn RevocationStore>,
        user_roles: Arc<dyn UserRoleRepository>,
        dispatcher: ChangeDispatcher,
    ) -> Self {
        Self {
            store,
            user_roles,
            dispatcher,
        }
    }

    /// Revokes every active grant referencing a user being soft-deleted:
    /// role assignments, resource permissions, and delegations on either
    /// side. The user row itself is the caller's responsibility, after this
    /// call succeeds.
    pub async fn revoke_all_for_user(
        &self,
        user_id: &str,
        revoked_by: &str,
    ) -> AppResult<UserCascade> {
        let outcome = self
            .store
            .revoke_all_for_user(user_id, revoked_by, Utc::now())
            .await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::cascading_revocation(
                EntityKind::User,
                user_id,
                revoked_by,
                BTreeSet::from([user_id.to_owned()]),
            ));

        Ok(outcome)
    }

    /// Revokes every active assignment and permission grant of a role being
    /// soft-deleted. Returns the users that held the role so callers can
    /// invalidate per-user state.
    pub async fn revoke_all_for_role(
        &self,
        role_id: &str,
        revoked_by: &str,
    ) -> AppResult<BTreeSet<String>> {
        let affected_user_ids = self
            .store
            .revoke_all_for_role(role_id, revoked_by, Utc::now())
            .await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::cascading_revocation(
                EntityKind::Role,
                role_id,
                revoked_by,
                affected_user_ids.clone(),
            ));

        Ok(affected_user_ids)
    }

    /// Revokes every active role-permission grant of a permission being
    /// soft-deleted, then walks role assignments to find every user the
    /// change reaches (permission, to roles, to users).
    pub async fn revoke_all_for_permission(
        &self,
        permission_id: &str,
        revoked_by: &str,
    ) -> AppResult<PermissionCascade> {
        let affected_role_ids = self
            .store
            .revoke_all_for_permission(permission_id, revoked_by, Utc::now())
            .await?;

        let mut affected_user_ids = BTreeSet::new();
        for role_id in &affected_role_ids {
            for assignment in self.user_roles.find_active_by_role(role_id).await? {
                affected_user_ids.insert(assignment.user_id);
            }
        }

        self.dispatcher
            .dispatch(PermissionChangeEvent::cascading_revocation(
                EntityKind::Permission,
                permission_id,
                revoked_by,
                affected_user_ids.clone(),
            ));

        Ok(PermissionCascade {
            affected_role_ids,
            affected_user_ids,
        })
    }
}
