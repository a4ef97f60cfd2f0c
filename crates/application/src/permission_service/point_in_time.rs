use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use tessera_core::AppResult;

use super::{EffectivePermissions, PermissionService};

impl PermissionService {
    /// Reconstructs the user's permissions as of a past instant, for
    /// compliance and audit queries.
    ///
    /// Role assignments and resource permissions are windowed precisely:
    /// a row counts when it was granted at or before `at` and not yet
    /// revoked at `at`. A role's permission catalog, however, is read from
    /// its currently non-revoked rows and then windowed, so a grant the
    /// role lost after `at` and still lacks today is not resurrected.
    /// Delegations are not reconstructed; the result's delegation list is
    /// always empty.
    pub async fn permissions_at(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<EffectivePermissions> {
        let assignments = self.user_roles.find_window_by_user(user_id, at).await?;
        let resource_permissions = self
            .resource_permissions
            .find_window_by_user(user_id, at)
            .await?;

        let mut role_permissions = BTreeSet::new();
        for assignment in &assignments {
            let catalog = self
                .role_permissions
                .find_active_by_role(&assignment.role_id)
                .await?;
            for grant in catalog {
                if grant.was_active_at(at) {
                    role_permissions.insert(grant.permission_id);
                }
            }
        }

        Ok(EffectivePermissions {
            role_permissions,
            resource_permissions,
            delegations: Vec::new(),
        })
    }
}
