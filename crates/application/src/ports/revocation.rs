use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_core::AppResult;

/// Row counts from a cascading revocation over a user's grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCascade {
    /// Role assignments revoked.
    pub role_assignments: u64,
    /// Resource permissions revoked.
    pub resource_permissions: u64,
    /// Delegations revoked (either party).
    pub delegations: u64,
}

/// Storage port for cascading revocations.
///
/// Each operation must run as a single storage transaction: either every
/// dependent active row is revoked, or none is. A failure leaves no partial
/// cascade visible to readers and must abort the caller's soft-delete.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revokes every active row referencing the user: role assignments,
    /// resource permissions, and delegations where the user is either
    /// delegator or delegatee. Does not touch the user row itself.
    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<UserCascade>;

    /// Revokes every active assignment of the role and every active
    /// role-permission grant it holds. Returns the distinct ids of users
    /// that held the role.
    async fn revoke_all_for_role(
        &self,
        role_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>>;

    /// Revokes every active role-permission grant referencing the
    /// permission. Returns the distinct ids of roles that held it.
    async fn revoke_all_for_permission(
        &self,
        permission_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>>;
}
