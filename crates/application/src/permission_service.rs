//! Effective-permission resolution and role assignment governance.

mod assignment;
mod point_in_time;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use tessera_core::AppResult;
use tessera_domain::{Delegation, ResourcePermission, Role};

use crate::dispatcher::ChangeDispatcher;
use crate::governance::RoleGovernancePolicy;
use crate::ports::{
    DelegationRepository, PermissionCache, ResourcePermissionRepository, RolePermissionRepository,
    RoleRepository, UserRepository, UserRoleRepository,
};

/// How long flattened permission-id sets stay cached.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// A user's permissions from every source at one reference instant.
///
/// The role-based ids are flattened; resource permissions and delegations
/// are returned as full rows for callers that need resource-level or
/// delegation detail rather than the id union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    /// Permission ids granted through active role assignments.
    pub role_permissions: BTreeSet<String>,
    /// Active resource-scoped grants.
    pub resource_permissions: Vec<ResourcePermission>,
    /// Active delegations received by the user. Empty for point-in-time
    /// queries, which do not reconstruct delegations.
    pub delegations: Vec<Delegation>,
}

impl EffectivePermissions {
    /// Flattens every source into a single permission-id set.
    #[must_use]
    pub fn all_permission_ids(&self) -> BTreeSet<String> {
        let mut all = self.role_permissions.clone();
        for grant in &self.resource_permissions {
            all.insert(grant.permission.clone());
        }
        all
    }
}

/// Application service for permission queries and role assignment.
#[derive(Clone)]
pub struct PermissionService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    role_permissions: Arc<dyn RolePermissionRepository>,
    resource_permissions: Arc<dyn ResourcePermissionRepository>,
    delegations: Arc<dyn DelegationRepository>,
    cache: Arc<dyn PermissionCache>,
    dispatcher: ChangeDispatcher,
    policy: RoleGovernancePolicy,
}

impl PermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        user_roles: Arc<dyn UserRoleRepository>,
        role_permissions: Arc<dyn RolePermissionRepository>,
        resource_permissions: Arc<dyn ResourcePermissionRepository>,
        delegations: Arc<dyn DelegationRepository>,
        cache: Arc<dyn PermissionCache>,
        dispatcher: ChangeDispatcher,
        policy: RoleGovernancePolicy,
    ) -> Self {
        Self {
            users,
            roles,
            user_roles,
            role_permissions,
            resource_permissions,
            delegations,
            cache,
            dispatcher,
            policy,
        }
    }

    /// Computes the user's effective permissions as of now.
    ///
    /// An unknown user id yields empty sets rather than an error; this
    /// operation does not validate user existence.
    pub async fn effective_permissions(&self, user_id: &str) -> AppResult<EffectivePermissions> {
        let now = Utc::now();

        let role_permissions = self
            .user_roles
            .find_active_permission_ids(user_id, now)
            .await?;
        let resource_permissions = self
            .resource_permissions
            .find_active_by_user(user_id, now)
            .await?;
        let delegations = self
            .delegations
            .find_active_for_delegatee(user_id, now)
            .await?;

        Ok(EffectivePermissions {
            role_permissions,
            resource_permissions,
            delegations,
        })
    }

    /// Returns the flattened effective permission-id set, read through the
    /// cache.
    ///
    /// The cache is an optimization only: a read or write failure is logged
    /// and the set is computed from storage as if no cache existed.
    pub async fn effective_permission_ids(&self, user_id: &str) -> AppResult<BTreeSet<String>> {
        match self.cache.get(user_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(user_id, "permission cache read failed: {error}");
            }
        }

        let computed = self
            .effective_permissions(user_id)
            .await?
            .all_permission_ids();

        if let Err(error) = self.cache.put(user_id, &computed, CACHE_TTL).await {
            tracing::warn!(user_id, "permission cache write failed: {error}");
        }

        Ok(computed)
    }

    /// Returns the non-deleted roles the user actively holds.
    pub async fn user_roles(&self, user_id: &str) -> AppResult<Vec<Role>> {
        let mut roles = Vec::new();
        for assignment in self.user_roles.find_active_by_user(user_id).await? {
            if let Some(role) = self.roles.find_active(&assignment.role_id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}
