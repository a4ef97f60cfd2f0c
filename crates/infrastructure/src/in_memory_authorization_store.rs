//! In-memory authorization store for tests and local development.


use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tessera_application::{
    DelegationRepository, NewDelegation, NewResourcePermission, NewRolePermission, NewUserRole,
    PermissionRepository, ResourcePermissionRepository, RevocationStore, RolePermissionRepository,
    RoleRepository, UserCascade, UserRepository, UserRoleRepository,
};
use tessera_core::{AppError, AppResult};
use tessera_domain::{
    Delegation, PermissionDefinition, ResourcePermission, Role, RolePermission, User, UserRole,
};

/// In-memory implementation of every storage port.
///
/// Compound operations take a single write lock per table in a fixed
/// order, which gives the same observable atomicity the Postgres adapter
/// gets from transactions: no reader sees a partial cascade and duplicate
/// active inserts cannot race past the uniqueness check.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    users: RwLock<HashMap<String, User>>,
    roles: RwLock<HashMap<String, Role>>,
    permissions: RwLock<HashMap<String, PermissionDefinition>>,
    user_roles: RwLock<Vec<UserRole>>,
    role_permissions: RwLock<Vec<RolePermission>>,
    resource_permissions: RwLock<Vec<ResourcePermission>>,
    delegations: RwLock<Vec<Delegation>>,
    next_id: AtomicI64,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthorizationStore {
    async fn find_active(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .filter(|user| !user.is_deleted())
            .cloned())
    }

    async fn find_any(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        let mut listed: Vec<User> = users
            .values()
            .filter(|user| !user.is_deleted())
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(listed)
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;

        if !user.is_deleted() {
            let conflicting = users.values().any(|existing| {
                existing.id != user.id
                    && !existing.is_deleted()
                    && (existing.subject == user.subject || existing.email == user.email)
            });
            if conflicting {
                return Err(AppError::Conflict(format!(
                    "user subject '{}' or email '{}' is already in use",
                    user.subject, user.email
                )));
            }
        }

        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RoleRepository for InMemoryAuthorizationStore {
    async fn find_active(&self, role_id: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .get(role_id)
            .filter(|role| !role.is_deleted())
            .cloned())
    }

    async fn find_any(&self, role_id: &str) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(role_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;
        let mut listed: Vec<Role> = roles
            .values()
            .filter(|role| !role.is_deleted())
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(listed)
    }

    async fn save(&self, role: Role) -> AppResult<Role> {
        let mut roles = self.roles.write().await;

        if !role.is_deleted() {
            let conflicting = roles.values().any(|existing| {
                existing.id != role.id && !existing.is_deleted() && existing.name == role.name
            });
            if conflicting {
                return Err(AppError::Conflict(format!(
                    "role name '{}' is already in use",
                    role.name
                )));
            }
        }

        roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAuthorizationStore {
    async fn find_active(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .permissions
            .read()
            .await
            .get(permission_id)
            .filter(|permission| !permission.is_deleted())
            .cloned())
    }

    async fn find_any(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.permissions.read().await.get(permission_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<PermissionDefinition>> {
        let permissions = self.permissions.read().await;
        let mut listed: Vec<PermissionDefinition> = permissions
            .values()
            .filter(|permission| !permission.is_deleted())
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(listed)
    }

    async fn save(&self, permission: PermissionDefinition) -> AppResult<PermissionDefinition> {
        self.permissions
            .write()
            .await
            .insert(permission.id.clone(), permission.clone());
        Ok(permission)
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryAuthorizationStore {
    async fn insert(&self, grant: NewUserRole) -> AppResult<UserRole> {
        let mut rows = self.user_roles.write().await;

        let duplicate = rows.iter().any(|row| {
            row.user_id == grant.user_id
                && row.role_id == grant.role_id
                && row.organization_id == grant.organization_id
                && row.revoked_at.is_none()
        });
        if duplicate {
            return Err(AppError::DuplicateAssignment {
                user_id: grant.user_id,
                role_id: grant.role_id,
            });
        }

        let row = UserRole {
            id: self.next_id(),
            user_id: grant.user_id,
            role_id: grant.role_id,
            organization_id: grant.organization_id,
            granted_at: grant.granted_at,
            granted_by: grant.granted_by,
            expires_at: grant.expires_at,
            revoked_at: None,
            revoked_by: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, assignment: &UserRole) -> AppResult<()> {
        let mut rows = self.user_roles.write().await;
        match rows.iter_mut().find(|row| row.id == assignment.id) {
            Some(stored) => {
                *stored = assignment.clone();
                Ok(())
            }
            None => Err(AppError::Storage(format!(
                "user-role row {} does not exist",
                assignment.id
            ))),
        }
    }

    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_active_pair(&self, user_id: &str, role_id: &str) -> AppResult<Option<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .find(|row| {
                row.user_id == user_id && row.role_id == role_id && row.revoked_at.is_none()
            })
            .cloned())
    }

    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .filter(|row| row.role_id == role_id && row.revoked_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_window_by_user(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.was_active_at(at))
            .cloned()
            .collect())
    }

    async fn find_active_permission_ids(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let user_roles = self.user_roles.read().await;
        let role_permissions = self.role_permissions.read().await;

        let mut ids = BTreeSet::new();
        for assignment in user_roles
            .iter()
            .filter(|row| row.user_id == user_id && row.is_active(now))
        {
            for grant in role_permissions
                .iter()
                .filter(|row| row.role_id == assignment.role_id && row.is_active())
            {
                ids.insert(grant.permission_id.clone());
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl RolePermissionRepository for InMemoryAuthorizationStore {
    async fn insert(&self, grant: NewRolePermission) -> AppResult<RolePermission> {
        let mut rows = self.role_permissions.write().await;

        let duplicate = rows.iter().any(|row| {
            row.role_id == grant.role_id
                && row.permission_id == grant.permission_id
                && row.revoked_at.is_none()
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "role '{}' already holds permission '{}'",
                grant.role_id, grant.permission_id
            )));
        }

        let row = RolePermission {
            id: self.next_id(),
            role_id: grant.role_id,
            permission_id: grant.permission_id,
            granted_at: grant.granted_at,
            granted_by: grant.granted_by,
            revoked_at: None,
            revoked_by: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, grant: &RolePermission) -> AppResult<()> {
        let mut rows = self.role_permissions.write().await;
        match rows.iter_mut().find(|row| row.id == grant.id) {
            Some(stored) => {
                *stored = grant.clone();
                Ok(())
            }
            None => Err(AppError::Storage(format!(
                "role-permission row {} does not exist",
                grant.id
            ))),
        }
    }

    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<RolePermission>> {
        Ok(self
            .role_permissions
            .read()
            .await
            .iter()
            .filter(|row| row.role_id == role_id && row.revoked_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_active_pair(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<Option<RolePermission>> {
        Ok(self
            .role_permissions
            .read()
            .await
            .iter()
            .find(|row| {
                row.role_id == role_id
                    && row.permission_id == permission_id
                    && row.revoked_at.is_none()
            })
            .cloned())
    }

}

#[async_trait]
impl ResourcePermissionRepository for InMemoryAuthorizationStore {
    async fn insert(&self, grant: NewResourcePermission) -> AppResult<ResourcePermission> {
        let row = ResourcePermission {
            id: self.next_id(),
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
        };
        self.resource_permissions.write().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, grant: &ResourcePermission) -> AppResult<()> {
        let mut rows = self.resource_permissions.write().await;
        match rows.iter_mut().find(|row| row.id == grant.id) {
            Some(stored) => {
                *stored = grant.clone();
                Ok(())
            }
            None => Err(AppError::Storage(format!(
                "resource-permission row {} does not exist",
                grant.id
            ))),
        }
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ResourcePermission>> {
        Ok(self
            .resource_permissions
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn find_active_by_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>> {
        Ok(self
            .resource_permissions
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.is_active(now))
            .cloned()
            .collect())
    }

    async fn find_window_by_user(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>> {
        Ok(self
            .resource_permissions
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.was_active_at(at))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DelegationRepository for InMemoryAuthorizationStore {
    async fn insert(&self, delegation: NewDelegation) -> AppResult<Delegation> {
        let row = Delegation {
            id: self.next_id(),
            delegator_id: delegation.delegator_id,
            delegatee_id: delegation.delegatee_id,
            scope: delegation.scope,
            resource_type: delegation.resource_type,
            resource_ids: delegation.resource_ids,
            valid_from: delegation.valid_from,
            valid_until: delegation.valid_until,
            revoked_at: None,
            revoked_by: None,
        };
        self.delegations.write().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, delegation: &Delegation) -> AppResult<()> {
        let mut rows = self.delegations.write().await;
        match rows.iter_mut().find(|row| row.id == delegation.id) {
            Some(stored) => {
                *stored = delegation.clone();
                Ok(())
            }
            None => Err(AppError::Storage(format!(
                "delegation row {} does not exist",
                delegation.id
            ))),
        }
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Delegation>> {
        Ok(self
            .delegations
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn find_active_for_delegatee(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>> {
        Ok(self
            .delegations
            .read()
            .await
            .iter()
            .filter(|row| row.delegatee_id == user_id && row.is_active(now))
            .cloned()
            .collect())
    }

    async fn find_active_by_delegator(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>> {
        Ok(self
            .delegations
            .read()
            .await
            .iter()
            .filter(|row| row.delegator_id == user_id && row.is_active(now))
            .cloned()
            .collect())
    }

}

#[async_trait]
impl RevocationStore for InMemoryAuthorizationStore {
    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<UserCascade> {
        // Hold all three write locks for the duration of the cascade.
        let mut user_roles = self.user_roles.write().await;
        let mut resource_permissions = self.resource_permissions.write().await;
        let mut delegations = self.delegations.write().await;

        let mut outcome = UserCascade::default();

        for row in user_roles
            .iter_mut()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            outcome.role_assignments += 1;
        }

        for row in resource_permissions
            .iter_mut()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            outcome.resource_permissions += 1;
        }

        for row in delegations.iter_mut().filter(|row| {
            (row.delegator_id == user_id || row.delegatee_id == user_id) && row.is_active(at)
        }) {
            row.revoke(revoked_by, at);
            outcome.delegations += 1;
        }

        Ok(outcome)
    }

    async fn revoke_all_for_role(
        &self,
        role_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let mut user_roles = self.user_roles.write().await;
        let mut role_permissions = self.role_permissions.write().await;

        let mut affected = BTreeSet::new();

        for row in user_roles
            .iter_mut()
            .filter(|row| row.role_id == role_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            affected.insert(row.user_id.clone());
        }

        for row in role_permissions
            .iter_mut()
            .filter(|row| row.role_id == role_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
        }

        Ok(affected)
    }

    async fn revoke_all_for_permission(
        &self,
        permission_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let mut role_permissions = self.role_permissions.write().await;

        let mut affected = BTreeSet::new();

        for row in role_permissions
            .iter_mut()
            .filter(|row| row.permission_id == permission_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            affected.insert(row.role_id.clone());
        }

        Ok(affected)
    }
}
