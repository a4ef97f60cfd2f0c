//! Shared in-memory fakes for service tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use tessera_core::{AppError, AppResult};
use tessera_domain::{
    AuditRecord, Delegation, PermissionDefinition, ResourcePermission, Role, RolePermission,
    SoftDelete, User, UserRole,
};

use crate::dispatcher::ChangeDispatcher;
use crate::governance::RoleGovernancePolicy;
use crate::permission_service::PermissionService;
use crate::ports::{
    AuditLogRepository, AuditQuery, DelegationRepository, NewAuditRecord, NewDelegation,
    NewResourcePermission, NewRolePermission, NewUserRole, PermissionCache, PermissionRepository,
    ResourcePermissionRepository, RevocationStore, RolePermissionRepository, RoleRepository,
    UserCascade, UserRepository, UserRoleRepository,
};
use crate::revocation_service::CascadingRevocationService;

/// In-memory store implementing every repository port plus the cascade
/// store, with a switch to simulate storage failure during cascades.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub users: Mutex<HashMap<String, User>>,
    pub roles: Mutex<HashMap<String, Role>>,
    pub permissions: Mutex<HashMap<String, PermissionDefinition>>,
    pub user_roles: Mutex<Vec<UserRole>>,
    pub role_permissions: Mutex<Vec<RolePermission>>,
    pub resource_permissions: Mutex<Vec<ResourcePermission>>,
    pub delegations: Mutex<Vec<Delegation>>,
    pub fail_cascades: AtomicBool,
    next_id: AtomicI64,
}

impl FakeStore {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn seed_user(&self, user_id: &str) {
        self.users.lock().await.insert(
            user_id.to_owned(),
            User {
                id: user_id.to_owned(),
                subject: format!("idp|{user_id}"),
                email: format!("{user_id}@example.test"),
                display_name: None,
                deletion: SoftDelete::default(),
            },
        );
    }

    pub async fn seed_role(&self, role_id: &str) {
        self.roles.lock().await.insert(
            role_id.to_owned(),
            Role {
                id: role_id.to_owned(),
                name: role_id.to_owned(),
                description: None,
                parent_role_id: None,
                deletion: SoftDelete::default(),
            },
        );
    }

    pub async fn seed_permission(&self, permission_id: &str) {
        let (resource_type, action) = permission_id.split_once(':').unwrap_or((permission_id, ""));
        self.permissions.lock().await.insert(
            permission_id.to_owned(),
            PermissionDefinition {
                id: permission_id.to_owned(),
                name: permission_id.to_owned(),
                resource_type: resource_type.to_owned(),
                action: action.to_owned(),
                deletion: SoftDelete::default(),
            },
        );
    }

    pub async fn seed_user_role(&self, user_id: &str, role_id: &str) -> i64 {
        let id = self.next_id();
        self.user_roles.lock().await.push(UserRole {
            id,
            user_id: user_id.to_owned(),
            role_id: role_id.to_owned(),
            organization_id: None,
            granted_at: Utc::now() - chrono::Duration::hours(1),
            granted_by: "usr_seed".to_owned(),
            expires_at: None,
            revoked_at: None,
            revoked_by: None,
        });
        id
    }

    pub async fn seed_role_permission(&self, role_id: &str, permission_id: &str) -> i64 {
        let id = self.next_id();
        self.role_permissions.lock().await.push(RolePermission {
            id,
            role_id: role_id.to_owned(),
            permission_id: permission_id.to_owned(),
            granted_at: Utc::now() - chrono::Duration::hours(1),
            granted_by: "usr_seed".to_owned(),
            revoked_at: None,
            revoked_by: None,
        });
        id
    }

    /// Gives a user a set of effective permission ids through a synthetic
    /// dedicated role.
    pub async fn grant_permission_ids(&self, user_id: &str, permission_ids: &[&str]) {
        let role_id = format!("GRANTS_{user_id}");
        self.seed_role(&role_id).await;
        self.seed_user_role(user_id, &role_id).await;
        for permission_id in permission_ids {
            self.seed_role_permission(&role_id, permission_id).await;
        }
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find_active(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .get(user_id)
            .filter(|user| !user.is_deleted())
            .cloned())
    }

    async fn find_any(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(user_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .await
            .values()
            .filter(|user| !user.is_deleted())
            .cloned()
            .collect();
        users.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(users)
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let mut users = self.users.lock().await;
        let conflicting = users.values().any(|existing| {
            existing.id != user.id
                && !existing.is_deleted()
                && !user.is_deleted()
                && (existing.subject == user.subject || existing.email == user.email)
        });
        if conflicting {
            return Err(AppError::Conflict(format!(
                "user subject '{}' or email '{}' already in use",
                user.subject, user.email
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RoleRepository for FakeStore {
    async fn find_active(&self, role_id: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .get(role_id)
            .filter(|role| !role.is_deleted())
            .cloned())
    }

    async fn find_any(&self, role_id: &str) -> AppResult<Option<Role>> {
        Ok(self.roles.lock().await.get(role_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self
            .roles
            .lock()
            .await
            .values()
            .filter(|role| !role.is_deleted())
            .cloned()
            .collect();
        roles.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(roles)
    }

    async fn save(&self, role: Role) -> AppResult<Role> {
        self.roles.lock().await.insert(role.id.clone(), role.clone());
        Ok(role)
    }
}

#[async_trait]
impl PermissionRepository for FakeStore {
    async fn find_active(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .permissions
            .lock()
            .await
            .get(permission_id)
            .filter(|permission| !permission.is_deleted())
            .cloned())
    }

    async fn find_any(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.permissions.lock().await.get(permission_id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<PermissionDefinition>> {
        let mut permissions: Vec<PermissionDefinition> = self
            .permissions
            .lock()
            .await
            .values()
            .filter(|permission| !permission.is_deleted())
            .cloned()
            .collect();
        permissions.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(permissions)
    }

    async fn save(&self, permission: PermissionDefinition) -> AppResult<PermissionDefinition> {
        self.permissions
            .lock()
            .await
            .insert(permission.id.clone(), permission.clone());
        Ok(permission)
    }
}

#[async_trait]
impl UserRoleRepository for FakeStore {
    async fn insert(&self, grant: NewUserRole) -> AppResult<UserRole> {
        let mut rows = self.user_roles.lock().await;
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
        let mut rows = self.user_roles.lock().await;
        if let Some(stored) = rows.iter_mut().find(|row| row.id == assignment.id) {
            *stored = assignment.clone();
        }
        Ok(())
    }

    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .lock()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_active_pair(&self, user_id: &str, role_id: &str) -> AppResult<Option<UserRole>> {
        Ok(self
            .user_roles
            .lock()
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
            .lock()
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
            .lock()
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
        let user_roles = self.user_roles.lock().await;
        let role_permissions = self.role_permissions.lock().await;

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
impl RolePermissionRepository for FakeStore {
    async fn insert(&self, grant: NewRolePermission) -> AppResult<RolePermission> {
        let mut rows = self.role_permissions.lock().await;
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
        let mut rows = self.role_permissions.lock().await;
        if let Some(stored) = rows.iter_mut().find(|row| row.id == grant.id) {
            *stored = grant.clone();
        }
        Ok(())
    }

    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<RolePermission>> {
        Ok(self
            .role_permissions
            .lock()
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
            .lock()
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
impl ResourcePermissionRepository for FakeStore {
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
        self.resource_permissions.lock().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, grant: &ResourcePermission) -> AppResult<()> {
        let mut rows = self.resource_permissions.lock().await;
        if let Some(stored) = rows.iter_mut().find(|row| row.id == grant.id) {
            *stored = grant.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ResourcePermission>> {
        Ok(self
            .resource_permissions
            .lock()
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
            .lock()
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
            .lock()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.was_active_at(at))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DelegationRepository for FakeStore {
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
        self.delegations.lock().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, delegation: &Delegation) -> AppResult<()> {
        let mut rows = self.delegations.lock().await;
        if let Some(stored) = rows.iter_mut().find(|row| row.id == delegation.id) {
            *stored = delegation.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Delegation>> {
        Ok(self
            .delegations
            .lock()
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
            .lock()
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
            .lock()
            .await
            .iter()
            .filter(|row| row.delegator_id == user_id && row.is_active(now))
            .cloned()
            .collect())
    }

}

#[async_trait]
impl RevocationStore for FakeStore {
    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        revoked_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<UserCascade> {
        if self.fail_cascades.load(Ordering::Relaxed) {
            return Err(AppError::Storage("cascade store unavailable".to_owned()));
        }

        let mut outcome = UserCascade::default();

        for row in self
            .user_roles
            .lock()
            .await
            .iter_mut()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            outcome.role_assignments += 1;
        }

        for row in self
            .resource_permissions
            .lock()
            .await
            .iter_mut()
            .filter(|row| row.user_id == user_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            outcome.resource_permissions += 1;
        }

        for row in self.delegations.lock().await.iter_mut().filter(|row| {
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
        if self.fail_cascades.load(Ordering::Relaxed) {
            return Err(AppError::Storage("cascade store unavailable".to_owned()));
        }

        let mut affected = BTreeSet::new();

        for row in self
            .user_roles
            .lock()
            .await
            .iter_mut()
            .filter(|row| row.role_id == role_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            affected.insert(row.user_id.clone());
        }

        for row in self
            .role_permissions
            .lock()
            .await
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
        if self.fail_cascades.load(Ordering::Relaxed) {
            return Err(AppError::Storage("cascade store unavailable".to_owned()));
        }

        let mut affected = BTreeSet::new();

        for row in self
            .role_permissions
            .lock()
            .await
            .iter_mut()
            .filter(|row| row.permission_id == permission_id && row.revoked_at.is_none())
        {
            row.revoke(revoked_by, at);
            affected.insert(row.role_id.clone());
        }

        Ok(affected)
    }
}

/// Recording cache fake with a failure switch.
#[derive(Default)]
pub(crate) struct FakeCache {
    pub entries: Mutex<HashMap<String, BTreeSet<String>>>,
    pub invalidations: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PermissionCache for FakeCache {
    async fn get(&self, user_id: &str) -> AppResult<Option<BTreeSet<String>>> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(AppError::Storage("cache unavailable".to_owned()));
        }
        Ok(self.entries.lock().await.get(user_id).cloned())
    }

    async fn put(
        &self,
        user_id: &str,
        permissions: &BTreeSet<String>,
        _ttl: Duration,
    ) -> AppResult<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(AppError::Storage("cache unavailable".to_owned()));
        }
        self.entries
            .lock()
            .await
            .insert(user_id.to_owned(), permissions.clone());
        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> AppResult<()> {
        self.entries.lock().await.remove(user_id);
        self.invalidations.lock().await.push(user_id.to_owned());
        Ok(())
    }
}

/// Recording audit-log fake.
#[derive(Default)]
pub(crate) struct FakeAuditLog {
    pub records: Mutex<Vec<NewAuditRecord>>,
}

#[async_trait]
impl AuditLogRepository for FakeAuditLog {
    async fn append(&self, record: NewAuditRecord) -> AppResult<()> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.lock().await;
        let mut matched: Vec<AuditRecord> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                query
                    .user_id
                    .as_ref()
                    .is_none_or(|user_id| record.user_id.as_ref() == Some(user_id))
            })
            .map(|(index, record)| AuditRecord {
                id: index as i64 + 1,
                recorded_at: Utc::now(),
                user_id: record.user_id.clone(),
                action: record.action.clone(),
                resource_type: record.resource_type.clone(),
                resource_id: record.resource_id.clone(),
                decision: record.decision,
                reason: record.reason.clone(),
                client_ip: record.client_ip.clone(),
                user_agent: record.user_agent.clone(),
            })
            .collect();
        matched.reverse();
        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(if query.limit == 0 { usize::MAX } else { query.limit })
            .collect())
    }
}

/// Dispatcher with no subscribers, for tests that assert on state only.
pub(crate) fn null_dispatcher() -> ChangeDispatcher {
    ChangeDispatcher::spawn(Vec::new())
}

/// Builds a permission service over the shared fakes with default policy.
pub(crate) fn permission_service(
    store: &Arc<FakeStore>,
    cache: &Arc<FakeCache>,
) -> PermissionService {
    PermissionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
        null_dispatcher(),
        RoleGovernancePolicy::default(),
    )
}

/// Builds a cascading revocation service over the shared fakes.
pub(crate) fn revocation_service(store: &Arc<FakeStore>) -> CascadingRevocationService {
    CascadingRevocationService::new(store.clone(), store.clone(), null_dispatcher())
}
