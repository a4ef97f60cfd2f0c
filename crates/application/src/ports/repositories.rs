use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_core::AppResult;
use tessera_domain::{
    Delegation, DelegationScope, PermissionDefinition, ResourcePermission, Role, RolePermission,
    User, UserRole,
};

/// Input payload for inserting a user-role assignment row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRole {
    /// User receiving the role.
    pub user_id: String,
    /// Role being assigned.
    pub role_id: String,
    /// Optional organization scope.
    pub organization_id: Option<String>,
    /// Grant instant.
    pub granted_at: DateTime<Utc>,
    /// Actor performing the grant.
    pub granted_by: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input payload for inserting a role-permission grant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRolePermission {
    /// Role holding the permission.
    pub role_id: String,
    /// Permission being granted.
    pub permission_id: String,
    /// Grant instant.
    pub granted_at: DateTime<Utc>,
    /// Actor performing the grant.
    pub granted_by: String,
}

/// Input payload for inserting a resource-permission grant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResourcePermission {
    /// User receiving the grant.
    pub user_id: String,
    /// Type of the target resource.
    pub resource_type: String,
    /// Identifier of the target resource.
    pub resource_id: String,
    /// Granted permission string.
    pub permission: String,
    /// Grant instant.
    pub granted_at: DateTime<Utc>,
    /// Actor performing the grant.
    pub granted_by: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text reason captured at grant time.
    pub reason: Option<String>,
}

/// Input payload for inserting a delegation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelegation {
    /// User granting access.
    pub delegator_id: String,
    /// User receiving access.
    pub delegatee_id: String,
    /// Scope of the transferred access.
    pub scope: DelegationScope,
    /// Optional resource-type restriction.
    pub resource_type: Option<String>,
    /// Optional resource-id allow-list.
    pub resource_ids: Option<Vec<String>>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// Optional end of the validity window.
    pub valid_until: Option<DateTime<Utc>>,
}

/// Repository port for user directory entries.
///
/// `save` is insert-or-update and must reject a subject or email already
/// used by a different non-deleted user with a conflict error.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a non-deleted user by id.
    async fn find_active(&self, user_id: &str) -> AppResult<Option<User>>;

    /// Finds a user by id regardless of deletion state.
    async fn find_any(&self, user_id: &str) -> AppResult<Option<User>>;

    /// Lists all non-deleted users.
    async fn list_active(&self) -> AppResult<Vec<User>>;

    /// Inserts or updates a user.
    async fn save(&self, user: User) -> AppResult<User>;
}

/// Repository port for the role catalog.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a non-deleted role by id.
    async fn find_active(&self, role_id: &str) -> AppResult<Option<Role>>;

    /// Finds a role by id regardless of deletion state.
    async fn find_any(&self, role_id: &str) -> AppResult<Option<Role>>;

    /// Lists all non-deleted roles.
    async fn list_active(&self) -> AppResult<Vec<Role>>;

    /// Inserts or updates a role. Rejects a name already used by a
    /// different non-deleted role.
    async fn save(&self, role: Role) -> AppResult<Role>;
}

/// Repository port for the permission catalog.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Finds a non-deleted permission by id.
    async fn find_active(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>>;

    /// Finds a permission by id regardless of deletion state.
    async fn find_any(&self, permission_id: &str) -> AppResult<Option<PermissionDefinition>>;

    /// Lists all non-deleted permissions.
    async fn list_active(&self) -> AppResult<Vec<PermissionDefinition>>;

    /// Inserts or updates a permission.
    async fn save(&self, permission: PermissionDefinition) -> AppResult<PermissionDefinition>;
}

/// Repository port for temporal user-role assignment rows.
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// Inserts a new assignment row.
    ///
    /// Implementations must enforce at most one non-revoked row per
    /// (user, role, organization) triple and surface a violation as a
    /// duplicate-assignment error, including under concurrent inserts.
    async fn insert(&self, grant: NewUserRole) -> AppResult<UserRole>;

    /// Persists the revocation fields of an existing row.
    async fn update(&self, assignment: &UserRole) -> AppResult<()>;

    /// Finds all non-revoked assignments for a user.
    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<UserRole>>;

    /// Finds the non-revoked assignment for a (user, role) pair, if any.
    async fn find_active_pair(&self, user_id: &str, role_id: &str) -> AppResult<Option<UserRole>>;

    /// Finds all non-revoked assignments of a role.
    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<UserRole>>;

    /// Finds assignments whose grant/revoke window contains `at`.
    async fn find_window_by_user(&self, user_id: &str, at: DateTime<Utc>)
    -> AppResult<Vec<UserRole>>;

    /// Returns the permission ids granted through the user's active,
    /// unexpired assignments joined against active role-permission rows.
    async fn find_active_permission_ids(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>>;
}

/// Repository port for temporal role-permission grant rows.
#[async_trait]
pub trait RolePermissionRepository: Send + Sync {
    /// Inserts a new grant row. Implementations must enforce at most one
    /// non-revoked row per (role, permission) pair.
    async fn insert(&self, grant: NewRolePermission) -> AppResult<RolePermission>;

    /// Persists the revocation fields of an existing row.
    async fn update(&self, grant: &RolePermission) -> AppResult<()>;

    /// Finds all non-revoked grants held by a role.
    async fn find_active_by_role(&self, role_id: &str) -> AppResult<Vec<RolePermission>>;

    /// Finds the non-revoked grant for a (role, permission) pair, if any.
    async fn find_active_pair(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<Option<RolePermission>>;
}

/// Repository port for temporal resource-permission grant rows.
#[async_trait]
pub trait ResourcePermissionRepository: Send + Sync {
    /// Inserts a new grant row.
    async fn insert(&self, grant: NewResourcePermission) -> AppResult<ResourcePermission>;

    /// Persists the revocation fields of an existing row.
    async fn update(&self, grant: &ResourcePermission) -> AppResult<()>;

    /// Finds a grant row by id.
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ResourcePermission>>;

    /// Finds the user's active (non-revoked, unexpired) grants.
    async fn find_active_by_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>>;

    /// Finds grants whose grant/revoke window contains `at`.
    async fn find_window_by_user(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<ResourcePermission>>;
}

/// Repository port for temporal delegation rows.
#[async_trait]
pub trait DelegationRepository: Send + Sync {
    /// Inserts a new delegation row.
    async fn insert(&self, delegation: NewDelegation) -> AppResult<Delegation>;

    /// Persists the revocation fields of an existing row.
    async fn update(&self, delegation: &Delegation) -> AppResult<()>;

    /// Finds a delegation row by id.
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Delegation>>;

    /// Finds active delegations received by a user.
    async fn find_active_for_delegatee(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>>;

    /// Finds active delegations created by a user.
    async fn find_active_by_delegator(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Delegation>>;
}
