//! Application services and ports for the Tessera authorization core.
//!
//! Services orchestrate the temporal assignment store behind repository
//! ports, enforce assignment governance, and emit change notifications
//! that a background dispatcher fans out to cache-invalidation and audit
//! subscribers.

#![forbid(unsafe_code)]

mod audit_service;
mod delegation_service;
mod dispatcher;
mod events;
mod governance;
mod permission_catalog_service;
mod permission_service;
mod ports;
mod resource_permission_service;
mod revocation_service;
mod role_service;
#[cfg(test)]
mod test_support;
mod user_service;

pub use audit_service::AuditService;
pub use delegation_service::{CreateDelegationInput, DelegationService, DelegationsSummary};
pub use dispatcher::{
    AuditTrailListener, CacheInvalidationListener, ChangeDispatcher, ChangeListener,
};
pub use events::PermissionChangeEvent;
pub use governance::{RoleGovernancePolicy, RoleTier};
pub use permission_catalog_service::PermissionCatalogService;
pub use permission_service::{EffectivePermissions, PermissionService};
pub use ports::{
    AuditLogRepository, AuditQuery, DelegationRepository, NewAuditRecord, NewDelegation,
    NewResourcePermission, NewRolePermission, NewUserRole, PermissionCache, PermissionRepository,
    ResourcePermissionRepository, RevocationStore, RolePermissionRepository, RoleRepository,
    UserCascade, UserRepository, UserRoleRepository,
};
pub use resource_permission_service::{GrantResourcePermissionInput, ResourcePermissionService};
pub use revocation_service::{CascadingRevocationService, PermissionCascade};
pub use role_service::{RoleInput, RoleService};
pub use user_service::{CreateUserInput, UserService};
