//! Ports implemented by storage, cache, and audit adapters.

mod audit;
mod cache;
mod repositories;
mod revocation;

pub use audit::{AuditLogRepository, AuditQuery, NewAuditRecord};
pub use cache::PermissionCache;
pub use repositories::{
    DelegationRepository, NewDelegation, NewResourcePermission, NewRolePermission, NewUserRole,
    PermissionRepository, ResourcePermissionRepository, RolePermissionRepository, RoleRepository,
    UserRepository, UserRoleRepository,
};
pub use revocation::{RevocationStore, UserCascade};
