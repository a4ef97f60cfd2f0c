//! Domain types for the Tessera authorization service.
//!
//! Entities are plain data plus the temporal predicates that define when a
//! grant row counts as active. No I/O happens in this crate; repositories
//! and services live in `tessera-application` and `tessera-infrastructure`.

#![forbid(unsafe_code)]

mod audit;
mod delegation;
mod permission;
mod resource_grant;
mod role;
mod soft_delete;
mod temporal;
mod user;

pub use audit::{AccessDecision, AuditRecord, ChangeAction};
pub use delegation::{Delegation, DelegationScope};
pub use permission::PermissionDefinition;
pub use resource_grant::ResourcePermission;
pub use role::Role;
pub use soft_delete::SoftDelete;
pub use temporal::{RolePermission, UserRole};
pub use user::User;
