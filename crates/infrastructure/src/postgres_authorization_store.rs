//! PostgreSQL-backed authorization store.

mod catalog;
mod revocation;
mod temporal;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tessera_core::AppError;
use tessera_domain::{
    Delegation, DelegationScope, PermissionDefinition, ResourcePermission, Role, RolePermission,
    SoftDelete, User, UserRole,
};

/// PostgreSQL implementation of every storage port.
///
/// Single-active-row invariants live in partial unique indexes (see the
/// crate migrations); this adapter translates their violations into the
/// domain errors callers expect.
#[derive(Clone)]
pub struct PostgresAuthorizationStore {
    pool: PgPool,
}

impl PostgresAuthorizationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    subject: String,
    email: String,
    display_name: Option<String>,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            subject: row.subject,
            email: row.email,
            display_name: row.display_name,
            deletion: SoftDelete {
                deleted: row.deleted,
                deleted_at: row.deleted_at,
                deleted_by: row.deleted_by,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    parent_role_id: Option<String>,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            parent_role_id: row.parent_role_id,
            deletion: SoftDelete {
                deleted: row.deleted,
                deleted_at: row.deleted_at,
                deleted_by: row.deleted_by,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: String,
    name: String,
    resource_type: String,
    action: String,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<String>,
}

impl From<PermissionRow> for PermissionDefinition {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            resource_type: row.resource_type,
            action: row.action,
            deletion: SoftDelete {
                deleted: row.deleted,
                deleted_at: row.deleted_at,
                deleted_by: row.deleted_by,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    id: i64,
    user_id: String,
    role_id: String,
    organization_id: Option<String>,
    granted_at: DateTime<Utc>,
    granted_by: String,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl From<UserRoleRow> for UserRole {
    fn from(row: UserRoleRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            organization_id: row.organization_id,
            granted_at: row.granted_at,
            granted_by: row.granted_by,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            revoked_by: row.revoked_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    id: i64,
    role_id: String,
    permission_id: String,
    granted_at: DateTime<Utc>,
    granted_by: String,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl From<RolePermissionRow> for RolePermission {
    fn from(row: RolePermissionRow) -> Self {
        Self {
            id: row.id,
            role_id: row.role_id,
            permission_id: row.permission_id,
            granted_at: row.granted_at,
            granted_by: row.granted_by,
            revoked_at: row.revoked_at,
            revoked_by: row.revoked_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct ResourcePermissionRow {
    id: i64,
    user_id: String,
    resource_type: String,
    resource_id: String,
    permission: String,
    granted_at: DateTime<Utc>,
    granted_by: String,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
    reason: Option<String>,
}

impl From<ResourcePermissionRow> for ResourcePermission {
    fn from(row: ResourcePermissionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            permission: row.permission,
            granted_at: row.granted_at,
            granted_by: row.granted_by,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            revoked_by: row.revoked_by,
            reason: row.reason,
        }
    }
}

#[derive(Debug, FromRow)]
struct DelegationRow {
    id: i64,
    delegator_id: String,
    delegatee_id: String,
    scope: String,
    resource_type: Option<String>,
    resource_ids: Option<Vec<String>>,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl TryFrom<DelegationRow> for Delegation {
    type Error = AppError;

    fn try_from(row: DelegationRow) -> Result<Self, Self::Error> {
        let scope = DelegationScope::from_str(row.scope.as_str())?;
        Ok(Self {
            id: row.id,
            delegator_id: row.delegator_id,
            delegatee_id: row.delegatee_id,
            scope,
            resource_type: row.resource_type,
            resource_ids: row.resource_ids,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            revoked_at: row.revoked_at,
            revoked_by: row.revoked_by,
        })
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return true;
    }
    false
}
