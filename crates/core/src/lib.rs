//! Shared primitives for all Rust crates in Tessera.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Tessera crates.
pub type AppResult<T> = Result<T, AppError>;

/// Entity kinds referenced by structured error payloads and cascade events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A directory user.
    User,
    /// A role in the catalog.
    Role,
    /// A permission definition in the catalog.
    Permission,
    /// A temporal user-role assignment row.
    RoleAssignment,
    /// A temporal role-permission grant row.
    RolePermission,
    /// A resource-scoped permission grant row.
    ResourcePermission,
    /// A user-to-user delegation row.
    Delegation,
}

impl EntityKind {
    /// Returns a stable lowercase label for this entity kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Permission => "permission",
            Self::RoleAssignment => "role assignment",
            Self::RolePermission => "role permission",
            Self::ResourcePermission => "resource permission",
            Self::Delegation => "delegation",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Common application error categories.
///
/// Governance failures carry the ids and required permissions involved so
/// callers can render precise messages without parsing strings.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested entity does not exist or is soft-deleted.
    #[error("{kind} '{id}' was not found")]
    NotFound {
        /// Kind of entity that was looked up.
        kind: EntityKind,
        /// Identifier used for the lookup.
        id: String,
    },

    /// Attempt to assign or revoke the protected role through the service.
    #[error("role '{role_id}' is protected and can only be changed in storage directly")]
    ProtectedRole {
        /// The protected role identifier.
        role_id: String,
    },

    /// Actor lacks the permission a governance check requires.
    #[error("subject '{subject}' is missing required permission '{required}'")]
    PermissionDenied {
        /// Actor whose effective permissions were checked.
        subject: String,
        /// Permission id the check required.
        required: String,
    },

    /// An active assignment already exists for the pair.
    #[error("user '{user_id}' already holds an active assignment of role '{role_id}'")]
    DuplicateAssignment {
        /// User holding the existing assignment.
        user_id: String,
        /// Role already assigned.
        role_id: String,
    },

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backing store failed; any in-flight multi-row change was rolled back.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Creates a not-found error for the given entity kind and id.
    #[must_use]
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
