//! Temporal assignment rows.
//!
//! Rows are written once per grant event and mutated exactly once, to set
//! the revocation fields. Re-granting after a revocation inserts a new row;
//! the revoked row stays behind as history. Expiry is evaluated lazily by
//! the active predicates, never by a background sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temporal assignment of a role to a user.
///
/// At most one row per (user, role, organization) triple may have
/// `revoked_at = NULL`; the backing store enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// User receiving the role.
    pub user_id: String,
    /// Role being assigned.
    pub role_id: String,
    /// Optional organization scope. Stored, but no isolation logic reads it.
    pub organization_id: Option<String>,
    /// When the role was granted.
    pub granted_at: DateTime<Utc>,
    /// Actor that granted the role.
    pub granted_by: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the assignment was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Actor that revoked the assignment.
    pub revoked_by: Option<String>,
}

impl UserRole {
    /// Returns whether the assignment is active at `now`.
    ///
    /// Active means not revoked and not past its expiry. An expired row is
    /// simply no longer returned by active queries; it is distinct from a
    /// revoked row, which records who ended it and when.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    /// Returns whether the assignment was active at the given past instant.
    ///
    /// The point-in-time window is `granted_at <= at` and not yet revoked
    /// at `at`. Expiry does not participate in historical windowing.
    #[must_use]
    pub fn was_active_at(&self, at: DateTime<Utc>) -> bool {
        self.granted_at <= at && self.revoked_at.is_none_or(|revoked_at| revoked_at > at)
    }

    /// Records the revocation of this assignment.
    pub fn revoke(&mut self, revoked_by: impl Into<String>, at: DateTime<Utc>) {
        self.revoked_at = Some(at);
        self.revoked_by = Some(revoked_by.into());
    }
}

/// Temporal grant of a permission to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// Role holding the permission.
    pub role_id: String,
    /// Permission being granted.
    pub permission_id: String,
    /// When the permission was granted.
    pub granted_at: DateTime<Utc>,
    /// Actor that granted the permission.
    pub granted_by: String,
    /// When the grant was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Actor that revoked the grant.
    pub revoked_by: Option<String>,
}

impl RolePermission {
    /// Returns whether the grant is active. Role-permission grants carry no
    /// expiry, so active simply means not revoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Returns whether the grant was active at the given past instant.
    #[must_use]
    pub fn was_active_at(&self, at: DateTime<Utc>) -> bool {
        self.granted_at <= at && self.revoked_at.is_none_or(|revoked_at| revoked_at > at)
    }

    /// Records the revocation of this grant.
    pub fn revoke(&mut self, revoked_by: impl Into<String>, at: DateTime<Utc>) {
        self.revoked_at = Some(at);
        self.revoked_by = Some(revoked_by.into());
    }
}
