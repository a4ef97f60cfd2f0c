use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temporal grant of a permission on one specific resource to a user.
///
/// Unlike role-based permissions, `permission` is a literal string (for
/// example `"read"`) rather than a catalog reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermission {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// User receiving the grant.
    pub user_id: String,
    /// Type of the target resource.
    pub resource_type: String,
    /// Identifier of the target resource.
    pub resource_id: String,
    /// Granted permission string.
    pub permission: String,
    /// When the permission was granted.
    pub granted_at: DateTime<Utc>,
    /// Actor that granted the permission.
    pub granted_by: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the grant was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Actor that revoked the grant.
    pub revoked_by: Option<String>,
    /// Free-text reason captured at grant time.
    pub reason: Option<String>,
}

impl ResourcePermission {
    /// Returns whether the grant is active at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|expires_at| expires_at > now)
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
