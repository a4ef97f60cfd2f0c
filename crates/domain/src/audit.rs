use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::AppError;

/// Outcome of an access decision recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessDecision {
    /// The access was allowed.
    Granted,
    /// The access was denied.
    Denied,
}

impl AccessDecision {
    /// Returns a stable storage value for this decision.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::Denied => "DENIED",
        }
    }
}

impl FromStr for AccessDecision {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GRANTED" => Ok(Self::Granted),
            "DENIED" => Ok(Self::Denied),
            _ => Err(AppError::Validation(format!(
                "unknown access decision '{value}'"
            ))),
        }
    }
}

/// Action tags carried by change notifications and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    /// A role was assigned to a user.
    RoleAssigned,
    /// A role assignment was revoked.
    RoleRevoked,
    /// A soft-delete cascaded revocation over dependent rows.
    CascadingRevocation,
    /// A delegation was created.
    DelegationCreated,
    /// A delegation was revoked.
    DelegationRevoked,
    /// A user was soft-deleted.
    UserDeleted,
    /// A soft-deleted user was restored.
    UserRestored,
    /// A resource-level permission was granted.
    ResourcePermissionGranted,
    /// A resource-level permission was revoked.
    ResourcePermissionRevoked,
}

impl ChangeAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleAssigned => "ROLE_ASSIGNED",
            Self::RoleRevoked => "ROLE_REVOKED",
            Self::CascadingRevocation => "CASCADING_REVOCATION",
            Self::DelegationCreated => "DELEGATION_CREATED",
            Self::DelegationRevoked => "DELEGATION_REVOKED",
            Self::UserDeleted => "USER_DELETED",
            Self::UserRestored => "USER_RESTORED",
            Self::ResourcePermissionGranted => "RESOURCE_PERMISSION_GRANTED",
            Self::ResourcePermissionRevoked => "RESOURCE_PERMISSION_REVOKED",
        }
    }
}

/// Immutable entry in the authorization audit trail.
///
/// Records are appended once and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
    /// Subject user the record concerns, when one exists.
    pub user_id: Option<String>,
    /// Action tag.
    pub action: String,
    /// Optional resource type.
    pub resource_type: Option<String>,
    /// Optional resource identifier.
    pub resource_id: Option<String>,
    /// Outcome of the decision or change.
    pub decision: AccessDecision,
    /// Optional free-text or JSON detail.
    pub reason: Option<String>,
    /// Client network address, when the caller supplied one.
    pub client_ip: Option<String>,
    /// Client user agent, when the caller supplied one.
    pub user_agent: Option<String>,
}
