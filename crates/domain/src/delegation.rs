use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::AppError;

/// Scope of access a delegation transfers to the delegatee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationScope {
    /// The delegatee may act with the delegator's full access.
    Full,
    /// Only `:read` and `:list` permissions pass.
    ReadOnly,
    /// Any action on `transaction` resources passes; the requested
    /// permission verb is not consulted.
    TransactionsOnly,
}

impl DelegationScope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::ReadOnly => "read_only",
            Self::TransactionsOnly => "transactions_only",
        }
    }

    /// Evaluates the scope rule against a requested access.
    #[must_use]
    pub fn permits(&self, resource_type: &str, permission: &str) -> bool {
        match self {
            Self::Full => true,
            Self::ReadOnly => permission.ends_with(":read") || permission.ends_with(":list"),
            Self::TransactionsOnly => resource_type == "transaction",
        }
    }
}

impl FromStr for DelegationScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full" => Ok(Self::Full),
            "read_only" => Ok(Self::ReadOnly),
            "transactions_only" => Ok(Self::TransactionsOnly),
            _ => Err(AppError::Validation(format!(
                "unknown delegation scope '{value}'"
            ))),
        }
    }
}

/// Time-bounded transfer of a subset of one user's access to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// User granting access.
    pub delegator_id: String,
    /// User receiving access.
    pub delegatee_id: String,
    /// Scope of the transferred access.
    pub scope: DelegationScope,
    /// Optional resource-type restriction; `None` covers every type.
    pub resource_type: Option<String>,
    /// Optional resource-id allow-list; `None` or empty covers every id.
    pub resource_ids: Option<Vec<String>>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// Optional end of the validity window.
    pub valid_until: Option<DateTime<Utc>>,
    /// When the delegation was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Actor that revoked the delegation.
    pub revoked_by: Option<String>,
}

impl Delegation {
    /// Returns whether the delegation is active at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none()
            && self.valid_from <= now
            && self.valid_until.is_none_or(|valid_until| valid_until > now)
    }

    /// Returns whether this delegation covers the requested access.
    ///
    /// All three filters must pass: resource type, resource-id allow-list
    /// (exact string match), and the scope rule. Activity is not checked
    /// here; callers evaluate it against their reference instant.
    #[must_use]
    pub fn covers(&self, resource_type: &str, resource_id: &str, permission: &str) -> bool {
        if let Some(restricted_type) = &self.resource_type
            && restricted_type != resource_type
        {
            return false;
        }

        if let Some(allowed_ids) = &self.resource_ids
            && !allowed_ids.is_empty()
            && !allowed_ids.iter().any(|allowed| allowed == resource_id)
        {
            return false;
        }

        self.scope.permits(resource_type, permission)
    }

    /// Records the revocation of this delegation.
    pub fn revoke(&mut self, revoked_by: impl Into<String>, at: DateTime<Utc>) {
        self.revoked_at = Some(at);
        self.revoked_by = Some(revoked_by.into());
    }
}
