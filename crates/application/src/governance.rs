//! Governance configuration for role assignment.

use std::collections::BTreeSet;

/// Governance tier a role falls into for assignment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTier {
    /// Member of the configured basic-role set.
    Basic,
    /// Member of the configured elevated-role set.
    Elevated,
    /// Any role in neither set; governed like an elevated role.
    Custom,
}

/// Injected configuration for the role assignment governor.
///
/// One value per deployment; tests construct their own instead of sharing
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGovernancePolicy {
    /// Roles assignable with the basic assignment permission.
    pub basic_roles: BTreeSet<String>,
    /// Roles requiring the elevated assignment permission.
    pub elevated_roles: BTreeSet<String>,
    /// Role locked out of service-driven assignment and revocation.
    pub protected_role: String,
    /// Permission id required to assign basic roles.
    pub assign_basic_permission: String,
    /// Permission id required to assign elevated and custom roles.
    pub assign_elevated_permission: String,
    /// Permission id required to revoke any role.
    pub revoke_permission: String,
}

impl Default for RoleGovernancePolicy {
    fn default() -> Self {
        Self {
            basic_roles: BTreeSet::from([
                "USER".to_owned(),
                "ACCOUNTANT".to_owned(),
                "AUDITOR".to_owned(),
            ]),
            elevated_roles: BTreeSet::from(["MANAGER".to_owned(), "ORG_ADMIN".to_owned()]),
            protected_role: "SYSTEM_ADMIN".to_owned(),
            assign_basic_permission: "user-roles:assign-basic".to_owned(),
            assign_elevated_permission: "user-roles:assign-elevated".to_owned(),
            revoke_permission: "user-roles:revoke".to_owned(),
        }
    }
}

impl RoleGovernancePolicy {
    /// Returns whether the role is the protected sentinel.
    #[must_use]
    pub fn is_protected(&self, role_id: &str) -> bool {
        self.protected_role == role_id
    }

    /// Classifies a role into its governance tier.
    #[must_use]
    pub fn tier_of(&self, role_id: &str) -> RoleTier {
        if self.elevated_roles.contains(role_id) {
            RoleTier::Elevated
        } else if self.basic_roles.contains(role_id) {
            RoleTier::Basic
        } else {
            RoleTier::Custom
        }
    }

    /// Returns the permission id an assignment at this tier requires.
    #[must_use]
    pub fn required_assignment_permission(&self, tier: RoleTier) -> &str {
        match tier {
            RoleTier::Basic => self.assign_basic_permission.as_str(),
            RoleTier::Elevated | RoleTier::Custom => self.assign_elevated_permission.as_str(),
        }
    }

    /// Evaluates whether the granted permission set clears the tier.
    ///
    /// The elevated assignment permission implies the basic one.
    #[must_use]
    pub fn assignment_permitted(&self, tier: RoleTier, granted: &BTreeSet<String>) -> bool {
        match tier {
            RoleTier::Basic => {
                granted.contains(&self.assign_basic_permission)
                    || granted.contains(&self.assign_elevated_permission)
            }
            RoleTier::Elevated | RoleTier::Custom => {
                granted.contains(&self.assign_elevated_permission)
            }
        }
    }
}
