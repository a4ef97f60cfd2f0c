//! Change notifications emitted after authorization mutations.

use std::collections::{BTreeMap, BTreeSet};

use tessera_core::EntityKind;
use tessera_domain::{ChangeAction, Delegation, ResourcePermission};

/// Notification describing one committed authorization change.
///
/// `user_id` is the subject whose effective permissions the change touches
/// most directly; cascade events additionally carry every affected user so
/// downstream cache invalidation reaches all of them. The context map holds
/// action-specific detail for audit recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionChangeEvent {
    user_id: String,
    action: ChangeAction,
    context: BTreeMap<String, String>,
    affected_user_ids: BTreeSet<String>,
}

impl PermissionChangeEvent {
    /// Returns the subject user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the action tag.
    #[must_use]
    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// Returns the action-specific context map.
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Returns additional users whose caches must be invalidated.
    #[must_use]
    pub fn affected_user_ids(&self) -> &BTreeSet<String> {
        &self.affected_user_ids
    }

    /// Notification for a role assignment.
    #[must_use]
    pub fn role_assigned(user_id: &str, role_id: &str, granted_by: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            action: ChangeAction::RoleAssigned,
            context: BTreeMap::from([
                ("role_id".to_owned(), role_id.to_owned()),
                ("granted_by".to_owned(), granted_by.to_owned()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a role revocation.
    #[must_use]
    pub fn role_revoked(user_id: &str, role_id: &str, revoked_by: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            action: ChangeAction::RoleRevoked,
            context: BTreeMap::from([
                ("role_id".to_owned(), role_id.to_owned()),
                ("revoked_by".to_owned(), revoked_by.to_owned()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a cascading revocation over a soft-deleted entity.
    #[must_use]
    pub fn cascading_revocation(
        entity_kind: EntityKind,
        entity_id: &str,
        revoked_by: &str,
        affected_user_ids: BTreeSet<String>,
    ) -> Self {
        Self {
            user_id: entity_id.to_owned(),
            action: ChangeAction::CascadingRevocation,
            context: BTreeMap::from([
                ("entity_type".to_owned(), entity_kind.as_str().to_owned()),
                ("entity_id".to_owned(), entity_id.to_owned()),
                ("revoked_by".to_owned(), revoked_by.to_owned()),
            ]),
            affected_user_ids,
        }
    }

    /// Notification for a created delegation.
    #[must_use]
    pub fn delegation_created(delegation: &Delegation) -> Self {
        Self {
            user_id: delegation.delegatee_id.clone(),
            action: ChangeAction::DelegationCreated,
            context: BTreeMap::from([
                ("delegation_id".to_owned(), delegation.id.to_string()),
                ("delegator_id".to_owned(), delegation.delegator_id.clone()),
                ("scope".to_owned(), delegation.scope.as_str().to_owned()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a revoked delegation.
    #[must_use]
    pub fn delegation_revoked(delegation: &Delegation) -> Self {
        Self {
            user_id: delegation.delegatee_id.clone(),
            action: ChangeAction::DelegationRevoked,
            context: BTreeMap::from([
                ("delegation_id".to_owned(), delegation.id.to_string()),
                ("delegator_id".to_owned(), delegation.delegator_id.clone()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a soft-deleted user.
    #[must_use]
    pub fn user_deleted(user_id: &str, deleted_by: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            action: ChangeAction::UserDeleted,
            context: BTreeMap::from([("deleted_by".to_owned(), deleted_by.to_owned())]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a restored user.
    #[must_use]
    pub fn user_restored(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            action: ChangeAction::UserRestored,
            context: BTreeMap::new(),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a granted resource permission.
    #[must_use]
    pub fn resource_permission_granted(grant: &ResourcePermission) -> Self {
        Self {
            user_id: grant.user_id.clone(),
            action: ChangeAction::ResourcePermissionGranted,
            context: BTreeMap::from([
                ("grant_id".to_owned(), grant.id.to_string()),
                ("resource_type".to_owned(), grant.resource_type.clone()),
                ("resource_id".to_owned(), grant.resource_id.clone()),
                ("permission".to_owned(), grant.permission.clone()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }

    /// Notification for a revoked resource permission.
    #[must_use]
    pub fn resource_permission_revoked(grant: &ResourcePermission) -> Self {
        Self {
            user_id: grant.user_id.clone(),
            action: ChangeAction::ResourcePermissionRevoked,
            context: BTreeMap::from([
                ("grant_id".to_owned(), grant.id.to_string()),
                ("resource_type".to_owned(), grant.resource_type.clone()),
                ("resource_id".to_owned(), grant.resource_id.clone()),
            ]),
            affected_user_ids: BTreeSet::new(),
        }
    }
}
