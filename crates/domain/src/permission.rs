use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SoftDelete;

/// Permission definition in the catalog.
///
/// Identifiers follow the `resource:action` convention (for example
/// `transactions:read`). The convention is not enforced by a parser; the id
/// is treated as opaque everywhere it is compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Opaque permission identifier, `resource:action` by convention.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Resource type component.
    pub resource_type: String,
    /// Action component.
    pub action: String,
    /// Soft-deletion state.
    pub deletion: SoftDelete,
}

impl PermissionDefinition {
    /// Creates a permission whose id is derived from resource type and action.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        action: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let action = action.into();
        Self {
            id: format!("{resource_type}:{action}"),
            name: name.into(),
            resource_type,
            action,
            deletion: SoftDelete::default(),
        }
    }

    /// Returns whether the permission is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deletion.deleted
    }

    /// Soft-deletes the permission.
    pub fn mark_deleted(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        self.deletion.mark(deleted_by, at);
    }

    /// Clears the soft-deletion state.
    pub fn restore(&mut self) {
        self.deletion.clear();
    }
}
