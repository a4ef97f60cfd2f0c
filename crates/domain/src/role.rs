use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SoftDelete;

/// Role in the catalog.
///
/// `parent_role_id` is a stored single-level reference; the resolver does
/// not traverse it when computing effective permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Opaque role identifier. Well-known roles use their name as id
    /// (for example `USER` or `MANAGER`); custom roles get a `role_` prefix.
    pub id: String,
    /// Unique name among non-deleted roles.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Optional parent role reference.
    pub parent_role_id: Option<String>,
    /// Soft-deletion state.
    pub deletion: SoftDelete,
}

impl Role {
    /// Creates a role with a freshly generated identifier.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        parent_role_id: Option<String>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.into(),
            description,
            parent_role_id,
            deletion: SoftDelete::default(),
        }
    }

    /// Generates a new prefixed role identifier.
    #[must_use]
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("role_{}", &hex[..12])
    }

    /// Returns whether the role is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deletion.deleted
    }

    /// Soft-deletes the role.
    pub fn mark_deleted(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        self.deletion.mark(deleted_by, at);
    }

    /// Clears the soft-deletion state.
    pub fn restore(&mut self) {
        self.deletion.clear();
    }
}
