use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-deletion state embedded in catalog entities.
///
/// Entities are never removed from storage; deletion flips this flag and
/// restoring clears it again. Restoring does NOT reinstate temporal grant
/// rows that were revoked when the entity was deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDelete {
    /// Whether the entity is currently deleted.
    pub deleted: bool,
    /// When the entity was deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Actor that performed the deletion.
    pub deleted_by: Option<String>,
}

impl SoftDelete {
    /// Marks the entity deleted by the given actor at the given instant.
    pub fn mark(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = Some(deleted_by.into());
    }

    /// Clears the deletion state.
    pub fn clear(&mut self) {
        self.deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
    }
}
