use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::SoftDelete;

/// Directory entry for a person known to the authorization service.
///
/// `subject` is the stable identifier issued by the external identity
/// provider. Both `subject` and `email` must be unique among non-deleted
/// users; the backing store enforces this, so a soft-deleted user's values
/// become reusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier (`usr_` prefix).
    pub id: String,
    /// External identity-provider subject claim.
    pub subject: String,
    /// Contact email.
    pub email: String,
    /// Optional human-readable name.
    pub display_name: Option<String>,
    /// Soft-deletion state.
    pub deletion: SoftDelete,
}

impl User {
    /// Creates a user with a freshly generated identifier.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            subject: subject.into(),
            email: email.into(),
            display_name,
            deletion: SoftDelete::default(),
        }
    }

    /// Generates a new prefixed user identifier.
    #[must_use]
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("usr_{}", &hex[..12])
    }

    /// Returns whether the user is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deletion.deleted
    }

    /// Soft-deletes the user.
    pub fn mark_deleted(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        self.deletion.mark(deleted_by, at);
    }

    /// Clears the soft-deletion state.
    pub fn restore(&mut self) {
        self.deletion.clear();
    }
}
