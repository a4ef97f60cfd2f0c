//! User directory lifecycle.

use std::sync::Arc;

use chrono::Utc;

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::User;

use crate::dispatcher::ChangeDispatcher;
use crate::events::PermissionChangeEvent;
use crate::ports::UserRepository;
use crate::revocation_service::CascadingRevocationService;

/// Input payload for creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    /// External identity-provider subject claim.
    pub subject: String,
    /// Contact email.
    pub email: String,
    /// Optional human-readable name.
    pub display_name: Option<String>,
}

/// Application service for user lifecycle with soft deletion.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    revocation: CascadingRevocationService,
    dispatcher: ChangeDispatcher,
}

impl UserService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        revocation: CascadingRevocationService,
        dispatcher: ChangeDispatcher,
    ) -> Self {
        Self {
            users,
            revocation,
            dispatcher,
        }
    }

    /// Returns a non-deleted user by id.
    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .find_active(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::User, user_id))
    }

    /// Lists all non-deleted users.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.users.list_active().await
    }

    /// Creates a user with a generated id.
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        if input.subject.trim().is_empty() {
            return Err(AppError::Validation(
                "user subject must not be empty".to_owned(),
            ));
        }
        if input.email.trim().is_empty() {
            return Err(AppError::Validation(
                "user email must not be empty".to_owned(),
            ));
        }

        self.users
            .save(User::new(input.subject, input.email, input.display_name))
            .await
    }

    /// Soft-deletes a user.
    ///
    /// The cascade over the user's grants runs first; if it fails, the user
    /// row is left untouched. Restoring later does not bring the revoked
    /// grants back.
    pub async fn delete_user(&self, user_id: &str, deleted_by: &str) -> AppResult<()> {
        let mut user = self.get_user(user_id).await?;

        self.revocation.revoke_all_for_user(user_id, deleted_by).await?;

        user.mark_deleted(deleted_by, Utc::now());
        self.users.save(user).await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::user_deleted(user_id, deleted_by));

        Ok(())
    }

    /// Restores a soft-deleted user. Previously revoked grants stay
    /// revoked and must be re-granted explicitly.
    pub async fn restore_user(&self, user_id: &str) -> AppResult<User> {
        let mut user = self
            .users
            .find_any(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::User, user_id))?;

        if !user.is_deleted() {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' is not deleted"
            )));
        }

        user.restore();
        let user = self.users.save(user).await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::user_restored(user_id));

        Ok(user)
    }
}
