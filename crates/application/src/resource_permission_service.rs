//! Resource-scoped permission grants.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::ResourcePermission;

use crate::dispatcher::ChangeDispatcher;
use crate::events::PermissionChangeEvent;
use crate::ports::{NewResourcePermission, ResourcePermissionRepository, UserRepository};

/// Input payload for granting a resource permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantResourcePermissionInput {
    /// User receiving the grant.
    pub user_id: String,
    /// Type of the target resource.
    pub resource_type: String,
    /// Identifier of the target resource.
    pub resource_id: String,
    /// Granted permission string.
    pub permission: String,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text reason for the grant.
    pub reason: Option<String>,
    /// Actor performing the grant.
    pub granted_by: String,
}

/// Application service for fine-grained grants on specific resources.
#[derive(Clone)]
pub struct ResourcePermissionService {
    resource_permissions: Arc<dyn ResourcePermissionRepository>,
    users: Arc<dyn UserRepository>,
    dispatcher: ChangeDispatcher,
}

impl ResourcePermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        resource_permissions: Arc<dyn ResourcePermissionRepository>,
        users: Arc<dyn UserRepository>,
        dispatcher: ChangeDispatcher,
    ) -> Self {
        Self {
            resource_permissions,
            users,
            dispatcher,
        }
    }

    /// Grants a permission on one resource to a user.
    pub async fn grant(&self, input: GrantResourcePermissionInput) -> AppResult<ResourcePermission> {
        self.users
            .find_active(&input.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::User, input.user_id.as_str()))?;

        let grant = self
            .resource_permissions
            .insert(NewResourcePermission {
                user_id: input.user_id,
                resource_type: input.resource_type,
                resource_id: input.resource_id,
                permission: input.permission,
                granted_at: Utc::now(),
                granted_by: input.granted_by,
                expires_at: input.expires_at,
                reason: input.reason,
            })
            .await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::resource_permission_granted(&grant));

        Ok(grant)
    }

    /// Revokes a resource permission by row id.
    pub async fn revoke(&self, id: i64, revoked_by: &str) -> AppResult<()> {
        let mut grant = self
            .resource_permissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::ResourcePermission, id.to_string()))?;

        grant.revoke(revoked_by, Utc::now());
        self.resource_permissions.update(&grant).await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::resource_permission_revoked(&grant));

        Ok(())
    }

    /// Returns the user's active resource permissions.
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ResourcePermission>> {
        self.resource_permissions
            .find_active_by_user(user_id, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use tessera_core::AppError;

    use crate::test_support::{FakeStore, null_dispatcher};

    use super::{GrantResourcePermissionInput, ResourcePermissionService};

    fn service(store: &Arc<FakeStore>) -> ResourcePermissionService {
        ResourcePermissionService::new(store.clone(), store.clone(), null_dispatcher())
    }

    fn input(user_id: &str) -> GrantResourcePermissionInput {
        GrantResourcePermissionInput {
            user_id: user_id.to_owned(),
            resource_type: "report".to_owned(),
            resource_id: "rep_1".to_owned(),
            permission: "read".to_owned(),
            expires_at: None,
            reason: Some("quarter-end review".to_owned()),
            granted_by: "usr_admin".to_owned(),
        }
    }

    #[tokio::test]
    async fn granting_requires_an_active_user() {
        let store = Arc::new(FakeStore::default());
        let service = service(&store);

        let result = service.grant(input("usr_ghost")).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn grant_then_revoke_round_trip() {
        let store = Arc::new(FakeStore::default());
        store.seed_user("usr_1").await;
        let service = service(&store);

        let granted = service.grant(input("usr_1")).await;
        assert!(granted.is_ok());
        let id = granted.map(|grant| grant.id).unwrap_or_default();

        assert_eq!(service.list_for_user("usr_1").await.map(|rows| rows.len()).ok(), Some(1));

        assert!(service.revoke(id, "usr_admin").await.is_ok());
        assert_eq!(service.list_for_user("usr_1").await.map(|rows| rows.len()).ok(), Some(0));
    }

    #[tokio::test]
    async fn expired_grants_are_not_listed() {
        let store = Arc::new(FakeStore::default());
        store.seed_user("usr_1").await;
        let service = service(&store);

        let mut expiring = input("usr_1");
        expiring.expires_at = Some(Utc::now() - Duration::minutes(1));
        assert!(service.grant(expiring).await.is_ok());

        assert_eq!(service.list_for_user("usr_1").await.map(|rows| rows.len()).ok(), Some(0));
    }

    #[tokio::test]
    async fn revoking_an_unknown_grant_is_not_found() {
        let store = Arc::new(FakeStore::default());
        let service = service(&store);

        let result = service.revoke(404, "usr_admin").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
