use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};

use tessera_core::AppError;
use tessera_domain::{RolePermission, UserRole};

use crate::test_support::{FakeCache, FakeStore, permission_service};

#[tokio::test]
async fn effective_permissions_union_role_and_resource_sources() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("USER").await;
    store.seed_role_permission("USER", "transactions:read").await;
    store.seed_role_permission("USER", "budgets:read").await;
    store.seed_user_role("usr_1", "USER").await;
    store.resource_permissions.lock().await.push(resource_grant(
        900,
        "usr_1",
        "report",
        "rep_1",
        "export",
    ));

    let service = permission_service(&store, &cache);
    let effective = service.effective_permissions("usr_1").await;
    assert!(effective.is_ok());
    let effective = effective.unwrap_or_default();

    assert!(effective.role_permissions.contains("transactions:read"));
    assert!(effective.role_permissions.contains("budgets:read"));
    assert_eq!(effective.resource_permissions.len(), 1);

    let all = effective.all_permission_ids();
    assert!(all.contains("export"));
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn unknown_user_resolves_to_empty_sets_without_error() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    let service = permission_service(&store, &cache);

    let effective = service.effective_permissions("usr_nobody").await;
    assert!(effective.is_ok());
    let effective = effective.unwrap_or_default();
    assert!(effective.role_permissions.is_empty());
    assert!(effective.resource_permissions.is_empty());
    assert!(effective.delegations.is_empty());
}

#[tokio::test]
async fn repeated_reads_without_mutation_are_identical() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.grant_permission_ids("usr_1", &["transactions:read"]).await;

    let service = permission_service(&store, &cache);
    let first = service.effective_permissions("usr_1").await.unwrap_or_default();
    let second = service.effective_permissions("usr_1").await.unwrap_or_default();

    assert_eq!(first, second);
}

#[tokio::test]
async fn expired_assignment_stops_contributing_permissions() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_role("USER").await;
    store.seed_role_permission("USER", "transactions:read").await;
    store.user_roles.lock().await.push(UserRole {
        id: 901,
        user_id: "usr_1".to_owned(),
        role_id: "USER".to_owned(),
        organization_id: None,
        granted_at: Utc::now() - Duration::days(2),
        granted_by: "usr_seed".to_owned(),
        expires_at: Some(Utc::now() - Duration::days(1)),
        revoked_at: None,
        revoked_by: None,
    });

    let service = permission_service(&store, &cache);
    let effective = service.effective_permissions("usr_1").await.unwrap_or_default();

    assert!(effective.role_permissions.is_empty());
}

#[tokio::test]
async fn assign_role_creates_exactly_one_active_row() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("USER").await;
    store.grant_permission_ids("usr_admin", &["user-roles:assign-basic"]).await;

    let service = permission_service(&store, &cache);
    let assigned = service.assign_role("usr_1", "USER", "usr_admin").await;
    assert!(assigned.is_ok());

    let active: Vec<_> = store
        .user_roles
        .lock()
        .await
        .iter()
        .filter(|row| row.user_id == "usr_1" && row.role_id == "USER" && row.revoked_at.is_none())
        .cloned()
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].granted_by, "usr_admin");

    let duplicate = service.assign_role("usr_1", "USER", "usr_admin").await;
    assert!(matches!(
        duplicate,
        Err(AppError::DuplicateAssignment { user_id, role_id })
            if user_id == "usr_1" && role_id == "USER"
    ));
}

#[tokio::test]
async fn protected_role_is_locked_out_regardless_of_caller_permissions() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("SYSTEM_ADMIN").await;
    store
        .grant_permission_ids(
            "usr_admin",
            &["user-roles:assign-elevated", "user-roles:revoke"],
        )
        .await;

    let service = permission_service(&store, &cache);

    let assigned = service.assign_role("usr_1", "SYSTEM_ADMIN", "usr_admin").await;
    assert!(matches!(assigned, Err(AppError::ProtectedRole { .. })));

    let revoked = service.revoke_role("usr_1", "SYSTEM_ADMIN", "usr_admin").await;
    assert!(matches!(revoked, Err(AppError::ProtectedRole { .. })));
}

#[tokio::test]
async fn basic_granter_cannot_assign_elevated_role() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("MANAGER").await;
    store.grant_permission_ids("usr_admin", &["user-roles:assign-basic"]).await;

    let service = permission_service(&store, &cache);
    let result = service.assign_role("usr_1", "MANAGER", "usr_admin").await;

    assert!(matches!(
        result,
        Err(AppError::PermissionDenied { required, .. })
            if required == "user-roles:assign-elevated"
    ));
}

#[tokio::test]
async fn custom_role_is_governed_like_an_elevated_role() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("DATA_SCIENCE").await;
    store.grant_permission_ids("usr_admin", &["user-roles:assign-basic"]).await;

    let service = permission_service(&store, &cache);
    let result = service.assign_role("usr_1", "DATA_SCIENCE", "usr_admin").await;

    assert!(matches!(
        result,
        Err(AppError::PermissionDenied { required, .. })
            if required == "user-roles:assign-elevated"
    ));
}

#[tokio::test]
async fn assignment_targets_must_exist_and_be_undeleted() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_role("USER").await;
    store.grant_permission_ids("usr_admin", &["user-roles:assign-basic"]).await;

    let service = permission_service(&store, &cache);

    let missing_user = service.assign_role("usr_ghost", "USER", "usr_admin").await;
    assert!(matches!(missing_user, Err(AppError::NotFound { .. })));

    store.seed_user("usr_1").await;
    let missing_role = service.assign_role("usr_1", "AUDITOR", "usr_admin").await;
    assert!(matches!(missing_role, Err(AppError::NotFound { .. })));
}

#[tokio::test]
async fn revoke_requires_the_revoke_permission() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("USER").await;
    store.seed_user_role("usr_1", "USER").await;
    store.grant_permission_ids("usr_admin", &["user-roles:assign-elevated"]).await;

    let service = permission_service(&store, &cache);
    let result = service.revoke_role("usr_1", "USER", "usr_admin").await;

    assert!(matches!(
        result,
        Err(AppError::PermissionDenied { required, .. }) if required == "user-roles:revoke"
    ));
}

#[tokio::test]
async fn revoking_a_missing_assignment_is_not_found() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.grant_permission_ids("usr_admin", &["user-roles:revoke"]).await;

    let service = permission_service(&store, &cache);
    let result = service.revoke_role("usr_1", "USER", "usr_admin").await;

    assert!(matches!(result, Err(AppError::NotFound { .. })));
}

#[tokio::test]
async fn revocation_takes_effect_immediately_and_preserves_history() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("USER").await;
    store.seed_role_permission("USER", "transactions:read").await;
    store
        .grant_permission_ids(
            "SYSTEM",
            &["user-roles:assign-basic", "user-roles:revoke"],
        )
        .await;

    let service = permission_service(&store, &cache);

    let assigned = service.assign_role("usr_1", "USER", "SYSTEM").await;
    assert!(assigned.is_ok());
    let effective = service.effective_permissions("usr_1").await.unwrap_or_default();
    assert!(effective.role_permissions.contains("transactions:read"));

    let revoked = service.revoke_role("usr_1", "USER", "SYSTEM").await;
    assert!(revoked.is_ok());
    let after = service.effective_permissions("usr_1").await.unwrap_or_default();
    assert!(!after.role_permissions.contains("transactions:read"));

    let history: Vec<_> = store
        .user_roles
        .lock()
        .await
        .iter()
        .filter(|row| row.user_id == "usr_1" && row.role_id == "USER")
        .cloned()
        .collect();
    assert_eq!(history.len(), 1);
    assert!(history[0].revoked_at.is_some());
    assert_eq!(history[0].revoked_by.as_deref(), Some("SYSTEM"));
}

#[tokio::test]
async fn reassignment_after_revocation_inserts_a_new_row() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_user("usr_1").await;
    store.seed_role("USER").await;
    store
        .grant_permission_ids(
            "usr_admin",
            &["user-roles:assign-basic", "user-roles:revoke"],
        )
        .await;

    let service = permission_service(&store, &cache);
    assert!(service.assign_role("usr_1", "USER", "usr_admin").await.is_ok());
    assert!(service.revoke_role("usr_1", "USER", "usr_admin").await.is_ok());
    assert!(service.assign_role("usr_1", "USER", "usr_admin").await.is_ok());

    let rows: Vec<_> = store
        .user_roles
        .lock()
        .await
        .iter()
        .filter(|row| row.user_id == "usr_1" && row.role_id == "USER")
        .cloned()
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|row| row.revoked_at.is_none()).count(), 1);
}

#[tokio::test]
async fn point_in_time_honors_the_assignment_window() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    let now = Utc::now();
    store.seed_role_permission("USER", "transactions:read").await;
    store.user_roles.lock().await.push(UserRole {
        id: 902,
        user_id: "usr_1".to_owned(),
        role_id: "USER".to_owned(),
        organization_id: None,
        granted_at: now - Duration::hours(3),
        granted_by: "usr_seed".to_owned(),
        expires_at: None,
        revoked_at: Some(now - Duration::hours(1)),
        revoked_by: Some("usr_seed".to_owned()),
    });

    let service = permission_service(&store, &cache);

    let inside = service
        .permissions_at("usr_1", now - Duration::hours(2))
        .await
        .unwrap_or_default();
    assert!(inside.role_permissions.contains("transactions:read"));
    assert!(inside.delegations.is_empty());

    let before_grant = service
        .permissions_at("usr_1", now - Duration::hours(4))
        .await
        .unwrap_or_default();
    assert!(before_grant.role_permissions.is_empty());

    let after_revoke = service
        .permissions_at("usr_1", now - Duration::minutes(30))
        .await
        .unwrap_or_default();
    assert!(after_revoke.role_permissions.is_empty());
}

#[tokio::test]
async fn point_in_time_reads_only_currently_active_catalog_rows() {
    // A permission the role lost after the probed instant stays excluded,
    // because the catalog is reconstructed from rows active today.
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    let now = Utc::now();
    store.seed_user_role("usr_1", "USER").await;
    store.role_permissions.lock().await.push(RolePermission {
        id: 903,
        role_id: "USER".to_owned(),
        permission_id: "budgets:write".to_owned(),
        granted_at: now - Duration::days(7),
        granted_by: "usr_seed".to_owned(),
        revoked_at: Some(now - Duration::minutes(10)),
        revoked_by: Some("usr_seed".to_owned()),
    });

    let service = permission_service(&store, &cache);
    let reconstructed = service
        .permissions_at("usr_1", now - Duration::hours(2))
        .await
        .unwrap_or_default();

    assert!(!reconstructed.role_permissions.contains("budgets:write"));
}

#[tokio::test]
async fn flattened_ids_are_served_from_cache_once_populated() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.grant_permission_ids("usr_1", &["transactions:read"]).await;

    let service = permission_service(&store, &cache);

    let first = service.effective_permission_ids("usr_1").await.unwrap_or_default();
    assert!(first.contains("transactions:read"));

    // Mutate storage without invalidating; the cached set is returned as-is.
    store.role_permissions.lock().await.clear();
    let second = service.effective_permission_ids("usr_1").await.unwrap_or_default();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cache_failure_falls_back_to_storage() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    cache.fail.store(true, Ordering::Relaxed);
    store.grant_permission_ids("usr_1", &["transactions:read"]).await;

    let service = permission_service(&store, &cache);
    let ids = service.effective_permission_ids("usr_1").await;

    assert!(ids.is_ok());
    assert!(ids.unwrap_or_default().contains("transactions:read"));
}

#[tokio::test]
async fn user_roles_skips_soft_deleted_roles() {
    let store = Arc::new(FakeStore::default());
    let cache = Arc::new(FakeCache::default());
    store.seed_role("USER").await;
    store.seed_role("MANAGER").await;
    store.seed_user_role("usr_1", "USER").await;
    store.seed_user_role("usr_1", "MANAGER").await;
    if let Some(role) = store.roles.lock().await.get_mut("MANAGER") {
        role.mark_deleted("usr_admin", Utc::now());
    }

    let service = permission_service(&store, &cache);
    let roles = service.user_roles("usr_1").await.unwrap_or_default();

    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].id, "USER");
}

fn resource_grant(
    id: i64,
    user_id: &str,
    resource_type: &str,
    resource_id: &str,
    permission: &str,
) -> tessera_domain::ResourcePermission {
    tessera_domain::ResourcePermission {
        id,
        user_id: user_id.to_owned(),
        resource_type: resource_type.to_owned(),
        resource_id: resource_id.to_owned(),
        permission: permission.to_owned(),
        granted_at: Utc::now() - Duration::hours(1),
        granted_by: "usr_seed".to_owned(),
        expires_at: None,
        revoked_at: None,
        revoked_by: None,
        reason: None,
    }
}
