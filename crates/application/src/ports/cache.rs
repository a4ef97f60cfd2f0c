use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;

use tessera_core::AppResult;

/// Cache port for flattened effective permission-id sets.
///
/// The cache is a performance layer only: callers must produce correct
/// results when it is absent, empty, or failing, and must never propagate
/// its errors as their own.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns the cached permission-id set for a user, if present.
    async fn get(&self, user_id: &str) -> AppResult<Option<BTreeSet<String>>>;

    /// Stores the permission-id set for a user with the given time to live.
    async fn put(
        &self,
        user_id: &str,
        permissions: &BTreeSet<String>,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Drops the cached entry for a user and broadcasts the invalidation to
    /// other service instances.
    async fn invalidate(&self, user_id: &str) -> AppResult<()>;
}
