//! In-memory permission cache for tests and local development.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use tessera_application::PermissionCache;
use tessera_core::AppResult;

/// Process-local cache of flattened permission-id sets with lazy expiry.
#[derive(Debug, Default)]
pub struct InMemoryPermissionCache {
    entries: RwLock<HashMap<String, (BTreeSet<String>, Instant)>>,
}

impl InMemoryPermissionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, user_id: &str) -> AppResult<Option<BTreeSet<String>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(user_id).and_then(|(permissions, expires_at)| {
            (*expires_at > Instant::now()).then(|| permissions.clone())
        }))
    }

    async fn put(
        &self,
        user_id: &str,
        permissions: &BTreeSet<String>,
        ttl: Duration,
    ) -> AppResult<()> {
        if permissions.is_empty() {
            return Ok(());
        }

        self.entries.write().await.insert(
            user_id.to_owned(),
            (permissions.clone(), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> AppResult<()> {
        self.entries.write().await.remove(user_id);
        Ok(())
    }
}
