//! Redis-backed permission cache with pub/sub invalidation.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use tessera_application::PermissionCache;
use tessera_core::{AppError, AppResult};

/// Channel other service instances subscribe to for invalidations.
const INVALIDATION_CHANNEL: &str = "permission-invalidation";

/// Redis implementation of the permission cache port.
///
/// Permission-id sets live under `permissions:{user_id}` as set members.
/// Invalidation deletes the key and publishes the user id so every other
/// instance drops its local state too.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            key_prefix: "permissions".to_owned(),
        }
    }

    fn key_for(&self, user_id: &str) -> String {
        format!("{}:{user_id}", self.key_prefix)
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, user_id: &str) -> AppResult<Option<BTreeSet<String>>> {
        let key = self.key_for(user_id);
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Storage(format!("failed to connect to redis: {error}")))?;

        let members: Vec<String> = connection.smembers(key).await.map_err(|error| {
            AppError::Storage(format!("failed to read permission cache entry: {error}"))
        })?;

        if members.is_empty() {
            return Ok(None);
        }

        Ok(Some(members.into_iter().collect()))
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

        let key = self.key_for(user_id);
        let members: Vec<&str> = permissions.iter().map(String::as_str).collect();
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Storage(format!("failed to connect to redis: {error}")))?;

        let _: () = connection.sadd(key.as_str(), members).await.map_err(|error| {
            AppError::Storage(format!("failed to write permission cache entry: {error}"))
        })?;
        let _: () = connection.expire(key.as_str(), ttl_seconds).await.map_err(|error| {
            AppError::Storage(format!("failed to expire permission cache entry: {error}"))
        })?;

        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> AppResult<()> {
        let key = self.key_for(user_id);
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Storage(format!("failed to connect to redis: {error}")))?;

        let _: () = connection.del(key).await.map_err(|error| {
            AppError::Storage(format!("failed to drop permission cache entry: {error}"))
        })?;
        let _: () = connection
            .publish(INVALIDATION_CHANNEL, user_id)
            .await
            .map_err(|error| {
                AppError::Storage(format!("failed to broadcast cache invalidation: {error}"))
            })?;

        Ok(())
    }
}
