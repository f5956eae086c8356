//! Redis-backed permission decision cache.
//!
//! Entry keys embed a global and a per-user generation counter. Flushing
//! bumps the global counter and invalidating a user bumps that user's
//! counter, so both are a single `INCR`; orphaned entries age out through
//! their ttl.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use wardkeep_application::PermissionCache;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::UserId;

/// Redis implementation of the permission cache port.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn global_generation_key(&self) -> String {
        format!("{}:generation", self.key_prefix)
    }

    fn user_generation_key(&self, user_id: UserId) -> String {
        format!("{}:user:{user_id}:generation", self.key_prefix)
    }

    fn entry_key(
        &self,
        global_generation: u64,
        user_id: UserId,
        user_generation: u64,
        permission: &str,
    ) -> String {
        format!(
            "{}:g{global_generation}:user:{user_id}:v{user_generation}:{permission}",
            self.key_prefix
        )
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn current_entry_key(
        &self,
        connection: &mut MultiplexedConnection,
        user_id: UserId,
        permission: &str,
    ) -> AppResult<String> {
        let generations: Vec<Option<u64>> = connection
            .mget(&[
                self.global_generation_key(),
                self.user_generation_key(user_id),
            ])
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to read permission cache generations: {error}"
                ))
            })?;

        let global_generation = generations.first().copied().flatten().unwrap_or(0);
        let user_generation = generations.get(1).copied().flatten().unwrap_or(0);
        Ok(self.entry_key(global_generation, user_id, user_generation, permission))
    }

    async fn bump(&self, key: String) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let _: i64 = connection.incr(key, 1).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to bump permission cache generation: {error}"
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get_decision(&self, user_id: UserId, permission: &str) -> AppResult<Option<bool>> {
        let mut connection = self.connection().await?;
        let key = self
            .current_entry_key(&mut connection, user_id, permission)
            .await?;

        let encoded: Option<String> = connection.get(key).await.map_err(|error| {
            AppError::Internal(format!("failed to read permission cache entry: {error}"))
        })?;

        encoded.as_deref().map(decode_decision).transpose()
    }

    async fn set_decision(
        &self,
        user_id: UserId,
        permission: &str,
        granted: bool,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let mut connection = self.connection().await?;
        let key = self
            .current_entry_key(&mut connection, user_id, permission)
            .await?;

        connection
            .set_ex(key, encode_decision(granted), u64::from(ttl_seconds))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write permission cache entry: {error}"))
            })
    }

    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        self.bump(self.user_generation_key(user_id)).await
    }

    async fn flush(&self) -> AppResult<()> {
        self.bump(self.global_generation_key()).await
    }
}

fn encode_decision(granted: bool) -> &'static str {
    if granted { "1" } else { "0" }
}

fn decode_decision(value: &str) -> AppResult<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(AppError::Internal(format!(
            "invalid permission cache value '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use wardkeep_domain::UserId;

    use super::{RedisPermissionCache, decode_decision, encode_decision};

    #[test]
    fn entry_keys_change_with_generations() {
        let Ok(client) = redis::Client::open("redis://127.0.0.1/") else {
            panic!("redis url should parse");
        };
        let cache = RedisPermissionCache::new(client, "wardkeep:permissions");
        let user_id = UserId::new();

        let before = cache.entry_key(0, user_id, 0, "view-billing");
        let after_user = cache.entry_key(0, user_id, 1, "view-billing");
        let after_flush = cache.entry_key(1, user_id, 0, "view-billing");

        assert_ne!(before, after_user);
        assert_ne!(before, after_flush);
        assert!(before.starts_with("wardkeep:permissions:"));
    }

    #[test]
    fn decisions_decode_strictly() {
        assert!(decode_decision(encode_decision(true)).is_ok_and(|granted| granted));
        assert!(decode_decision(encode_decision(false)).is_ok_and(|granted| !granted));
        assert!(decode_decision("yes").is_err());
    }
}
