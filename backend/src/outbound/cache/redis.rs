//! Redis-backed `TaskCache` adapter.
//!
//! Values are stored as plain strings with `SET key value EX ttl`; expiry is
//! delegated to Redis. Connections come from a `bb8` pool so a slow Redis
//! cannot pile up unbounded connections.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis::AsyncCommands;
use tracing::debug;

use crate::domain::ports::{CacheKey, TaskCache, TaskCacheError};

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis cache for serialised task lists.
#[derive(Clone)]
pub struct RedisTaskCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisTaskCache {
    /// Build a connection pool against `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskCacheError::Backend`] when the URL is invalid or the
    /// pool cannot be built.
    pub async fn connect(redis_url: &str) -> Result<Self, TaskCacheError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|err| TaskCacheError::backend(format!("invalid redis url: {err}")))?;
        let pool = Pool::builder()
            .max_size(DEFAULT_POOL_SIZE)
            .connection_timeout(DEFAULT_CONNECTION_TIMEOUT)
            .build(manager)
            .await
            .map_err(|err| TaskCacheError::backend(format!("redis pool build failed: {err}")))?;
        Ok(Self { pool })
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, TaskCacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| TaskCacheError::backend(format!("redis checkout failed: {err}")))
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    // Redis rejects `EX 0`; round sub-second lifetimes up.
    ttl.as_secs().max(1)
}

#[async_trait]
impl TaskCache for RedisTaskCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, TaskCacheError> {
        let mut conn = self.connection().await?;
        let value = conn
            .get::<_, Option<String>>(key.as_str())
            .await
            .map_err(|err| TaskCacheError::backend(format!("redis GET failed: {err}")))?;
        debug!(key = %key, hit = value.is_some(), "task cache lookup");
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), TaskCacheError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key.as_str(), value, ttl_seconds(ttl))
            .await
            .map_err(|err| TaskCacheError::backend(format!("redis SET failed: {err}")))
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), TaskCacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key.as_str())
            .await
            .map_err(|err| TaskCacheError::backend(format!("redis DEL failed: {err}")))
    }
}
