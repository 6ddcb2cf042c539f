//! Port for the cache in front of the task read path.
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, define_port_error};

/// Lifetime of a cached task list.
pub const TASKS_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

define_port_error! {
    /// Errors surfaced by the caching adapter.
    pub enum TaskCacheError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "task cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization { message: String } => "task cache serialisation failed: {message}",
    }
}

/// Key/value cache holding serialised task lists.
///
/// The cache is never authoritative. Expired entries are never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCache: Send + Sync {
    /// Read the value stored under `key`, if present and not expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, TaskCacheError>;

    /// Store `value` under `key`, replacing any previous value and restarting
    /// the expiry clock.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), TaskCacheError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<(), TaskCacheError>;
}
