//! Cache-aside read path for tasks.
//!
//! A hit is served from the cache; a miss reads the store and populates the
//! cache for non-empty results only. Cache failures degrade latency, never
//! correctness: they count as misses and are logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::port_error_mapping::map_task_repository_error;
use super::ports::{
    CacheKey, TASKS_CACHE_TTL, TaskCache, TaskRepository, TasksQuery, UserTaskList,
};
use super::{Error, TaskItem, UserId};

/// Default [`TasksQuery`] implementation.
///
/// Reads and writes are not serialised against each other. A miss that reads
/// the store just before a concurrent write commits, and populates the cache
/// just after that write invalidated it, leaves a list without the new task
/// cached until the entry expires. Staleness is therefore bounded by the TTL,
/// not eliminated.
#[derive(Clone)]
pub struct TasksQueryService {
    repository: Arc<dyn TaskRepository>,
    cache: Arc<dyn TaskCache>,
    ttl: Duration,
}

impl TasksQueryService {
    /// Build the service with the standard ten minute cache lifetime.
    pub fn new(repository: Arc<dyn TaskRepository>, cache: Arc<dyn TaskCache>) -> Self {
        Self {
            repository,
            cache,
            ttl: TASKS_CACHE_TTL,
        }
    }

    /// Override the cache lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn read_cached(&self, key: &CacheKey) -> Option<Vec<TaskItem>> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%key, "task cache miss");
                return None;
            }
            Err(error) => {
                warn!(%key, %error, "task cache read failed; falling back to store");
                return None;
            }
        };

        match serde_json::from_str::<Vec<TaskItem>>(&raw) {
            Ok(tasks) => {
                debug!(%key, count = tasks.len(), "task cache hit");
                Some(tasks)
            }
            Err(error) => {
                warn!(%key, %error, "discarding undecodable task cache entry");
                if let Err(delete_error) = self.cache.delete(key).await {
                    warn!(%key, error = %delete_error, "task cache delete failed");
                }
                None
            }
        }
    }

    async fn populate(&self, key: &CacheKey, tasks: &[TaskItem]) {
        let encoded = match serde_json::to_string(tasks) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(%key, %error, "task list not cacheable");
                return;
            }
        };
        if let Err(error) = self.cache.set(key, &encoded, self.ttl).await {
            warn!(%key, %error, "task cache write failed");
        }
    }
}

#[async_trait]
impl TasksQuery for TasksQueryService {
    async fn tasks_for_user(&self, user_id: UserId) -> Result<UserTaskList, Error> {
        let key = CacheKey::tasks_for_user(user_id);
        if let Some(tasks) = self.read_cached(&key).await {
            return Ok(UserTaskList {
                tasks,
                cache_hit: true,
            });
        }

        let tasks = self
            .repository
            .find_by_user(user_id)
            .await
            .map_err(map_task_repository_error)?;
        if tasks.is_empty() {
            // Never cache an empty list; a later insert must be visible at once.
            return Err(Error::not_found(format!("No tasks found for UserId: {user_id}")));
        }

        self.populate(&key, &tasks).await;
        Ok(UserTaskList {
            tasks,
            cache_hit: false,
        })
    }

    async fn all_tasks(&self) -> Result<Vec<TaskItem>, Error> {
        self.repository
            .list_all()
            .await
            .map_err(map_task_repository_error)
    }
}
