//! Write-path decorator keeping the task cache coherent.
//!
//! Every task insert, whether it comes from the HTTP API or from the
//! onboarding consumer, goes through this wrapper. After the store commits it
//! deletes `tasks:user:{owner}` so the next read repopulates from the store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::ports::{CacheKey, TaskCache, TaskRepository, TaskRepositoryError};
use super::{NewTask, TaskItem, UserId};

/// [`TaskRepository`] that invalidates the owner's cache entry after writes.
#[derive(Clone)]
pub struct InvalidatingTaskRepository {
    inner: Arc<dyn TaskRepository>,
    cache: Arc<dyn TaskCache>,
}

impl InvalidatingTaskRepository {
    /// Wrap `inner` so writes clear entries in `cache`.
    pub fn new(inner: Arc<dyn TaskRepository>, cache: Arc<dyn TaskCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TaskRepository for InvalidatingTaskRepository {
    async fn create(&self, task: &NewTask) -> Result<TaskItem, TaskRepositoryError> {
        let created = self.inner.create(task).await?;
        let key = CacheKey::tasks_for_user(created.user_id);
        match self.cache.delete(&key).await {
            Ok(()) => debug!(%key, "task cache invalidated"),
            // The entry expires on its own; the write already committed.
            Err(error) => warn!(%key, %error, "task cache invalidation failed"),
        }
        Ok(created)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        self.inner.find_by_user(user_id).await
    }

    async fn list_all(&self) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        self.inner.list_all().await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{MockTaskCache, MockTaskRepository, TaskCacheError};
    use chrono::Utc;
    use rstest::rstest;

    fn new_task() -> NewTask {
        NewTask::new(UserId::new(8).expect("id"), "title", Utc::now()).expect("valid task")
    }

    #[rstest]
    #[tokio::test]
    async fn deletes_owner_key_after_commit() {
        let mut inner = MockTaskRepository::new();
        inner
            .expect_create()
            .times(1)
            .returning(|task| Ok(task.clone().into_item(11)));
        let mut cache = MockTaskCache::new();
        cache
            .expect_delete()
            .withf(|key| key.as_str() == "tasks:user:8")
            .times(1)
            .returning(|_| Ok(()));

        let repository = InvalidatingTaskRepository::new(Arc::new(inner), Arc::new(cache));
        let created = repository.create(&new_task()).await.expect("created");
        assert_eq!(created.id, 11);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_write_leaves_cache_alone() {
        let mut inner = MockTaskRepository::new();
        inner
            .expect_create()
            .returning(|_| Err(TaskRepositoryError::connection("down")));
        let mut cache = MockTaskCache::new();
        cache.expect_delete().never();

        let repository = InvalidatingTaskRepository::new(Arc::new(inner), Arc::new(cache));
        let err = repository.create(&new_task()).await.expect_err("write fails");
        assert_eq!(err, TaskRepositoryError::connection("down"));
    }

    #[rstest]
    #[tokio::test]
    async fn invalidation_failure_does_not_fail_write() {
        let mut inner = MockTaskRepository::new();
        inner
            .expect_create()
            .returning(|task| Ok(task.clone().into_item(12)));
        let mut cache = MockTaskCache::new();
        cache
            .expect_delete()
            .returning(|_| Err(TaskCacheError::backend("timeout")));

        let repository = InvalidatingTaskRepository::new(Arc::new(inner), Arc::new(cache));
        assert!(repository.create(&new_task()).await.is_ok());
    }
}
