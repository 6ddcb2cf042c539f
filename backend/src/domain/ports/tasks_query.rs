//! Driving port for task reads.
use async_trait::async_trait;

use crate::domain::{Error, TaskItem, UserId};

/// Tasks of one user and whether they came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTaskList {
    pub tasks: Vec<TaskItem>,
    pub cache_hit: bool,
}

/// Read side of the tasks service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TasksQuery: Send + Sync {
    /// Tasks of `user_id`. Not found when the user has none.
    async fn tasks_for_user(&self, user_id: UserId) -> Result<UserTaskList, Error>;

    /// Every task in the store.
    async fn all_tasks(&self) -> Result<Vec<TaskItem>, Error>;
}
