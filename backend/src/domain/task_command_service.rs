//! Task creation through the invalidating write path.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::port_error_mapping::map_task_repository_error;
use super::ports::{TaskCommand, TaskRepository};
use super::{Error, NewTask, TaskItem};

/// Default [`TaskCommand`] implementation.
///
/// Wire it with an [`super::InvalidatingTaskRepository`] so every write
/// clears the owner's cached task list.
#[derive(Clone)]
pub struct TaskCommandService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskCommandService {
    /// Build the service.
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl TaskCommand for TaskCommandService {
    async fn create(&self, task: NewTask) -> Result<TaskItem, Error> {
        let created = self
            .repository
            .create(&task)
            .await
            .map_err(map_task_repository_error)?;
        info!(task_id = created.id, user_id = %created.user_id, "task created");
        Ok(created)
    }
}
