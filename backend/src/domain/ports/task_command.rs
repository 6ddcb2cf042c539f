//! Driving port for task writes.
use async_trait::async_trait;

use crate::domain::{Error, NewTask, TaskItem};

/// Write side of the tasks service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCommand: Send + Sync {
    /// Persist a task and return it with its identifier.
    async fn create(&self, task: NewTask) -> Result<TaskItem, Error>;
}
