//! Port abstraction for task persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{NewTask, TaskItem, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by task repository adapters.
    pub enum TaskRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "task repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "task repository query failed: {message}",
    }
}

/// Entity store for tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a task and return it with its store-assigned identifier.
    async fn create(&self, task: &NewTask) -> Result<TaskItem, TaskRepositoryError>;

    /// All tasks owned by `user_id`, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<TaskItem>, TaskRepositoryError>;

    /// Every task in the store, oldest first.
    async fn list_all(&self) -> Result<Vec<TaskItem>, TaskRepositoryError>;
}
