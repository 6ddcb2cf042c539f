//! `TaskRepository` backed by a mutex-guarded vector.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{TaskRepository, TaskRepositoryError};
use crate::domain::{NewTask, TaskItem, UserId};

#[derive(Default)]
struct State {
    tasks: Vec<TaskItem>,
    next_id: i32,
}

/// In-memory task store. Insertion order doubles as creation order.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    state: Mutex<State>,
}

impl InMemoryTaskRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, TaskRepositoryError> {
        self.state
            .lock()
            .map_err(|_| TaskRepositoryError::connection("in-memory task store poisoned"))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &NewTask) -> Result<TaskItem, TaskRepositoryError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let item = task.clone().into_item(state.next_id);
        state.tasks.push(item.clone());
        Ok(item)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<TaskItem>, TaskRepositoryError> {
        Ok(self.lock()?.tasks.clone())
    }
}
