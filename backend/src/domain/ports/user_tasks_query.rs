//! Driving port for the cross-service user/tasks read.
use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::domain::{Error, User, UserId};

/// A local user together with the tasks body returned by the tasks service.
#[derive(Debug, Clone, Serialize)]
pub struct UserTasks {
    pub user: User,
    pub tasks: Box<RawValue>,
}

/// Joins a local user with their remote task list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserTasksQuery: Send + Sync {
    /// Look up `user_id` locally, then fetch their tasks remotely.
    async fn tasks_for_user(&self, user_id: UserId) -> Result<UserTasks, Error>;
}
