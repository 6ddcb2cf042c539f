//! Read aggregator: a local user joined with their remote task list.
//!
//! One remote call per request, bounded by the gateway timeout and never
//! retried. The remote body is passed through untouched and never cached here.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::port_error_mapping::map_user_repository_error;
use super::ports::{TasksGateway, TasksGatewayError, UserRepository, UserTasks, UserTasksQuery};
use super::{Error, UserId};

/// Default [`UserTasksQuery`] implementation.
#[derive(Clone)]
pub struct UserTasksService {
    users: Arc<dyn UserRepository>,
    tasks: Arc<dyn TasksGateway>,
}

impl UserTasksService {
    /// Build the aggregator.
    pub fn new(users: Arc<dyn UserRepository>, tasks: Arc<dyn TasksGateway>) -> Self {
        Self { users, tasks }
    }
}

fn map_gateway_error(user_id: UserId, error: TasksGatewayError) -> Error {
    warn!(%user_id, %error, "remote task read failed");
    match error {
        TasksGatewayError::Timeout { .. } => Error::gateway_timeout("Tasks service timed out."),
        TasksGatewayError::Transport { .. } => {
            Error::upstream(None, "Tasks service is unreachable.")
        }
        TasksGatewayError::Status { status } => Error::upstream(Some(status), "Error fetching tasks")
            .with_details(json!({ "upstreamStatus": status })),
    }
}

#[async_trait]
impl UserTasksQuery for UserTasksService {
    async fn tasks_for_user(&self, user_id: UserId) -> Result<UserTasks, Error> {
        let user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(map_user_repository_error)?
            .ok_or_else(|| Error::not_found("User not found"))?;

        let tasks = self
            .tasks
            .fetch_tasks_for_user(user_id)
            .await
            .map_err(|error| map_gateway_error(user_id, error))?;

        Ok(UserTasks { user, tasks })
    }
}
