//! Outbound port used by the users service to read tasks remotely.
use async_trait::async_trait;
use serde_json::value::RawValue;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Failures of the remote task read.
    pub enum TasksGatewayError {
        /// No response arrived within the configured timeout.
        Timeout { message: String } => "tasks service timed out: {message}",
        /// The request could not be sent or the response could not be read.
        Transport { message: String } => "tasks service unreachable: {message}",
        /// The tasks service answered with a non-success status.
        Status { status: u16 } => "tasks service answered {status}",
    }
}

/// Reads one user's tasks from the tasks service.
///
/// A single attempt with a bounded timeout; implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TasksGateway: Send + Sync {
    /// Fetch the task list body for `user_id`, left opaque.
    async fn fetch_tasks_for_user(&self, user_id: UserId)
    -> Result<Box<RawValue>, TasksGatewayError>;
}
