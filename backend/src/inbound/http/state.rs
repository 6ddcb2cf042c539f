//! Shared HTTP adapter state.
//!
//! Handlers accept these bundles via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{LoginService, TaskCommand, TasksQuery, UserRegistration, UserTasksQuery};

/// Dependencies of the users service handlers.
#[derive(Clone)]
pub struct UsersHttpState {
    pub registration: Arc<dyn UserRegistration>,
    pub login: Arc<dyn LoginService>,
    pub user_tasks: Arc<dyn UserTasksQuery>,
}

/// Dependencies of the tasks service handlers.
#[derive(Clone)]
pub struct TasksHttpState {
    pub query: Arc<dyn TasksQuery>,
    pub command: Arc<dyn TaskCommand>,
    /// Stamps `createdDate` when a request omits it.
    pub clock: Arc<dyn Clock>,
}
