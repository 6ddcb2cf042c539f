//! Service construction and middleware wiring for both binaries.

mod config;
mod error;
mod tasks;
mod users;

pub use config::{ServerConfig, TasksServiceSettings, UsersServiceSettings};
pub use error::StartupError;
pub use tasks::{
    TasksAdapters, TasksService, build_tasks_app, build_tasks_service,
    build_tasks_service_with_runtime, create_tasks_server,
};
pub use users::{UsersAdapters, build_users_app, build_users_state, create_users_server};
