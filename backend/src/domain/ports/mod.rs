//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_key;
mod event_subscription;
mod login_service;
mod password_hasher;
mod task_cache;
mod task_command;
mod task_repository;
mod tasks_gateway;
mod tasks_query;
mod user_event_publisher;
mod user_registration;
mod user_repository;
mod user_tasks_query;

pub use cache_key::{CacheKey, CacheKeyValidationError};
#[cfg(test)]
pub use event_subscription::MockDeliveryHandle;
pub use event_subscription::{
    AckMode, DeliveryHandle, EventSource, EventSourceError, EventSubscription, InboundMessage,
};
pub use login_service::LoginService;
#[cfg(test)]
pub use login_service::MockLoginService;
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHasher, PasswordHasherError};
#[cfg(test)]
pub use task_cache::MockTaskCache;
pub use task_cache::{TASKS_CACHE_TTL, TaskCache, TaskCacheError};
#[cfg(test)]
pub use task_command::MockTaskCommand;
pub use task_command::TaskCommand;
#[cfg(test)]
pub use task_repository::MockTaskRepository;
pub use task_repository::{TaskRepository, TaskRepositoryError};
#[cfg(test)]
pub use tasks_gateway::MockTasksGateway;
pub use tasks_gateway::{TasksGateway, TasksGatewayError};
#[cfg(test)]
pub use tasks_query::MockTasksQuery;
pub use tasks_query::{TasksQuery, UserTaskList};
#[cfg(test)]
pub use user_event_publisher::{MockDeadLetterSink, MockUserEventPublisher};
pub use user_event_publisher::{DeadLetterSink, EventPublishError, UserEventPublisher};
#[cfg(test)]
pub use user_registration::MockUserRegistration;
pub use user_registration::UserRegistration;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
#[cfg(test)]
pub use user_tasks_query::MockUserTasksQuery;
pub use user_tasks_query::{UserTasks, UserTasksQuery};
