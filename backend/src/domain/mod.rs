//! Domain primitives, services, and ports.
//!
//! Purpose: hold the business rules shared by the users and tasks services.
//! Adapters in `inbound` and `outbound` depend on this module; it depends on
//! nothing transport- or storage-specific.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - User, Registration, LoginCredentials: the users service model.
//! - TaskItem, NewTask: the tasks service model.
//! - Services implementing the driving ports in [`ports`].
//! - OnboardingConsumer: the background registration-event worker.

pub mod error;
mod invalidating_task_repository;
mod login_service;
pub mod onboarding_consumer;
mod port_error_mapping;
pub mod ports;
mod task;
mod task_command_service;
mod tasks_query_service;
mod trace_id;
mod user;
mod user_registration_service;
mod user_tasks_service;

pub use self::error::{Error, ErrorCode};
pub use self::invalidating_task_repository::InvalidatingTaskRepository;
pub use self::login_service::CredentialLoginService;
pub use self::onboarding_consumer::{
    AttemptJitter, BackoffJitter, ConsumerState, HandleOutcome, OnboardingConsumer,
    OnboardingConsumerConfig, OnboardingConsumerPorts, OnboardingConsumerRuntime, RetrySleeper,
    TokioSleeper, UserRegisteredHandler,
};
pub use self::task::{
    NewTask, ONBOARDING_TASK_DESCRIPTION, ONBOARDING_TASK_TITLE, TaskItem, TaskValidationError,
};
pub use self::task_command_service::TaskCommandService;
pub use self::tasks_query_service::TasksQueryService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    Email, LoginCredentials, NewUser, PasswordHash, Registration, USERNAME_MAX, User, UserId,
    UserValidationError, Username,
};
pub use self::user_registration_service::{UserRegistrationPorts, UserRegistrationService};
pub use self::user_tasks_service::UserTasksService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use taskboard::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
