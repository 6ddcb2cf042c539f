//! Shared mapping from driven-port failures to domain errors.

use serde_json::json;

use super::Error;
use super::ports::{PasswordHasherError, TaskRepositoryError, UserRepositoryError};

pub(crate) fn map_user_repository_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => Error::service_unavailable(message),
        UserRepositoryError::Query { message } => Error::internal(message),
        UserRepositoryError::DuplicateEmail { email } => email_taken(&email),
    }
}

pub(crate) fn map_task_repository_error(error: TaskRepositoryError) -> Error {
    match error {
        TaskRepositoryError::Connection { message } => Error::service_unavailable(message),
        TaskRepositoryError::Query { message } => Error::internal(message),
    }
}

pub(crate) fn map_hasher_error(error: PasswordHasherError) -> Error {
    Error::internal(error.to_string())
}

pub(crate) fn email_taken(email: &str) -> Error {
    Error::invalid_request("Email already exists.")
        .with_details(json!({ "field": "email", "code": "email_taken", "email": email }))
}
