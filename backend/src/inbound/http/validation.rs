//! Validation error mapping shared by inbound HTTP handlers.

use serde_json::json;

use crate::domain::{Error, TaskValidationError, UserValidationError};

fn code_for(err: &UserValidationError) -> &'static str {
    match err {
        UserValidationError::NonPositiveId { .. } => "invalid_user_id",
        UserValidationError::EmptyUsername => "empty_username",
        UserValidationError::UsernameTooLong { .. } => "username_too_long",
        UserValidationError::EmptyEmail => "empty_email",
        UserValidationError::InvalidEmail => "invalid_email",
        UserValidationError::EmptyPassword => "empty_password",
    }
}

pub(crate) fn map_user_validation_error(err: UserValidationError) -> Error {
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": err.field(), "code": code_for(&err) }))
}

pub(crate) fn map_task_validation_error(err: TaskValidationError) -> Error {
    match err {
        TaskValidationError::EmptyTitle => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "title", "code": "empty_title" })),
    }
}
