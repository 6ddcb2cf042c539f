//! Task data model owned by the tasks service.
//!
//! Tasks are never deleted. Each one belongs to a user identified by a
//! [`UserId`] that may live in the other service and is not checked here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Title given to the task created for every newly registered user.
pub const ONBOARDING_TASK_TITLE: &str = "Моя первая задача";

/// Description given to the task created for every newly registered user.
pub const ONBOARDING_TASK_DESCRIPTION: &str = "Задание №1: успешно выполнить свою первую задачу";

/// Validation errors raised while building tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
        }
    }
}

impl std::error::Error for TaskValidationError {}

/// Persisted task.
///
/// The serialised form is the read endpoint's body and the cached value:
/// `{id, createdDate, title, description, isCompleted, userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: i32,
    pub created_date: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub user_id: UserId,
}

/// Task awaiting insertion; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    user_id: UserId,
    title: String,
    description: Option<String>,
    is_completed: bool,
    created_date: DateTime<Utc>,
}

impl NewTask {
    /// Validate the title and build an open task.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use taskboard::domain::{NewTask, UserId};
    ///
    /// let owner = UserId::new(3).expect("positive id");
    /// let task = NewTask::new(owner, "Water plants", Utc::now()).expect("valid task");
    /// assert!(!task.is_completed());
    /// assert!(NewTask::new(owner, "  ", Utc::now()).is_err());
    /// ```
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        created_date: DateTime<Utc>,
    ) -> Result<Self, TaskValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(Self {
            user_id,
            title,
            description: None,
            is_completed: false,
            created_date,
        })
    }

    /// The fixed onboarding task for a freshly registered user.
    pub fn onboarding(user_id: UserId, created_date: DateTime<Utc>) -> Self {
        Self {
            user_id,
            title: ONBOARDING_TASK_TITLE.to_owned(),
            description: Some(ONBOARDING_TASK_DESCRIPTION.to_owned()),
            is_completed: false,
            created_date,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the completion flag.
    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }

    /// Owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Task title, never blank.
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Optional free-form description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Completion flag.
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Creation timestamp.
    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    /// Materialise the persisted task once the store has assigned `id`.
    pub fn into_item(self, id: i32) -> TaskItem {
        TaskItem {
            id,
            created_date: self.created_date,
            title: self.title,
            description: self.description,
            is_completed: self.is_completed,
            user_id: self.user_id,
        }
    }
}
