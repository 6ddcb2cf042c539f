//! Validated cache key shared by cache adapters.
use thiserror::Error;

use crate::domain::UserId;

/// Key under which a cached value is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(CacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Key holding the serialised task list of one user: `tasks:user:{id}`.
    ///
    /// # Examples
    /// ```
    /// use taskboard::domain::UserId;
    /// use taskboard::domain::ports::CacheKey;
    ///
    /// let key = CacheKey::tasks_for_user(UserId::new(42).expect("positive id"));
    /// assert_eq!(key.as_str(), "tasks:user:42");
    /// ```
    pub fn tasks_for_user(user_id: UserId) -> Self {
        Self(format!("tasks:user:{user_id}"))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}
