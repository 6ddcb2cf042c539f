//! Driving port for account registration.
use async_trait::async_trait;

use crate::domain::{Error, Registration, User};

/// Registers users and announces them to other services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistration: Send + Sync {
    /// Store a new user and return it.
    ///
    /// Fails with an invalid-request error when the email is taken. Once the
    /// user is committed the call succeeds even if the announcement is lost.
    async fn register(&self, registration: &Registration) -> Result<User, Error>;
}
