//! Driving port for credential verification.
//!
//! Inbound adapters call it without knowing the backing store or the hashing
//! scheme, so handler tests can substitute a mock.

use async_trait::async_trait;

use crate::domain::{Error, LoginCredentials, User};

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the matching user.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error>;
}
