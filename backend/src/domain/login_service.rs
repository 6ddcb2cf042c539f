//! Credential verification against stored password hashes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::port_error_mapping::{map_hasher_error, map_user_repository_error};
use super::ports::{LoginService, PasswordHasher, UserRepository};
use super::{Email, Error, LoginCredentials, User};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// [`LoginService`] backed by the user store and a password hasher.
#[derive(Clone)]
pub struct CredentialLoginService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialLoginService {
    /// Build the service.
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl LoginService for CredentialLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let Ok(email) = Email::new(credentials.email()) else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_user_repository_error)?
        else {
            debug!("login attempt for unknown email");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let matches = self
            .hasher
            .verify(credentials.password(), user.password_hash())
            .await
            .map_err(map_hasher_error)?;
        if !matches {
            debug!(user_id = %user.id(), "login attempt with wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        Ok(user)
    }
}
