//! Registration use-case: store the user, then announce it.
//!
//! The announcement is fire-and-forget. A lost event leaves the user without
//! an onboarding task but never fails the registration.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};
use user_events::UserRegisteredEvent;

use super::port_error_mapping::{
    email_taken, map_hasher_error, map_user_repository_error,
};
use super::ports::{
    PasswordHasher, UserEventPublisher, UserRegistration, UserRepository, UserRepositoryError,
};
use super::{Error, NewUser, Registration, User};

/// Driven ports the registration service depends on.
pub struct UserRegistrationPorts {
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub publisher: Arc<dyn UserEventPublisher>,
}

/// Default [`UserRegistration`] implementation.
pub struct UserRegistrationService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    publisher: Arc<dyn UserEventPublisher>,
    clock: Arc<dyn Clock>,
}

impl UserRegistrationService {
    /// Build the service from its ports and a clock stamping events.
    pub fn new(ports: UserRegistrationPorts, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: ports.users,
            hasher: ports.hasher,
            publisher: ports.publisher,
            clock,
        }
    }

    async fn announce(&self, user: &User) {
        let event = UserRegisteredEvent::new(user.id().get(), user.email().as_str(), self.clock.utc());
        match self.publisher.publish(&event).await {
            Ok(()) => info!(user_id = %user.id(), "user registration event published"),
            Err(error) => warn!(
                user_id = %user.id(),
                %error,
                "user registration event not published; onboarding task will be missing"
            ),
        }
    }
}

#[async_trait]
impl UserRegistration for UserRegistrationService {
    async fn register(&self, registration: &Registration) -> Result<User, Error> {
        let existing = self
            .users
            .find_by_email(registration.email())
            .await
            .map_err(map_user_repository_error)?;
        if existing.is_some() {
            return Err(email_taken(registration.email().as_str()));
        }

        let password_hash = self
            .hasher
            .hash(registration.password())
            .await
            .map_err(map_hasher_error)?;
        let new_user = NewUser {
            username: registration.username().clone(),
            email: registration.email().clone(),
            password_hash,
        };

        let user = match self.users.create(&new_user).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email.
            Err(UserRepositoryError::DuplicateEmail { email }) => return Err(email_taken(&email)),
            Err(error) => return Err(map_user_repository_error(error)),
        };
        info!(user_id = %user.id(), "user registered");

        self.announce(&user).await;
        Ok(user)
    }
}
