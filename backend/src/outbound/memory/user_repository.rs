//! `UserRepository` backed by a mutex-guarded vector.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{Email, NewUser, User, UserId};

#[derive(Default)]
struct State {
    users: Vec<User>,
    next_id: i32,
}

/// In-memory user store enforcing email uniqueness like the database index.
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: Mutex<State>,
}

impl InMemoryUserRepository {
    /// Create an empty store; the first user gets id 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose next assigned id is `next_id`.
    pub fn starting_at(next_id: i32) -> Self {
        Self {
            state: Mutex::new(State {
                users: Vec::new(),
                next_id: next_id - 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, UserRepositoryError> {
        self.state
            .lock()
            .map_err(|_| UserRepositoryError::connection("in-memory user store poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|existing| existing.email() == &user.email) {
            return Err(UserRepositoryError::duplicate_email(user.email.as_str()));
        }
        state.next_id += 1;
        let id = UserId::new(state.next_id)
            .map_err(|err| UserRepositoryError::query(err.to_string()))?;
        let stored = User::new(
            id,
            user.username.clone(),
            user.email.clone(),
            user.password_hash.clone(),
        );
        state.users.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.lock()?.users.iter().find(|user| user.id() == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.email() == email)
            .cloned())
    }
}
