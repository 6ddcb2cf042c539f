//! `PasswordHasher` backed by bcrypt.
//!
//! Hashing is CPU bound, so both operations run on the blocking pool instead
//! of an actix worker thread.

use async_trait::async_trait;
use bcrypt::DEFAULT_COST;

use crate::domain::PasswordHash;
use crate::domain::ports::{PasswordHasher, PasswordHasherError};

/// Bcrypt hasher with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl BcryptPasswordHasher {
    /// Use `cost` rounds. Tests pass the bcrypt minimum of 4.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

fn join_error(err: tokio::task::JoinError) -> PasswordHasherError {
    PasswordHasherError::backend(format!("hashing task failed: {err}"))
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHasherError> {
        let password = password.to_owned();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(join_error)?
            .map_err(|err| PasswordHasherError::backend(err.to_string()))?;
        Ok(PasswordHash::new(hashed))
    }

    async fn verify(
        &self,
        password: &str,
        hash: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let password = password.to_owned();
        let hash = hash.as_str().to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(join_error)?
            .map_err(|err| PasswordHasherError::backend(err.to_string()))
    }
}
