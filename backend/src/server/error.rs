//! Failures raised while wiring a service at startup.

use crate::domain::ports::TaskCacheError;
use crate::outbound::persistence::{MigrationError, PoolError};
use crate::outbound::tasks_client::TasksClientBuildError;

/// Startup failure; the binaries report it and exit.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// A setting could not be interpreted.
    #[error("invalid configuration: {message}")]
    Config { message: String },
    /// Schema migrations did not apply.
    #[error(transparent)]
    Migration(#[from] MigrationError),
    /// The database pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The Redis cache could not be reached.
    #[error(transparent)]
    Cache(#[from] TaskCacheError),
    /// The tasks service client could not be built.
    #[error(transparent)]
    TasksClient(#[from] TasksClientBuildError),
}

impl StartupError {
    /// Create a configuration error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
