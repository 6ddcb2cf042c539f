//! Embedded schema migrations for the two service databases.
//!
//! Migrations run on a synchronous `PgConnection` inside `spawn_blocking`
//! before the HTTP server starts accepting traffic.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

const USERS_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/users");
const TASKS_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/tasks");

/// Errors raised while applying migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("migration connection failed: {message}")]
    Connection { message: String },
    /// A migration failed to apply.
    #[error("migration failed: {message}")]
    Apply { message: String },
}

/// Which service schema to migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Users,
    Tasks,
}

impl Schema {
    fn migrations(self) -> EmbeddedMigrations {
        match self {
            Self::Users => USERS_MIGRATIONS,
            Self::Tasks => TASKS_MIGRATIONS,
        }
    }
}

/// Apply all pending migrations for `schema` against `database_url`.
pub async fn run_migrations(database_url: &str, schema: Schema) -> Result<(), MigrationError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || apply_blocking(&url, schema))
        .await
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?
}

fn apply_blocking(database_url: &str, schema: Schema) -> Result<(), MigrationError> {
    let mut conn =
        PgConnection::establish(database_url).map_err(|err| MigrationError::Connection {
            message: err.to_string(),
        })?;
    let applied = conn
        .run_pending_migrations(schema.migrations())
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    info!(?schema, applied = applied.len(), "database migrations applied");
    Ok(())
}
