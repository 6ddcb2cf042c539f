//! PostgreSQL persistence adapters built on Diesel.
//!
//! Row structs and the schema stay private to this module; repositories
//! translate rows into validated domain types.

mod diesel_basic_error_mapping;
mod diesel_task_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_task_repository::DieselTaskRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, Schema, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
