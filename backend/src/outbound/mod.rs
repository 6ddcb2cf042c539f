//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **cache**: Redis and in-memory task list caches
//! - **queue**: RabbitMQ and in-memory event channels
//! - **tasks_client**: HTTP client for the tasks service
//! - **memory**: in-memory repositories for database-free runs
//! - **security**: password hashing
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod memory;
pub mod persistence;
pub mod queue;
pub mod security;
pub mod tasks_client;
