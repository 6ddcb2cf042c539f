//! Process-local repositories for running a service without PostgreSQL.

mod task_repository;
mod user_repository;

pub use task_repository::InMemoryTaskRepository;
pub use user_repository::InMemoryUserRepository;
