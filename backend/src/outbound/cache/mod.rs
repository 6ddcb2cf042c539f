//! Cache adapters for the task read path.
//!
//! [`RedisTaskCache`] backs deployments; [`InMemoryTaskCache`] runs the
//! tasks service without Redis and drives the integration tests.

mod memory;
mod redis;

pub use memory::InMemoryTaskCache;
pub use redis::RedisTaskCache;
