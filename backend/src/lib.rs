//! Users and tasks services joined by a registration event queue.
//!
//! The users service owns accounts and publishes one event per
//! registration; the tasks service owns tasks, consumes those events to
//! create an onboarding task, and caches per-user task lists in front of
//! its store.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use domain::TraceId;
pub use middleware::Trace;
