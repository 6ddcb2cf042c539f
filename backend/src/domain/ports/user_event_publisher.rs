//! Producer-side port for the user registration event stream.
use async_trait::async_trait;
use user_events::UserRegisteredEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised while handing a message to the broker.
    pub enum EventPublishError {
        /// Broker connection or channel could not be used.
        Unavailable { message: String } => "event broker unavailable: {message}",
        /// The broker refused the message or the body could not be encoded.
        Rejected { message: String } => "event publish rejected: {message}",
    }
}

/// Publishes `UserRegisteredEvent`s onto the users queue.
///
/// Implementations declare the queue before every publish and use persistent
/// delivery. They never retry; callers decide what a failure means.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserEventPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: &UserRegisteredEvent) -> Result<(), EventPublishError>;
}

/// Destination for message bodies the consumer gave up on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Park `body` together with the reason processing failed.
    async fn dead_letter(&self, body: &[u8], reason: &str) -> Result<(), EventPublishError>;
}
