//! Consumer-side port for the user registration event stream.
//!
//! The onboarding consumer drives these traits; AMQP and in-memory adapters
//! implement them. Acknowledgement is an explicit step so the consumer decides
//! when a message counts as handled.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by the subscription adapter.
    pub enum EventSourceError {
        /// Connecting, declaring the queue or subscribing failed.
        Connect { message: String } => "event source connect failed: {message}",
        /// The delivery stream broke after subscribing.
        Stream { message: String } => "event stream failed: {message}",
        /// Acknowledging or rejecting a delivery failed.
        Acknowledge { message: String } => "event acknowledgement failed: {message}",
    }
}

/// When a delivery counts as handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    /// The broker forgets the message as soon as it is delivered. A crash
    /// before persistence loses the side effect.
    Auto,
    /// The consumer acknowledges only after the side effect is stored or the
    /// body has been dead-lettered.
    #[default]
    AfterPersist,
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::AfterPersist => f.write_str("after_persist"),
        }
    }
}

impl FromStr for AckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "after_persist" | "after-persist" | "manual" => Ok(Self::AfterPersist),
            other => Err(format!("unknown ack mode: {other}")),
        }
    }
}

/// Settles one delivery with the broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryHandle: Send + Sync {
    /// Mark the delivery as handled.
    async fn ack(&self) -> Result<(), EventSourceError>;

    /// Return the delivery to the queue for another attempt.
    async fn requeue(&self) -> Result<(), EventSourceError>;
}

/// A raw message taken off the queue.
pub struct InboundMessage {
    body: Vec<u8>,
    redelivered: bool,
    handle: Box<dyn DeliveryHandle>,
}

impl InboundMessage {
    /// Wrap a delivery body and the handle used to settle it.
    pub fn new(body: Vec<u8>, redelivered: bool, handle: Box<dyn DeliveryHandle>) -> Self {
        Self {
            body,
            redelivered,
            handle,
        }
    }

    /// Raw message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the broker has delivered this message before.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Settle the delivery as handled.
    pub async fn ack(&self) -> Result<(), EventSourceError> {
        self.handle.ack().await
    }

    /// Return the delivery to the queue.
    pub async fn requeue(&self) -> Result<(), EventSourceError> {
        self.handle.requeue().await
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("body_len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}

/// An active subscription yielding deliveries one at a time.
#[async_trait]
pub trait EventSubscription: Send {
    /// Wait for the next delivery. `None` means the broker closed the stream.
    async fn next_message(&mut self) -> Option<Result<InboundMessage, EventSourceError>>;

    /// Cancel the subscription and release the channel.
    async fn close(&mut self);
}

/// Opens subscriptions on the users queue.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Connect, declare the queue idempotently and start consuming.
    async fn subscribe(
        &self,
        ack_mode: AckMode,
    ) -> Result<Box<dyn EventSubscription>, EventSourceError>;
}
