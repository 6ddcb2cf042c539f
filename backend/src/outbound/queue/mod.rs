//! Message queue adapters for the user registration event stream.
//!
//! [`amqp`] talks AMQP 0.9.1 to RabbitMQ through `lapin`; [`memory`] is a
//! process-local channel used for local runs and tests.

mod amqp;
mod memory;

pub use amqp::{AmqpDeadLetterSink, AmqpEventSource, AmqpUserEventPublisher};
pub use memory::{DeadLetter, InMemoryEventChannel};
