//! Errors raised while encoding or decoding event bodies.

use thiserror::Error;

/// Failure to turn a message body into a [`crate::UserRegisteredEvent`] or back.
///
/// Consumers treat every decode variant as a poison message: it is logged and
/// acknowledged, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventCodecError {
    /// The body is not valid UTF-8.
    #[error("event body is not valid UTF-8: {message}")]
    NotUtf8 {
        /// Description of the invalid byte sequence.
        message: String,
    },

    /// The body is not JSON of the expected shape.
    #[error("event body is malformed: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The event names a non-positive user identifier.
    #[error("event user id must be positive, got {id}")]
    InvalidId {
        /// Identifier carried by the rejected event.
        id: i32,
    },

    /// The event could not be serialised.
    #[error("event could not be encoded: {message}")]
    Encode {
        /// Description of the serialisation failure.
        message: String,
    },
}
