//! Wire contract for the user registration event stream.
//!
//! The users service publishes one [`UserRegisteredEvent`] per successful
//! registration onto the `users_queue` queue; the tasks service consumes it to
//! materialise default state for the new account. Both sides depend on this
//! crate so the JSON body shape and the queue declaration flags cannot drift.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use user_events::{UserRegisteredEvent, USERS_QUEUE};
//!
//! let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
//! let event = UserRegisteredEvent::new(42, "a@b.com", created_at);
//! let body = event.encode().expect("event encodes");
//!
//! assert_eq!(USERS_QUEUE.name(), "users_queue");
//! assert_eq!(UserRegisteredEvent::decode(&body).expect("event decodes"), event);
//! ```

mod error;
mod event;
mod timestamp;
mod topology;

pub use error::EventCodecError;
pub use event::UserRegisteredEvent;
pub use topology::{CONTENT_TYPE_JSON, QueueTopology, USERS_DEAD_LETTER_QUEUE, USERS_QUEUE};
