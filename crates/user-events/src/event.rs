//! The `UserRegisteredEvent` message body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventCodecError;
use crate::timestamp;

/// Notification that a user account has been committed by the users service.
///
/// Serialised as `{"Id": int, "Email": string, "CreatedAt": ISO-8601}`. The
/// event is immutable once built; consumers may receive it zero or more times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRegisteredEvent {
    /// Identifier assigned to the user by the users service store.
    pub id: i32,
    /// Email address the user registered with.
    pub email: String,
    /// Moment the user row was created.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl UserRegisteredEvent {
    /// Build an event for a freshly committed user.
    #[must_use]
    pub fn new(id: i32, email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email: email.into(),
            created_at,
        }
    }

    /// Serialise the event as the UTF-8 JSON message body.
    ///
    /// # Errors
    ///
    /// Returns [`EventCodecError::Encode`] when serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, EventCodecError> {
        serde_json::to_vec(self).map_err(|err| EventCodecError::Encode {
            message: err.to_string(),
        })
    }

    /// Decode a raw message body.
    ///
    /// # Errors
    ///
    /// Returns [`EventCodecError::NotUtf8`] for non UTF-8 bodies,
    /// [`EventCodecError::Malformed`] for JSON that does not match the event
    /// shape, and [`EventCodecError::InvalidId`] when `Id` is not positive.
    pub fn decode(body: &[u8]) -> Result<Self, EventCodecError> {
        let text = std::str::from_utf8(body).map_err(|err| EventCodecError::NotUtf8 {
            message: err.to_string(),
        })?;
        let event: Self =
            serde_json::from_str(text).map_err(|err| EventCodecError::Malformed {
                message: err.to_string(),
            })?;
        if event.id <= 0 {
            return Err(EventCodecError::InvalidId { id: event.id });
        }
        Ok(event)
    }
}
