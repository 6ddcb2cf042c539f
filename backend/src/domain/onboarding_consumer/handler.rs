//! Per-delivery handling of `UserRegistered` events.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{info, warn};
use user_events::UserRegisteredEvent;

use crate::domain::ports::TaskRepository;
use crate::domain::{NewTask, UserId};

use super::runtime::{BackoffJitter, RetrySleeper, backoff_delay};

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The onboarding task was written.
    Persisted { task_id: i32, attempts: u32 },
    /// The body was not a usable event; it must not be retried.
    Discarded { reason: String },
    /// Persistence kept failing until attempts ran out.
    Failed { reason: String, attempts: u32 },
}

/// Creates the onboarding task for one registration event.
///
/// Holds no per-message state; every call is a fresh decode and write.
pub struct UserRegisteredHandler {
    tasks: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl UserRegisteredHandler {
    pub(crate) fn new(
        tasks: Arc<dyn TaskRepository>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn RetrySleeper>,
        jitter: Arc<dyn BackoffJitter>,
        max_attempts: u32,
        backoff: (Duration, Duration),
    ) -> Self {
        Self {
            tasks,
            clock,
            sleeper,
            jitter,
            max_attempts: max_attempts.max(1),
            initial_backoff: backoff.0,
            max_backoff: backoff.1,
        }
    }

    /// Decode `body` and persist the onboarding task for its user.
    pub async fn handle(&self, body: &[u8]) -> HandleOutcome {
        let event = match UserRegisteredEvent::decode(body) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, body_len = body.len(), "discarding malformed user event");
                return HandleOutcome::Discarded {
                    reason: error.to_string(),
                };
            }
        };
        let user_id = match UserId::new(event.id) {
            Ok(user_id) => user_id,
            Err(error) => {
                warn!(%error, "discarding user event with invalid id");
                return HandleOutcome::Discarded {
                    reason: error.to_string(),
                };
            }
        };

        let task = NewTask::onboarding(user_id, self.clock.utc());
        let mut attempt = 1;
        loop {
            match self.tasks.create(&task).await {
                Ok(created) => {
                    info!(%user_id, task_id = created.id, attempt, "onboarding task created");
                    return HandleOutcome::Persisted {
                        task_id: created.id,
                        attempts: attempt,
                    };
                }
                Err(error) if attempt < self.max_attempts => {
                    warn!(%user_id, %error, attempt, "onboarding task write failed; retrying");
                    let delay = backoff_delay(
                        self.jitter.as_ref(),
                        (self.initial_backoff, self.max_backoff),
                        attempt,
                        self.clock.utc(),
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(%user_id, %error, attempt, "onboarding task write exhausted retries");
                    return HandleOutcome::Failed {
                        reason: error.to_string(),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
