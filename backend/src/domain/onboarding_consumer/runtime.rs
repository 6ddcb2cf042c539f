//! Runtime helpers for consumer retries and reconnects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{DeadLetterSink, EventSource, TaskRepository};

/// Async sleeping abstraction so retry paths run instantly under test.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    ///
    /// ```rust
    /// use taskboard::domain::BackoffJitter;
    /// use chrono::{TimeZone, Utc};
    /// use std::time::Duration;
    /// struct Fixed;
    /// impl BackoffJitter for Fixed {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32, _now: chrono::DateTime<chrono::Utc>) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt))
    ///     }
    /// }
    /// let now = Utc.with_ymd_and_hms(2026, 2, 26, 12, 0, 0).single().expect("valid time");
    /// assert_eq!(Fixed.jittered_delay(Duration::from_millis(100), 2, now), Duration::from_millis(102));
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Ports the consumer drives.
pub struct OnboardingConsumerPorts {
    /// Subscription to `users_queue`.
    pub source: Arc<dyn EventSource>,
    /// Task write path; wire the cache-invalidating repository here.
    pub tasks: Arc<dyn TaskRepository>,
    /// Destination for deliveries that exhausted their retries.
    pub dead_letters: Arc<dyn DeadLetterSink>,
}

impl OnboardingConsumerPorts {
    /// Build a port bundle.
    pub fn new(
        source: Arc<dyn EventSource>,
        tasks: Arc<dyn TaskRepository>,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            source,
            tasks,
            dead_letters,
        }
    }
}

/// Sleep and jitter implementations used between attempts.
pub struct OnboardingConsumerRuntime {
    pub sleeper: Arc<dyn RetrySleeper>,
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for OnboardingConsumerRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Default deterministic jitter strategy adding up to a quarter of the base.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % (max_extra.saturating_add(1));
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

/// Jittered delay before `attempt` (1-based), never longer than `max`.
pub(crate) fn backoff_delay(
    jitter: &dyn BackoffJitter,
    (initial, max): (Duration, Duration),
    attempt: u32,
    now: DateTime<Utc>,
) -> Duration {
    let base = retry_base_delay(initial, max, attempt);
    jitter.jittered_delay(base, attempt, now).min(max)
}

/// Exponential delay for `attempt` (1-based): `initial * 2^(attempt-1)`,
/// capped at `max`.
fn retry_base_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
    let base_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
}
