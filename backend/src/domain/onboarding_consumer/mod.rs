//! Background consumer turning registrations into onboarding tasks.
//!
//! One consumer runs per tasks process on its own Tokio task. It owns the
//! subscription lifecycle (subscribe, reconnect with backoff, shutdown) and
//! the acknowledgement policy; [`UserRegisteredHandler`] owns the per-message
//! decode and write. Messages are handled strictly one at a time.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use mockable::Clock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    AckMode, DeadLetterSink, EventSource, EventSourceError, EventSubscription, InboundMessage,
};

mod handler;
mod runtime;

pub use handler::{HandleOutcome, UserRegisteredHandler};
pub(crate) use runtime::backoff_delay;
pub use runtime::{
    AttemptJitter, BackoffJitter, OnboardingConsumerPorts, OnboardingConsumerRuntime,
    RetrySleeper, TokioSleeper,
};

/// Consumer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingConsumerConfig {
    /// When deliveries are acknowledged.
    pub ack_mode: AckMode,
    /// Write attempts per message, including the first.
    pub handler_max_attempts: u32,
    /// First retry and reconnect delay.
    pub initial_backoff: Duration,
    /// Cap for retry and reconnect delays.
    pub max_backoff: Duration,
}

impl Default for OnboardingConsumerConfig {
    fn default() -> Self {
        Self {
            ack_mode: AckMode::AfterPersist,
            handler_max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Observable lifecycle of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Starting,
    DeclaringQueue,
    Subscribed,
    HandlingMessage,
    Stopping,
    Closed,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Starting => "starting",
            Self::DeclaringQueue => "declaring_queue",
            Self::Subscribed => "subscribed",
            Self::HandlingMessage => "handling_message",
            Self::Stopping => "stopping",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

enum DrainEnd {
    Cancelled,
    StreamEnded,
    StreamFailed(EventSourceError),
}

/// Long-lived consumer of `users_queue`.
pub struct OnboardingConsumer {
    source: Arc<dyn EventSource>,
    dead_letters: Arc<dyn DeadLetterSink>,
    handler: UserRegisteredHandler,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
    config: OnboardingConsumerConfig,
    state: watch::Sender<ConsumerState>,
}

impl OnboardingConsumer {
    /// Build a consumer using Tokio sleeps and the default jitter.
    pub fn new(
        ports: OnboardingConsumerPorts,
        clock: Arc<dyn Clock>,
        config: OnboardingConsumerConfig,
    ) -> Self {
        Self::with_runtime(ports, clock, OnboardingConsumerRuntime::default(), config)
    }

    /// Build a consumer with injected runtime abstractions.
    pub fn with_runtime(
        ports: OnboardingConsumerPorts,
        clock: Arc<dyn Clock>,
        runtime: OnboardingConsumerRuntime,
        config: OnboardingConsumerConfig,
    ) -> Self {
        let handler = UserRegisteredHandler::new(
            ports.tasks,
            Arc::clone(&clock),
            Arc::clone(&runtime.sleeper),
            Arc::clone(&runtime.jitter),
            config.handler_max_attempts,
            (config.initial_backoff, config.max_backoff),
        );
        let (state, _) = watch::channel(ConsumerState::Starting);
        Self {
            source: ports.source,
            dead_letters: ports.dead_letters,
            handler,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            config,
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Run on a dedicated Tokio task until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Consume until cancelled, reconnecting after broker failures.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut failures: u32 = 0;
        while !cancel.is_cancelled() {
            self.transition(ConsumerState::DeclaringQueue);
            let subscribed = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.source.subscribe(self.config.ack_mode) => result,
            };
            let mut subscription = match subscribed {
                Ok(subscription) => subscription,
                Err(error) => {
                    failures = failures.saturating_add(1);
                    warn!(%error, attempt = failures, "user event subscription failed");
                    if !self.wait_before_reconnect(&cancel, failures).await {
                        break;
                    }
                    continue;
                }
            };
            failures = 0;
            self.transition(ConsumerState::Subscribed);
            info!(ack_mode = %self.config.ack_mode, "consuming user events");

            match self.drain(subscription.as_mut(), &cancel).await {
                DrainEnd::Cancelled => {
                    self.transition(ConsumerState::Stopping);
                    subscription.close().await;
                    break;
                }
                DrainEnd::StreamEnded => {
                    warn!("user event stream ended; resubscribing");
                    subscription.close().await;
                    failures = failures.saturating_add(1);
                }
                DrainEnd::StreamFailed(error) => {
                    warn!(%error, "user event stream failed; resubscribing");
                    subscription.close().await;
                    failures = failures.saturating_add(1);
                }
            }
            if !self.wait_before_reconnect(&cancel, failures).await {
                break;
            }
        }
        if self.state() != ConsumerState::Stopping {
            self.transition(ConsumerState::Stopping);
        }
        self.transition(ConsumerState::Closed);
    }

    async fn drain(
        &self,
        subscription: &mut dyn EventSubscription,
        cancel: &CancellationToken,
    ) -> DrainEnd {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return DrainEnd::Cancelled,
                next = subscription.next_message() => next,
            };
            match next {
                None => return DrainEnd::StreamEnded,
                Some(Err(error)) => return DrainEnd::StreamFailed(error),
                Some(Ok(message)) => {
                    // Not raced against cancellation; the in-flight message finishes.
                    self.transition(ConsumerState::HandlingMessage);
                    self.process(message).await;
                    self.transition(ConsumerState::Subscribed);
                }
            }
        }
    }

    async fn process(&self, message: InboundMessage) {
        let outcome = AssertUnwindSafe(self.handler.handle(message.body()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(redelivered = message.redelivered(), "user event handler panicked");
                HandleOutcome::Failed {
                    reason: "handler panicked".to_owned(),
                    attempts: 1,
                }
            });

        if self.config.ack_mode == AckMode::Auto {
            if let HandleOutcome::Failed { reason, .. } = &outcome {
                warn!(%reason, "dropping user event; broker already considers it handled");
            }
            return;
        }

        match outcome {
            HandleOutcome::Persisted { .. } | HandleOutcome::Discarded { .. } => {
                acknowledge(&message).await;
            }
            HandleOutcome::Failed { reason, attempts } => {
                match self.dead_letters.dead_letter(message.body(), &reason).await {
                    Ok(()) => {
                        info!(%reason, attempts, "user event dead-lettered");
                        acknowledge(&message).await;
                    }
                    Err(error) => {
                        warn!(%error, "dead-lettering failed; requeueing delivery");
                        if let Err(requeue_error) = message.requeue().await {
                            warn!(error = %requeue_error, "requeue failed");
                        }
                    }
                }
            }
        }
    }

    async fn wait_before_reconnect(&self, cancel: &CancellationToken, attempt: u32) -> bool {
        let delay = backoff_delay(
            self.jitter.as_ref(),
            (self.config.initial_backoff, self.config.max_backoff),
            attempt,
            self.clock.utc(),
        );
        debug!(delay_ms = delay.as_millis(), attempt, "waiting before resubscribing");
        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = self.sleeper.sleep(delay) => true,
        }
    }

    fn transition(&self, next: ConsumerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "consumer state changed");
        }
    }
}

async fn acknowledge(message: &InboundMessage) {
    if let Err(error) = message.ack().await {
        warn!(%error, "user event acknowledgement failed");
    }
}
