//! Process-local event channel standing in for RabbitMQ.
//!
//! One [`InMemoryEventChannel`] plays every broker role: the users side
//! publishes into it, the onboarding consumer subscribes to it, and parked
//! bodies land in its dead-letter list. Clones share the same queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use user_events::UserRegisteredEvent;

use crate::domain::ports::{
    AckMode, DeadLetterSink, DeliveryHandle, EventPublishError, EventSource, EventSourceError,
    EventSubscription, InboundMessage, UserEventPublisher,
};

/// Body parked after the consumer gave up on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub body: Vec<u8>,
    pub reason: String,
}

#[derive(Default)]
struct Shared {
    ready: Mutex<VecDeque<(Vec<u8>, bool)>>,
    notify: Notify,
    dead_letters: Mutex<Vec<DeadLetter>>,
    unavailable: AtomicBool,
    published: AtomicUsize,
    acked: AtomicUsize,
    requeued: AtomicUsize,
}

impl Shared {
    fn ready(&self) -> MutexGuard<'_, VecDeque<(Vec<u8>, bool)>> {
        // A panicking holder cannot leave the deque half-updated.
        self.ready
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn dead_letters(&self) -> MutexGuard<'_, Vec<DeadLetter>> {
        self.dead_letters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push_back(&self, body: Vec<u8>) {
        self.ready().push_back((body, false));
        self.notify.notify_one();
    }

    fn push_front_redelivered(&self, body: Vec<u8>) {
        self.ready().push_front((body, true));
        self.notify.notify_one();
    }

    fn check_available(&self) -> Result<(), EventPublishError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventPublishError::unavailable("in-memory broker offline"));
        }
        Ok(())
    }
}

/// In-memory broker implementing the producer, consumer and dead-letter ports.
#[derive(Clone, Default)]
pub struct InMemoryEventChannel {
    shared: Arc<Shared>,
}

impl InMemoryEventChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an arbitrary body, bypassing event encoding.
    pub fn publish_raw(&self, body: impl Into<Vec<u8>>) {
        self.shared.push_back(body.into());
    }

    /// Make every publish and dead-letter call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Messages waiting for a consumer.
    pub fn pending(&self) -> usize {
        self.shared.ready().len()
    }

    /// Events accepted through [`UserEventPublisher::publish`].
    pub fn published_count(&self) -> usize {
        self.shared.published.load(Ordering::SeqCst)
    }

    /// Deliveries acknowledged by the consumer.
    pub fn acked_count(&self) -> usize {
        self.shared.acked.load(Ordering::SeqCst)
    }

    /// Deliveries returned to the queue.
    pub fn requeued_count(&self) -> usize {
        self.shared.requeued.load(Ordering::SeqCst)
    }

    /// Snapshot of parked bodies.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.shared.dead_letters().clone()
    }
}

#[async_trait]
impl UserEventPublisher for InMemoryEventChannel {
    async fn publish(&self, event: &UserRegisteredEvent) -> Result<(), EventPublishError> {
        self.shared.check_available()?;
        let body = event
            .encode()
            .map_err(|err| EventPublishError::rejected(err.to_string()))?;
        self.shared.published.fetch_add(1, Ordering::SeqCst);
        self.shared.push_back(body);
        Ok(())
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryEventChannel {
    async fn dead_letter(&self, body: &[u8], reason: &str) -> Result<(), EventPublishError> {
        self.shared.check_available()?;
        self.shared.dead_letters().push(DeadLetter {
            body: body.to_vec(),
            reason: reason.to_owned(),
        });
        Ok(())
    }
}

#[async_trait]
impl EventSource for InMemoryEventChannel {
    async fn subscribe(
        &self,
        ack_mode: AckMode,
    ) -> Result<Box<dyn EventSubscription>, EventSourceError> {
        Ok(Box::new(InMemorySubscription {
            shared: Arc::clone(&self.shared),
            ack_mode,
            closed: false,
        }))
    }
}

struct InMemorySubscription {
    shared: Arc<Shared>,
    ack_mode: AckMode,
    closed: bool,
}

#[async_trait]
impl EventSubscription for InMemorySubscription {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, EventSourceError>> {
        loop {
            if self.closed {
                return None;
            }
            let next = self.shared.ready().pop_front();
            if let Some((body, redelivered)) = next {
                let handle: Box<dyn DeliveryHandle> = match self.ack_mode {
                    AckMode::Auto => {
                        self.shared.acked.fetch_add(1, Ordering::SeqCst);
                        Box::new(AutoSettled)
                    }
                    AckMode::AfterPersist => Box::new(InMemoryDeliveryHandle {
                        shared: Arc::clone(&self.shared),
                        body: body.clone(),
                    }),
                };
                return Some(Ok(InboundMessage::new(body, redelivered, handle)));
            }
            self.shared.notify.notified().await;
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

struct InMemoryDeliveryHandle {
    shared: Arc<Shared>,
    body: Vec<u8>,
}

#[async_trait]
impl DeliveryHandle for InMemoryDeliveryHandle {
    async fn ack(&self) -> Result<(), EventSourceError> {
        self.shared.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn requeue(&self) -> Result<(), EventSourceError> {
        self.shared.requeued.fetch_add(1, Ordering::SeqCst);
        self.shared.push_front_redelivered(self.body.clone());
        Ok(())
    }
}

struct AutoSettled;

#[async_trait]
impl DeliveryHandle for AutoSettled {
    async fn ack(&self) -> Result<(), EventSourceError> {
        Ok(())
    }

    async fn requeue(&self) -> Result<(), EventSourceError> {
        Err(EventSourceError::acknowledge(
            "auto-acknowledged deliveries cannot be requeued",
        ))
    }
}
