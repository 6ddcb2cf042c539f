//! Shared wiring for the service integration tests.
//!
//! Both services are assembled exactly as the binaries assemble them, but on
//! top of the in-memory adapters, so handlers, domain services, and the
//! onboarding consumer run together without a broker, database, or cache
//! server.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use taskboard::domain::{OnboardingConsumerConfig, OnboardingConsumerRuntime};
use taskboard::inbound::http::health::HealthState;
use taskboard::inbound::http::state::{TasksHttpState, UsersHttpState};
use taskboard::outbound::cache::InMemoryTaskCache;
use taskboard::outbound::memory::{InMemoryTaskRepository, InMemoryUserRepository};
use taskboard::outbound::queue::InMemoryEventChannel;
use taskboard::outbound::security::BcryptPasswordHasher;
use taskboard::outbound::tasks_client::HttpTasksGateway;
use taskboard::server::{
    TasksAdapters, UsersAdapters, build_tasks_service_with_runtime, build_users_state,
};
use taskboard::test_support::onboarding::{ImmediateSleeper, MutableClock, NoJitter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// First identifier handed out by the users store in these tests.
pub const FIRST_USER_ID: i32 = 42;

/// Base URL that nothing listens on; reads through it fail fast.
pub const UNREACHABLE_TASKS_URL: &str = "http://127.0.0.1:9/api/v1";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
        .single()
        .expect("valid time")
}

pub fn health() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

/// Tasks service over in-memory adapters with its consumer running.
pub struct TasksHarness {
    pub repository: Arc<InMemoryTaskRepository>,
    pub cache: Arc<InMemoryTaskCache>,
    pub channel: InMemoryEventChannel,
    pub clock: Arc<MutableClock>,
    pub state: web::Data<TasksHttpState>,
    cancel: CancellationToken,
    consumer: JoinHandle<()>,
}

impl TasksHarness {
    /// Build the tasks service and start consuming from `channel`.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn start(channel: InMemoryEventChannel) -> Self {
        let clock = Arc::new(MutableClock::new(fixed_now()));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let repository = Arc::new(InMemoryTaskRepository::new());
        let cache = Arc::new(InMemoryTaskCache::new(Arc::clone(&shared_clock)));
        let adapters = TasksAdapters {
            repository: repository.clone(),
            cache: cache.clone(),
            events: Arc::new(channel.clone()),
            dead_letters: Arc::new(channel.clone()),
        };
        let runtime = OnboardingConsumerRuntime {
            sleeper: Arc::new(ImmediateSleeper),
            jitter: Arc::new(NoJitter),
        };
        let service = build_tasks_service_with_runtime(
            adapters,
            shared_clock,
            runtime,
            OnboardingConsumerConfig::default(),
        );

        let cancel = CancellationToken::new();
        let consumer = service.consumer.spawn(cancel.clone());
        Self {
            repository,
            cache,
            channel,
            clock,
            state: web::Data::new(service.state),
            cancel,
            consumer,
        }
    }

    /// Wait until the consumer has settled `count` deliveries.
    pub async fn wait_for_acks(&self, count: usize) {
        let channel = self.channel.clone();
        eventually(move || channel.acked_count() >= count).await;
    }

    /// Cancel the consumer and wait for it to close its subscription.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.consumer.await.expect("consumer task joins");
    }
}

/// Users service state publishing into `channel` and reading tasks from
/// `tasks_base_url`.
pub fn users_state(
    channel: &InMemoryEventChannel,
    tasks_base_url: &str,
    tasks_timeout: Duration,
) -> web::Data<UsersHttpState> {
    let gateway =
        HttpTasksGateway::new(tasks_base_url, tasks_timeout).expect("tasks gateway builds");
    let adapters = UsersAdapters {
        users: Arc::new(InMemoryUserRepository::starting_at(FIRST_USER_ID)),
        hasher: Arc::new(BcryptPasswordHasher::with_cost(4)),
        publisher: Arc::new(channel.clone()),
        tasks: Arc::new(gateway),
    };
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(fixed_now()));
    web::Data::new(build_users_state(adapters, clock))
}

/// Poll `probe` until it holds, failing the test after two seconds.
pub async fn eventually(probe: impl Fn() -> bool) {
    for _ in 0..200 {
        if probe() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within two seconds");
}
