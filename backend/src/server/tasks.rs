//! Tasks service wiring: adapters, onboarding consumer, HTTP state and
//! server.
//!
//! Every task write, from the API and from the consumer alike, goes through
//! one [`InvalidatingTaskRepository`] so the user's cached list is dropped
//! after each commit.

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::Clock;
use tracing::{info, warn};

use crate::Trace;
use crate::domain::ports::{DeadLetterSink, EventSource, TaskCache, TaskRepository};
use crate::domain::{
    InvalidatingTaskRepository, OnboardingConsumer, OnboardingConsumerConfig,
    OnboardingConsumerPorts, OnboardingConsumerRuntime, TaskCommandService, TasksQueryService,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::json_config;
use crate::inbound::http::state::TasksHttpState;
use crate::inbound::http::tasks::{create_task, list_tasks, tasks_for_user};
use crate::outbound::cache::{InMemoryTaskCache, RedisTaskCache};
use crate::outbound::memory::InMemoryTaskRepository;
use crate::outbound::persistence::{
    DbPool, DieselTaskRepository, PoolConfig, Schema, run_migrations,
};
use crate::outbound::queue::{AmqpDeadLetterSink, AmqpEventSource, InMemoryEventChannel};

use super::{ServerConfig, StartupError, TasksServiceSettings};

/// Driven adapters of the tasks service.
pub struct TasksAdapters {
    pub repository: Arc<dyn TaskRepository>,
    pub cache: Arc<dyn TaskCache>,
    pub events: Arc<dyn EventSource>,
    pub dead_letters: Arc<dyn DeadLetterSink>,
}

impl TasksAdapters {
    /// Select adapters from settings, migrating the database when one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when migrations, the pool or Redis cannot be
    /// set up.
    pub async fn from_settings(
        settings: &TasksServiceSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let repository: Arc<dyn TaskRepository> = match settings.database_url.as_deref() {
            Some(url) => {
                run_migrations(url, Schema::Tasks).await?;
                let pool = DbPool::new(PoolConfig::new(url)).await?;
                Arc::new(DieselTaskRepository::new(pool))
            }
            None => {
                warn!("no database configured; tasks are kept in memory");
                Arc::new(InMemoryTaskRepository::new())
            }
        };

        let cache: Arc<dyn TaskCache> = match settings.redis_url.as_deref() {
            Some(url) => Arc::new(RedisTaskCache::connect(url).await?),
            None => {
                warn!("no redis configured; task lists are cached in memory");
                Arc::new(InMemoryTaskCache::new(clock))
            }
        };

        let (events, dead_letters): (Arc<dyn EventSource>, Arc<dyn DeadLetterSink>) =
            match settings.amqp_url.as_deref() {
                Some(url) => (
                    Arc::new(AmqpEventSource::new(url)),
                    Arc::new(AmqpDeadLetterSink::new(url)),
                ),
                None => {
                    warn!("no broker configured; the onboarding consumer will stay idle");
                    let channel = InMemoryEventChannel::new();
                    (Arc::new(channel.clone()), Arc::new(channel))
                }
            };

        Ok(Self {
            repository,
            cache,
            events,
            dead_letters,
        })
    }
}

/// HTTP state and background consumer of one tasks service instance.
pub struct TasksService {
    pub state: TasksHttpState,
    pub consumer: Arc<OnboardingConsumer>,
}

/// Assemble the tasks service with Tokio-backed retry sleeps.
pub fn build_tasks_service(
    adapters: TasksAdapters,
    clock: Arc<dyn Clock>,
    consumer_config: OnboardingConsumerConfig,
) -> TasksService {
    build_tasks_service_with_runtime(
        adapters,
        clock,
        OnboardingConsumerRuntime::default(),
        consumer_config,
    )
}

/// Assemble the tasks service with injected consumer sleep and jitter.
pub fn build_tasks_service_with_runtime(
    adapters: TasksAdapters,
    clock: Arc<dyn Clock>,
    runtime: OnboardingConsumerRuntime,
    consumer_config: OnboardingConsumerConfig,
) -> TasksService {
    let TasksAdapters {
        repository,
        cache,
        events,
        dead_letters,
    } = adapters;

    let writes: Arc<dyn TaskRepository> = Arc::new(InvalidatingTaskRepository::new(
        Arc::clone(&repository),
        Arc::clone(&cache),
    ));
    info!(ack_mode = %consumer_config.ack_mode, "onboarding consumer configured");
    let consumer = OnboardingConsumer::with_runtime(
        OnboardingConsumerPorts::new(events, Arc::clone(&writes), dead_letters),
        Arc::clone(&clock),
        runtime,
        consumer_config,
    );

    TasksService {
        state: TasksHttpState {
            query: Arc::new(TasksQueryService::new(repository, cache)),
            command: Arc::new(TaskCommandService::new(writes)),
            clock,
        },
        consumer: Arc::new(consumer),
    }
}

/// Build the tasks service application.
pub fn build_tasks_app(
    health_state: web::Data<HealthState>,
    state: web::Data<TasksHttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(tasks_for_user)
        .service(create_task)
        .service(list_tasks);

    App::new()
        .app_data(health_state)
        .app_data(state)
        .app_data(json_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live)
}

/// Construct the tasks HTTP server and mark it ready.
///
/// Start the onboarding consumer before calling this so events published
/// while the server boots are not left waiting.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_tasks_server(
    health_state: web::Data<HealthState>,
    state: TasksHttpState,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let state = web::Data::new(state);
    let server = HttpServer::new(move || {
        build_tasks_app(server_health_state.clone(), state.clone())
    })
    .listen(config.into_listener()?)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
