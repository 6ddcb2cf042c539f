//! Users service wiring: adapters, HTTP state and server.

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::Clock;
use tracing::{info, warn};

use crate::Trace;
use crate::domain::ports::{PasswordHasher, TasksGateway, UserEventPublisher, UserRepository};
use crate::domain::{
    CredentialLoginService, UserRegistrationPorts, UserRegistrationService, UserTasksService,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::json_config;
use crate::inbound::http::state::UsersHttpState;
use crate::inbound::http::users::{login, register, user_tasks};
use crate::outbound::memory::InMemoryUserRepository;
use crate::outbound::persistence::{
    DbPool, DieselUserRepository, PoolConfig, Schema, run_migrations,
};
use crate::outbound::queue::{AmqpUserEventPublisher, InMemoryEventChannel};
use crate::outbound::security::BcryptPasswordHasher;
use crate::outbound::tasks_client::HttpTasksGateway;

use super::{ServerConfig, StartupError, UsersServiceSettings};

/// Driven adapters of the users service.
pub struct UsersAdapters {
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub publisher: Arc<dyn UserEventPublisher>,
    pub tasks: Arc<dyn TasksGateway>,
}

impl UsersAdapters {
    /// Select adapters from settings, migrating the database when one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when migrations, the pool or the tasks
    /// client cannot be set up.
    pub async fn from_settings(settings: &UsersServiceSettings) -> Result<Self, StartupError> {
        let users: Arc<dyn UserRepository> = match settings.database_url.as_deref() {
            Some(url) => {
                run_migrations(url, Schema::Users).await?;
                let pool = DbPool::new(PoolConfig::new(url)).await?;
                Arc::new(DieselUserRepository::new(pool))
            }
            None => {
                warn!("no database configured; users are kept in memory");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let publisher: Arc<dyn UserEventPublisher> = match settings.amqp_url.as_deref() {
            Some(url) => Arc::new(AmqpUserEventPublisher::new(url)),
            None => {
                warn!("no broker configured; registration events stay in process");
                Arc::new(InMemoryEventChannel::new())
            }
        };

        let tasks = HttpTasksGateway::new(settings.tasks_base_url(), settings.tasks_timeout())?;
        info!(
            tasks_base_url = settings.tasks_base_url(),
            timeout_ms = settings.tasks_timeout().as_millis(),
            "tasks gateway configured"
        );

        Ok(Self {
            users,
            hasher: Arc::new(BcryptPasswordHasher::default()),
            publisher,
            tasks: Arc::new(tasks),
        })
    }
}

/// Assemble the domain services behind the users HTTP handlers.
pub fn build_users_state(adapters: UsersAdapters, clock: Arc<dyn Clock>) -> UsersHttpState {
    let UsersAdapters {
        users,
        hasher,
        publisher,
        tasks,
    } = adapters;

    let registration = UserRegistrationService::new(
        UserRegistrationPorts {
            users: Arc::clone(&users),
            hasher: Arc::clone(&hasher),
            publisher,
        },
        clock,
    );
    UsersHttpState {
        registration: Arc::new(registration),
        login: Arc::new(CredentialLoginService::new(Arc::clone(&users), hasher)),
        user_tasks: Arc::new(UserTasksService::new(users, tasks)),
    }
}

/// Build the users service application.
pub fn build_users_app(
    health_state: web::Data<HealthState>,
    state: web::Data<UsersHttpState>,
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
        .service(register)
        .service(login)
        .service(user_tasks);

    App::new()
        .app_data(health_state)
        .app_data(state)
        .app_data(json_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live)
}

/// Construct the users HTTP server and mark it ready.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_users_server(
    health_state: web::Data<HealthState>,
    state: UsersHttpState,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let state = web::Data::new(state);
    let server = HttpServer::new(move || {
        build_users_app(server_health_state.clone(), state.clone())
    })
    .listen(config.into_listener()?)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
