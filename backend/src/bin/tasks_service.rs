//! Tasks service entry-point: task API plus the onboarding consumer.
//!
//! The consumer starts before the HTTP server and is cancelled once the
//! server has drained, so an in-flight delivery is never cut short.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use taskboard::inbound::http::health::HealthState;
use taskboard::server::{
    ServerConfig, TasksAdapters, TasksServiceSettings, build_tasks_service, create_tasks_server,
};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = TasksServiceSettings::load().wrap_err("failed to load tasks settings")?;
    let bind_addr = settings
        .bind_addr()
        .wrap_err("TASKS_SERVICE_BIND_ADDR is not a socket address")?;
    let consumer_config = settings.consumer_config().map_err(|message| eyre!(message))?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let adapters = TasksAdapters::from_settings(&settings, Arc::clone(&clock))
        .await
        .wrap_err("failed to wire tasks service")?;
    let service = build_tasks_service(adapters, clock, consumer_config);

    let cancel = CancellationToken::new();
    let consumer = Arc::clone(&service.consumer).spawn(cancel.clone());

    let health_state = web::Data::new(HealthState::new());
    let server = create_tasks_server(
        health_state.clone(),
        service.state,
        ServerConfig::new(bind_addr),
    )
    .wrap_err("failed to start tasks http server")?;
    info!(%bind_addr, "tasks service listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    cancel.cancel();
    if let Err(e) = consumer.await {
        error!(error = %e, "onboarding consumer task failed");
    }
    info!("tasks service stopped");
    outcome.wrap_err("tasks http server failed")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}
