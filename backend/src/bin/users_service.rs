//! Users service entry-point: registration, login, and the task aggregator.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use taskboard::inbound::http::health::HealthState;
use taskboard::server::{
    ServerConfig, UsersAdapters, UsersServiceSettings, build_users_state, create_users_server,
};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = UsersServiceSettings::load().wrap_err("failed to load users settings")?;
    let bind_addr = settings
        .bind_addr()
        .wrap_err("USERS_SERVICE_BIND_ADDR is not a socket address")?;

    let adapters = UsersAdapters::from_settings(&settings)
        .await
        .wrap_err("failed to wire users service")?;
    let state = build_users_state(adapters, Arc::new(DefaultClock));

    let health_state = web::Data::new(HealthState::new());
    let server = create_users_server(health_state.clone(), state, ServerConfig::new(bind_addr))
        .wrap_err("failed to start users http server")?;
    info!(%bind_addr, "users service listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    info!("users service stopped");
    outcome.wrap_err("users http server failed")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}
