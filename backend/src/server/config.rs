//! Service settings loaded via OrthoConfig, plus the listener configuration
//! shared by both HTTP servers.
//!
//! Every backing URL is optional. An absent URL selects the in-memory
//! adapter so either service can run on a laptop without infrastructure.

use std::net::{AddrParseError, SocketAddr, TcpListener};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::OnboardingConsumerConfig;
use crate::domain::ports::AckMode;
use crate::outbound::tasks_client::DEFAULT_TASKS_TIMEOUT;

const DEFAULT_USERS_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TASKS_BIND_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_TASKS_BASE_URL: &str = "http://127.0.0.1:8081/api/v1";

/// Configuration of the users service, read from `USERS_SERVICE_*`.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERS_SERVICE")]
pub struct UsersServiceSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL of the users database.
    pub database_url: Option<String>,
    /// AMQP URL of the broker receiving registration events.
    pub amqp_url: Option<String>,
    /// Base URL of the tasks service API, including `/api/v1`.
    pub tasks_base_url: Option<String>,
    /// Timeout for the aggregated task read, in milliseconds.
    pub tasks_timeout_ms: Option<u64>,
}

impl UsersServiceSettings {
    /// Parsed bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_USERS_BIND_ADDR)
            .parse()
    }

    /// Tasks service base URL, falling back to a local instance.
    pub fn tasks_base_url(&self) -> &str {
        self.tasks_base_url
            .as_deref()
            .unwrap_or(DEFAULT_TASKS_BASE_URL)
    }

    /// Aggregated read timeout, falling back to five seconds.
    pub fn tasks_timeout(&self) -> Duration {
        self.tasks_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TASKS_TIMEOUT)
    }
}

/// Configuration of the tasks service, read from `TASKS_SERVICE_*`.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TASKS_SERVICE")]
pub struct TasksServiceSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL of the tasks database.
    pub database_url: Option<String>,
    /// AMQP URL of the broker carrying registration events.
    pub amqp_url: Option<String>,
    /// Redis URL of the task list cache.
    pub redis_url: Option<String>,
    /// `auto` or `after_persist`.
    pub ack_mode: Option<String>,
    /// Write attempts per delivery before dead-lettering.
    pub handler_max_attempts: Option<u32>,
}

impl TasksServiceSettings {
    /// Parsed bind address, falling back to `0.0.0.0:8081`.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_TASKS_BIND_ADDR)
            .parse()
    }

    /// Consumer configuration with configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns the parse message when `ack_mode` is not recognised.
    pub fn consumer_config(&self) -> Result<OnboardingConsumerConfig, String> {
        let defaults = OnboardingConsumerConfig::default();
        let ack_mode = match self.ack_mode.as_deref() {
            Some(raw) => raw.parse::<AckMode>()?,
            None => defaults.ack_mode,
        };
        Ok(OnboardingConsumerConfig {
            ack_mode,
            handler_max_attempts: self
                .handler_max_attempts
                .unwrap_or(defaults.handler_max_attempts)
                .max(1),
            ..defaults
        })
    }
}

enum Binding {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// Where an HTTP server accepts connections.
pub struct ServerConfig {
    binding: Binding,
}

impl ServerConfig {
    /// Bind a fresh socket at `bind_addr` when the server is created.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            binding: Binding::Addr(bind_addr),
        }
    }

    /// Serve on an already bound listener, e.g. one on an ephemeral port.
    #[must_use]
    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            binding: Binding::Listener(listener),
        }
    }

    /// Resolve the listening socket, binding it when only an address was given.
    pub(crate) fn into_listener(self) -> std::io::Result<TcpListener> {
        let listener = match self.binding {
            Binding::Addr(addr) => TcpListener::bind(addr)?,
            Binding::Listener(listener) => listener,
        };
        listener.set_nonblocking(true)?;
        Ok(listener)
    }
}
