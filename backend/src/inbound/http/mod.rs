//! HTTP inbound adapter exposing the REST endpoints of both services.

use actix_web::web;

pub mod error;
pub mod health;
pub mod state;
pub mod tasks;
pub mod users;
mod validation;

pub use error::ApiResult;

/// JSON extractor configuration mapping body errors to `invalid_request`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(error::json_error_handler)
}
