//! Reqwest-backed client for the tasks service read endpoint.
//!
//! This adapter owns transport only: one GET per call with an explicit
//! timeout, trace propagation, and status mapping. The response body is
//! passed back opaque.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::value::RawValue;
use tracing::debug;

use crate::domain::ports::{TasksGateway, TasksGatewayError};
use crate::domain::{TRACE_ID_HEADER, TraceId, UserId};

/// Timeout applied when none is configured.
pub const DEFAULT_TASKS_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while building the client.
#[derive(Debug, thiserror::Error)]
pub enum TasksClientBuildError {
    /// The base URL does not parse or cannot carry a path.
    #[error("invalid tasks base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Gateway reading one user's tasks from `{base}/tasks/user/{id}`.
pub struct HttpTasksGateway {
    client: Client,
    base_url: Url,
}

impl HttpTasksGateway {
    /// Build a gateway for `base_url`, e.g. `http://tasks:8080/api/v1`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is invalid or the reqwest client cannot
    /// be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TasksClientBuildError> {
        let invalid = |message: String| TasksClientBuildError::InvalidBaseUrl {
            url: base_url.to_owned(),
            message,
        };
        let base_url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("url cannot be a base".to_owned()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn tasks_url(&self, user_id: UserId) -> String {
        format!(
            "{}/tasks/user/{user_id}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TasksGateway for HttpTasksGateway {
    async fn fetch_tasks_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Box<RawValue>, TasksGatewayError> {
        let url = self.tasks_url(user_id);
        let mut request = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(trace_id) = TraceId::current() {
            request = request.header(TRACE_ID_HEADER, trace_id.to_string());
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "tasks service answered");
        if !status.is_success() {
            return Err(TasksGatewayError::status(status.as_u16()));
        }
        embed_body(body.as_ref())
    }
}

fn map_transport_error(error: reqwest::Error) -> TasksGatewayError {
    if error.is_timeout() {
        TasksGatewayError::timeout(error.to_string())
    } else {
        TasksGatewayError::transport(error.to_string())
    }
}

/// Keep JSON bodies verbatim; anything else travels as a JSON string.
fn embed_body(body: &[u8]) -> Result<Box<RawValue>, TasksGatewayError> {
    if let Ok(raw) = serde_json::from_slice::<Box<RawValue>>(body) {
        return Ok(raw);
    }
    let text = String::from_utf8_lossy(body);
    serde_json::value::to_raw_value(&text)
        .map_err(|err| TasksGatewayError::transport(format!("unencodable body: {err}")))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network helpers.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(br#"[{"id":1}]"#.as_slice(), r#"[{"id":1}]"#)]
    #[case(b"plain text".as_slice(), r#""plain text""#)]
    #[case(b"".as_slice(), r#""""#)]
    fn embeds_body_as_json(#[case] body: &[u8], #[case] expected: &str) {
        let raw = embed_body(body).expect("body embeds");
        assert_eq!(raw.get(), expected);
    }

    #[rstest]
    #[case("http://tasks:8080/api/v1")]
    #[case("http://tasks:8080/api/v1/")]
    fn builds_read_url_under_base(#[case] base: &str) {
        let gateway = HttpTasksGateway::new(base, DEFAULT_TASKS_TIMEOUT).expect("gateway builds");
        let user_id = UserId::new(42).expect("positive id");
        assert_eq!(
            gateway.tasks_url(user_id),
            "http://tasks:8080/api/v1/tasks/user/42"
        );
    }

    #[rstest]
    #[case("not a url")]
    #[case("mailto:ops@example.com")]
    fn rejects_unusable_base_urls(#[case] base: &str) {
        assert!(matches!(
            HttpTasksGateway::new(base, DEFAULT_TASKS_TIMEOUT),
            Err(TasksClientBuildError::InvalidBaseUrl { .. })
        ));
    }
}
