use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::firestore::error::{
    invalid_argument, FirestoreError, FirestoreErrorCode, FirestoreResult,
};
use crate::firestore::remote::connection::{Connection, ConnectionBuilder, RequestContext};
use crate::firestore::remote::transport::{
    NoopTokenProvider, RpcMethod, RpcTransport, TokenProviderArc,
};
use crate::firestore::validation::{validate_integer, validate_number, NumberOptions};
use crate::platform::runtime::sleep as runtime_sleep;

/// [`RpcTransport`] that talks to the Firestore REST API.
#[derive(Clone)]
pub struct HttpTransport {
    connection: Connection,
    auth_provider: TokenProviderArc,
    retry: RetrySettings,
}

#[derive(Clone)]
pub struct HttpTransportBuilder {
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    retry: RetrySettings,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            multiplier: 1.5,
            max_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_tag: &str,
        allow_retries: bool,
        mut operation: F,
    ) -> FirestoreResult<T>
    where
        F: FnMut(RequestContext) -> Fut,
        Fut: Future<Output = FirestoreResult<T>>,
    {
        let mut attempt = 0usize;
        loop {
            let context = self.build_request_context(request_tag).await?;
            match operation(context).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !allow_retries || !self.retry.should_retry(attempt, &err) {
                        return Err(err);
                    }

                    if err.code == FirestoreErrorCode::Unauthenticated {
                        self.auth_provider.invalidate_token();
                    }

                    let delay = self.retry.backoff_delay(attempt);
                    log::warn!(
                        "[{request_tag}] request failed with {}; retrying in {delay:?}",
                        err.code_str()
                    );
                    runtime_sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn build_request_context(&self, request_tag: &str) -> FirestoreResult<RequestContext> {
        Ok(RequestContext {
            auth_token: self.auth_provider.get_token().await?,
            request_tag: Some(request_tag.to_string()),
            request_timeout: Some(self.retry.request_timeout),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(
        &self,
        method: RpcMethod,
        payload: JsonValue,
        request_tag: &str,
        allow_retries: bool,
    ) -> FirestoreResult<JsonValue> {
        let (database, body) = split_database(payload)?;
        let path = format!("{database}/documents:{}", method.as_str());
        self.execute_with_retry(request_tag, allow_retries, |context| {
            let path = path.clone();
            let body = body.clone();
            async move { self.connection.post_json(&path, &body, &context).await }
        })
        .await
    }
}

/// Removes the `database` routing field from a request body.
///
/// The REST API carries the database in the URL rather than the body.
fn split_database(payload: JsonValue) -> FirestoreResult<(String, JsonValue)> {
    let JsonValue::Object(mut body) = payload else {
        return Err(invalid_argument("Request payload must be a JSON object"));
    };
    match body.remove("database") {
        Some(JsonValue::String(database)) => Ok((database, JsonValue::Object(body))),
        _ => Err(invalid_argument(
            "Request payload must name the target database",
        )),
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        let auth_provider: TokenProviderArc = Arc::new(NoopTokenProvider);
        Self {
            connection_builder: Connection::builder(),
            auth_provider,
            retry: RetrySettings::default(),
        }
    }
}

impl HttpTransportBuilder {
    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_retry_settings(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn build(self) -> FirestoreResult<HttpTransport> {
        self.retry.validate()?;
        Ok(HttpTransport {
            connection: self.connection_builder.build()?,
            auth_provider: self.auth_provider,
            retry: self.retry,
        })
    }
}

impl RetrySettings {
    pub fn validate(&self) -> FirestoreResult<()> {
        validate_integer(
            "max_attempts",
            Some(self.max_attempts as f64),
            NumberOptions::at_least(1.0),
        )?;
        validate_number(
            "multiplier",
            Some(self.multiplier),
            NumberOptions::at_least(1.0),
        )?;
        if self.initial_delay > self.max_delay {
            return Err(invalid_argument(format!(
                "initial_delay ({:?}) must not exceed max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid_argument("request_timeout must be greater than zero"));
        }
        Ok(())
    }

    fn should_retry(&self, attempt: usize, error: &FirestoreError) -> bool {
        if attempt + 1 >= self.max_attempts {
            return false;
        }

        matches!(
            error.code,
            FirestoreErrorCode::Internal
                | FirestoreErrorCode::Unavailable
                | FirestoreErrorCode::DeadlineExceeded
                | FirestoreErrorCode::ResourceExhausted
                | FirestoreErrorCode::Unauthenticated
        )
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let delay = self.initial_delay.mul_f64(self.multiplier.powi(attempt as i32));
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::{internal_error, invalid_argument, unauthenticated};
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::panic;

    const DATABASE: &str = "projects/demo-project/databases/(default)";

    fn fast_retries(max_attempts: usize) -> RetrySettings {
        RetrySettings {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..Default::default()
        }
    }

    fn transport_for(server: &MockServer, retry: RetrySettings) -> HttpTransport {
        let client = reqwest::Client::builder().build().expect("reqwest client");
        HttpTransport::builder()
            .with_connection_builder(
                ConnectionBuilder::new(server.address().to_string(), false).with_client(client),
            )
            .with_retry_settings(retry)
            .build()
            .expect("transport")
    }

    #[test]
    fn retries_unauthenticated_errors() {
        let settings = RetrySettings {
            max_attempts: 3,
            ..Default::default()
        };
        let error = unauthenticated("expired");
        assert!(settings.should_retry(0, &error));
        assert!(settings.should_retry(1, &error));
        assert!(!settings.should_retry(2, &error));
        assert!(!settings.should_retry(0, &invalid_argument("bad")));
    }

    #[test]
    fn stops_retrying_after_max_attempts() {
        let settings = RetrySettings {
            max_attempts: 1,
            ..Default::default()
        };
        assert!(!settings.should_retry(0, &internal_error("boom")));
    }

    #[test]
    fn backoff_is_capped() {
        let settings = RetrySettings::default();
        assert_eq!(settings.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(settings.backoff_delay(1), Duration::from_millis(150));
        assert_eq!(settings.backoff_delay(50), settings.max_delay);
    }

    #[test]
    fn validates_settings() {
        RetrySettings::default().validate().unwrap();
        let err = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err.message(),
            "Argument \"max_attempts\" must be at least 1, but was: 0"
        );
        assert!(RetrySettings {
            multiplier: 0.5,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(RetrySettings {
            initial_delay: Duration::from_secs(10),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn split_database_moves_routing_out_of_body() {
        let (database, body) =
            split_database(json!({ "database": DATABASE, "writes": [] })).unwrap();
        assert_eq!(database, DATABASE);
        assert_eq!(body, json!({ "writes": [] }));
        assert!(split_database(json!({ "writes": [] })).is_err());
        assert!(split_database(json!([])).is_err());
    }

    #[tokio::test]
    async fn commit_posts_to_documents_endpoint() {
        let server = match panic::catch_unwind(|| start_mock_server()) {
            Ok(server) => server,
            Err(_) => {
                eprintln!(
                    "Skipping commit_posts_to_documents_endpoint: unable to bind httpmock server in this environment."
                );
                return;
            }
        };

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DATABASE}/documents:commit"))
                .header("x-firestore-request-tag", "abcde")
                .json_body(json!({ "writes": [] }));
            then.status(200)
                .json_body(json!({ "commitTime": "2024-01-01T00:00:00Z" }));
        });

        let transport = transport_for(&server, RetrySettings::default());
        let response = transport
            .request(
                RpcMethod::Commit,
                json!({ "database": DATABASE, "writes": [] }),
                "abcde",
                false,
            )
            .await
            .expect("commit");
        mock.assert();
        assert_eq!(response["commitTime"], "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn requests_without_retries_are_attempted_once() {
        let server = match panic::catch_unwind(|| start_mock_server()) {
            Ok(server) => server,
            Err(_) => {
                eprintln!(
                    "Skipping requests_without_retries_are_attempted_once: unable to bind httpmock server in this environment."
                );
                return;
            }
        };

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DATABASE}/documents:commit"));
            then.status(503).json_body(json!({
                "error": { "code": 503, "message": "try later", "status": "UNAVAILABLE" }
            }));
        });

        let transport = transport_for(&server, fast_retries(3));
        let err = transport
            .request(RpcMethod::Commit, json!({ "database": DATABASE }), "tag01", false)
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unavailable);
        assert_eq!(err.message(), "try later");
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn retryable_requests_back_off_until_exhausted() {
        let server = match panic::catch_unwind(|| start_mock_server()) {
            Ok(server) => server,
            Err(_) => {
                eprintln!(
                    "Skipping retryable_requests_back_off_until_exhausted: unable to bind httpmock server in this environment."
                );
                return;
            }
        };

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DATABASE}/documents:beginTransaction"));
            then.status(503);
        });

        let transport = transport_for(&server, fast_retries(3));
        let err = transport
            .request(
                RpcMethod::BeginTransaction,
                json!({ "database": DATABASE, "options": { "readWrite": {} } }),
                "tag02",
                true,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unavailable);
        assert_eq!(mock.hits(), 3);
    }
}
