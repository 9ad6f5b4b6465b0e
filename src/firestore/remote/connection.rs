use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value as JsonValue;
use url::Url;

use crate::firestore::constants::{DEFAULT_API_VERSION, DEFAULT_HOST};
use crate::firestore::error::{internal_error, invalid_argument, FirestoreResult};
use crate::util::CONSTANTS;

use super::rpc_error::map_http_error;

/// Thin JSON-over-HTTP client bound to one Firestore endpoint.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: Url,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    host: String,
    ssl: bool,
    client: Option<Client>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub request_tag: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, true)
    }
}

impl ConnectionBuilder {
    pub fn new(host: impl Into<String>, ssl: bool) -> Self {
        Self {
            host: host.into(),
            ssl,
            client: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, ssl: bool) -> Self {
        self.host = host.into();
        self.ssl = ssl;
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let base_url = build_base_url(&self.host, self.ssl)?;
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// POSTs `body` to `{base_url}/{path}` and decodes the JSON response.
    pub async fn post_json(
        &self,
        path: &str,
        body: &JsonValue,
        context: &RequestContext,
    ) -> FirestoreResult<JsonValue> {
        let response = self
            .build_request(path, context)?
            .json(body)
            .send()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }
        if text.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&text).map_err(|err| internal_error(err.to_string()))
    }

    fn build_request(&self, path: &str, context: &RequestContext) -> FirestoreResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| invalid_argument(format!("Invalid request path \"{path}\": {err}")))?;
        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-client", CONSTANTS.api_client);
        if let Some(timeout) = context.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(tag) = context.request_tag.as_deref() {
            builder = builder.header("x-firestore-request-tag", tag);
        }
        Ok(builder)
    }
}

fn build_base_url(host: &str, ssl: bool) -> FirestoreResult<Url> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid_argument("Firestore host must be a non-empty string."));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if ssl {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    };
    Url::parse(&format!("{with_scheme}/{DEFAULT_API_VERSION}/"))
        .map_err(|err| invalid_argument(format!("Invalid Firestore host \"{host}\": {err}")))
}
