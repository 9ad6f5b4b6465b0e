use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value as JsonValue;

use crate::firestore::error::FirestoreResult;

const REQUEST_TAG_LENGTH: usize = 5;

/// RPCs issued by the write pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    BeginTransaction,
    Commit,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcMethod::BeginTransaction => "beginTransaction",
            RpcMethod::Commit => "commit",
        }
    }
}

impl Display for RpcMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carries a JSON request to the backend and returns its JSON response.
///
/// Implementations own deadlines, authentication and retries. A request
/// sent with `allow_retries == false` must be attempted exactly once.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn request(
        &self,
        method: RpcMethod,
        payload: JsonValue,
        request_tag: &str,
        allow_retries: bool,
    ) -> FirestoreResult<JsonValue>;
}

pub type RpcTransportArc = Arc<dyn RpcTransport>;

#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> FirestoreResult<Option<String>>;
    fn invalidate_token(&self);
}

#[derive(Default, Clone)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }

    fn invalidate_token(&self) {}
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;

/// Short random identifier used to correlate the log lines of one call.
pub fn request_tag() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_TAG_LENGTH)
        .map(char::from)
        .collect()
}
