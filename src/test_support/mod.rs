//! Test utilities shared across the crate's unit tests.

pub mod http;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::firestore::api::Firestore;
use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::remote::{RpcMethod, RpcTransport};
use crate::firestore::settings::FirestoreSettings;

pub use http::start_mock_server;

/// One request seen by a [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: RpcMethod,
    pub payload: JsonValue,
    pub request_tag: String,
    pub allow_retries: bool,
}

/// In-memory transport that records requests and replays queued responses.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<VecDeque<FirestoreResult<JsonValue>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, response: FirestoreResult<JsonValue>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<RpcMethod> {
        self.requests().iter().map(|request| request.method).collect()
    }
}

#[async_trait]
impl RpcTransport for RecordingTransport {
    async fn request(
        &self,
        method: RpcMethod,
        payload: JsonValue,
        request_tag: &str,
        allow_retries: bool,
    ) -> FirestoreResult<JsonValue> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            payload,
            request_tag: request_tag.to_string(),
            allow_retries,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(internal_error(format!("no response queued for {method}"))))
    }
}

/// Client for project `test-project` backed by `transport`.
pub fn test_firestore(transport: Arc<RecordingTransport>, prefer_transactions: bool) -> Firestore {
    let settings = FirestoreSettings::new("test-project").with_prefer_transactions(prefer_transactions);
    Firestore::new(settings, transport).unwrap()
}
