use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};

use serde_json::Value as JsonValue;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DatabaseId, ResourcePath, Timestamp};
use crate::firestore::remote::{
    ConnectionBuilder, HttpTransport, JsonProtoSerializer, NoopTokenProvider, RpcMethod,
    RpcTransportArc, TokenProviderArc,
};
use crate::firestore::settings::FirestoreSettings;
use crate::logger::Logger;

use super::reference::{CollectionReference, DocumentReference};
use super::write_batch::WriteBatch;

pub(crate) static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase/firestore"));

const NO_REQUEST: i64 = i64::MIN;

/// Handle to one Firestore database.
///
/// Cheap to clone; clones share the transport and the idle-tracking state.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    settings: FirestoreSettings,
    database_id: DatabaseId,
    serializer: JsonProtoSerializer,
    transport: RpcTransportArc,
    last_successful_request_ms: AtomicI64,
}

impl Firestore {
    /// Creates a client that sends its requests through `transport`.
    pub fn new(settings: FirestoreSettings, transport: RpcTransportArc) -> FirestoreResult<Self> {
        settings.validate()?;
        LOGGER
            .set_log_level(settings.log_level)
            .map_err(|err| invalid_argument(err.to_string()))?;
        let database_id = settings.database();
        let inner = FirestoreInner {
            serializer: JsonProtoSerializer::new(database_id.clone()),
            database_id,
            settings,
            transport,
            last_successful_request_ms: AtomicI64::new(NO_REQUEST),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a client backed by the REST API, without authentication.
    pub fn with_http_transport(settings: FirestoreSettings) -> FirestoreResult<Self> {
        Self::with_auth_provider(settings, Arc::new(NoopTokenProvider))
    }

    /// Creates a client backed by the REST API that authenticates with
    /// tokens from `provider`.
    pub fn with_auth_provider(
        settings: FirestoreSettings,
        provider: TokenProviderArc,
    ) -> FirestoreResult<Self> {
        let transport = HttpTransport::builder()
            .with_connection_builder(ConnectionBuilder::new(settings.host.clone(), settings.ssl))
            .with_retry_settings(settings.retry.clone())
            .with_auth_provider(provider)
            .build()?;
        Self::new(settings, Arc::new(transport))
    }

    pub fn settings(&self) -> &FirestoreSettings {
        &self.inner.settings
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn project_id(&self) -> &str {
        self.inner.database_id.project_id()
    }

    pub fn database(&self) -> &str {
        self.inner.database_id.database()
    }

    /// Creates a `CollectionReference` pointing at a slash-separated `path`.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at a slash-separated `path`.
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    /// Starts an empty write batch.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.clone())
    }

    pub fn prefers_transactions(&self) -> bool {
        self.inner.settings.prefer_transactions
    }

    /// Time at which the last request completed successfully, if any.
    pub fn last_successful_request(&self) -> Option<Timestamp> {
        self.last_successful_request_millis()
            .map(Timestamp::from_millis)
    }

    pub(crate) fn last_successful_request_millis(&self) -> Option<i64> {
        match self.inner.last_successful_request_ms.load(Ordering::SeqCst) {
            NO_REQUEST => None,
            millis => Some(millis),
        }
    }

    pub(crate) fn serializer(&self) -> &JsonProtoSerializer {
        &self.inner.serializer
    }

    /// Sends one RPC and records its completion time when it succeeds.
    pub(crate) async fn request(
        &self,
        method: RpcMethod,
        payload: JsonValue,
        request_tag: &str,
        allow_retries: bool,
    ) -> FirestoreResult<JsonValue> {
        LOGGER.debug(format!("[{request_tag}] Sending {method} request"));
        match self
            .inner
            .transport
            .request(method, payload, request_tag, allow_retries)
            .await
        {
            Ok(response) => {
                self.inner
                    .last_successful_request_ms
                    .store(Timestamp::now().to_millis(), Ordering::SeqCst);
                LOGGER.debug(format!("[{request_tag}] Received {method} response"));
                Ok(response)
            }
            Err(err) => {
                LOGGER.debug(format!("[{request_tag}] {method} failed: {err}"));
                Err(err)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_successful_request_millis(&self, millis: Option<i64>) {
        self.inner
            .last_successful_request_ms
            .store(millis.unwrap_or(NO_REQUEST), Ordering::SeqCst);
    }
}

impl fmt::Debug for Firestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firestore")
            .field("database_id", &self.inner.database_id)
            .field("prefer_transactions", &self.inner.settings.prefer_transactions)
            .finish_non_exhaustive()
    }
}
