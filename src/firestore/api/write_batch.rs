use std::collections::BTreeMap;

use crate::firestore::constants::MAX_BATCH_WRITES;
use crate::firestore::error::{
    failed_precondition, invalid_argument, resource_exhausted, FirestoreResult,
};
use crate::firestore::model::{IntoFieldPath, Timestamp};
use crate::firestore::remote::{
    demultiplex_write_results, request_tag, should_begin_transaction, RpcMethod,
};
use crate::firestore::validation::validate_argument_count;
use crate::firestore::value::FirestoreValue;
use crate::firestore::write::{Precondition, SetOptions, UpdateMap, WriteOperation};

use super::database::{Firestore, LOGGER};
use super::reference::DocumentReference;
use super::write_result::WriteResult;

const UPDATE_USAGE: &str = "update() requires either a map of field paths to values or a list of field/value pairs, optionally followed by a precondition.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BatchState {
    Open,
    Committed,
}

/// Accumulates writes and commits them atomically.
///
/// Every append validates its input before anything is queued, so a batch
/// never holds a partially validated operation. Once `commit` has sent the
/// writes, further appends fail.
#[derive(Debug)]
pub struct WriteBatch {
    firestore: Firestore,
    operations: Vec<WriteOperation>,
    state: BatchState,
}

impl WriteBatch {
    pub(crate) fn new(firestore: Firestore) -> Self {
        Self {
            firestore,
            operations: Vec::new(),
            state: BatchState::Open,
        }
    }

    /// Creates the document, failing the commit if it already exists.
    pub fn create(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<&mut Self> {
        self.prepare_append(reference)?;
        let operation = WriteOperation::create(reference.key().clone(), data)?;
        self.operations.push(operation);
        Ok(self)
    }

    /// Writes the document, replacing it unless `options` asks for a merge.
    pub fn set(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&mut Self> {
        self.prepare_append(reference)?;
        let options = options.unwrap_or_default();
        let operation = WriteOperation::set(reference.key().clone(), data, &options)?;
        self.operations.push(operation);
        Ok(self)
    }

    /// Updates fields of an existing document. Keys are dotted field paths.
    ///
    /// Without a precondition the document must exist.
    pub fn update(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<&mut Self> {
        self.prepare_append(reference)?;
        let provided = 2 + usize::from(precondition.is_some());
        let operation = validate_argument_count("update", provided, Some(2), Some(3))
            .and_then(|_| UpdateMap::from_data(data))
            .and_then(|map| self.lower_update(reference, map, precondition))
            .map_err(|err| err.with_prefix(UPDATE_USAGE))?;
        self.operations.push(operation);
        Ok(self)
    }

    /// Updates fields of an existing document from field/value pairs.
    ///
    /// Fields may be dotted strings or explicit [`FieldPath`]s, which can
    /// address keys containing dots.
    ///
    /// [`FieldPath`]: crate::firestore::model::FieldPath
    pub fn update_fields<P: IntoFieldPath>(
        &mut self,
        reference: &DocumentReference,
        fields: Vec<(P, FirestoreValue)>,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<&mut Self> {
        self.prepare_append(reference)?;
        let provided = 1 + 2 * fields.len() + usize::from(precondition.is_some());
        let operation = validate_argument_count("update", provided, Some(2), None)
            .and_then(|_| UpdateMap::from_pairs(fields))
            .and_then(|map| self.lower_update(reference, map, precondition))
            .map_err(|err| err.with_prefix(UPDATE_USAGE))?;
        self.operations.push(operation);
        Ok(self)
    }

    /// Deletes the document.
    pub fn delete(
        &mut self,
        reference: &DocumentReference,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<&mut Self> {
        self.prepare_append(reference)?;
        let operation = WriteOperation::delete(
            reference.key().clone(),
            precondition.unwrap_or_default(),
        );
        self.operations.push(operation);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_committed(&self) -> bool {
        self.state == BatchState::Committed
    }

    /// Commits every queued write atomically.
    ///
    /// Returns one [`WriteResult`] per appended operation, in append order.
    /// The batch is marked committed as soon as the commit request is sent,
    /// whether or not it succeeds. The commit itself is never retried; a
    /// client that prefers transactions and has been idle first opens a
    /// transaction (which may be retried) and commits inside it.
    pub async fn commit(&mut self) -> FirestoreResult<Vec<WriteResult>> {
        let tag = request_tag();
        let transaction = self.begin_transaction_if_idle(&tag).await?;
        self.commit_with_transaction(transaction, &tag).await
    }

    async fn begin_transaction_if_idle(&self, tag: &str) -> FirestoreResult<Option<Vec<u8>>> {
        let begin = should_begin_transaction(
            self.firestore.prefers_transactions(),
            self.firestore.last_successful_request_millis(),
            Timestamp::now().to_millis(),
        );
        if !begin {
            return Ok(None);
        }
        LOGGER.debug(format!(
            "[{tag}] Client is idle; beginning a transaction before commit"
        ));
        let serializer = self.firestore.serializer();
        let response = self
            .firestore
            .request(
                RpcMethod::BeginTransaction,
                serializer.encode_begin_transaction_request(),
                tag,
                true,
            )
            .await?;
        serializer.decode_begin_transaction(&response).map(Some)
    }

    async fn commit_with_transaction(
        &mut self,
        transaction: Option<Vec<u8>>,
        tag: &str,
    ) -> FirestoreResult<Vec<WriteResult>> {
        let serializer = self.firestore.serializer();
        let payload = serializer.encode_commit_request(&self.operations, transaction.as_deref());
        self.state = BatchState::Committed;
        LOGGER.debug(format!(
            "[{tag}] Committing {} operations{}",
            self.operations.len(),
            if transaction.is_some() {
                " in a transaction"
            } else {
                ""
            }
        ));

        let response = self
            .firestore
            .request(RpcMethod::Commit, payload, tag, false)
            .await?;
        let response = serializer.decode_commit_response(&response)?;
        let write_times = demultiplex_write_results(&self.operations, &response);
        LOGGER.debug(format!(
            "[{tag}] Received {} write results",
            response.write_results.len()
        ));
        Ok(write_times.into_iter().map(WriteResult::new).collect())
    }

    fn lower_update(
        &self,
        reference: &DocumentReference,
        map: UpdateMap,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteOperation> {
        let precondition = match precondition {
            None | Some(Precondition::None) => Precondition::Exists(true),
            Some(precondition) => {
                precondition.validate_for_update("precondition")?;
                precondition
            }
        };
        WriteOperation::update(reference.key().clone(), map, precondition)
    }

    fn prepare_append(&self, reference: &DocumentReference) -> FirestoreResult<()> {
        self.verify_not_committed()?;
        self.ensure_same_database(reference)?;
        self.ensure_capacity()
    }

    fn verify_not_committed(&self) -> FirestoreResult<()> {
        if self.state == BatchState::Committed {
            return Err(failed_precondition(
                "Cannot modify a WriteBatch that has been committed.",
            ));
        }
        Ok(())
    }

    fn ensure_same_database(&self, reference: &DocumentReference) -> FirestoreResult<()> {
        if self.firestore.database_id() != reference.firestore().database_id() {
            return Err(invalid_argument(format!(
                "{reference} belongs to a different Firestore database than this WriteBatch."
            )));
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> FirestoreResult<()> {
        if self.operations.len() >= MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "WriteBatch cannot contain more than {MAX_BATCH_WRITES} operations"
            )));
        }
        Ok(())
    }
}
