use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value as JsonValue};

use crate::firestore::error::{internal_error, FirestoreResult};
use crate::firestore::model::{DatabaseId, DocumentKey, FieldPath, Timestamp};
use crate::firestore::value::{FirestoreValue, ValueKind};
use crate::firestore::write::{
    DocumentMask, FieldTransform, Precondition, TransformOperation, TransformWrite, Write,
    WriteOperation,
};
use crate::util::fail;

/// Decoded `commit` response.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitResponse {
    pub commit_time: Timestamp,
    /// One entry per wire write, `None` when the server omitted `updateTime`.
    pub write_results: Vec<Option<Timestamp>>,
}

/// Encodes writes into the JSON mapping of the Firestore v1 REST API.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn database_name(&self) -> String {
        self.database_id.formatted_name()
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/documents/{}",
            self.database_name(),
            key.path().canonical_string()
        )
    }

    /// Flattens an operation into its wire entries, write before transform.
    pub fn encode_operation(&self, operation: &WriteOperation) -> Vec<JsonValue> {
        let mut entries = Vec::with_capacity(operation.wire_entry_count());
        let mut precondition = self.encode_precondition(operation.precondition());
        if let Some(write) = operation.write() {
            entries.push(self.encode_write(write, precondition.take()));
        }
        if let Some(transform) = operation.transform() {
            entries.push(self.encode_transform_write(transform, precondition.take()));
        }
        entries
    }

    pub fn encode_write(&self, write: &Write, precondition: Option<JsonValue>) -> JsonValue {
        let mut entry = Map::new();
        match write {
            Write::Update {
                key,
                document,
                mask,
            } => {
                let mut fields = Map::new();
                for (name, value) in document.fields() {
                    fields.insert(name.clone(), self.encode_value(value));
                }
                entry.insert(
                    "update".to_string(),
                    json!({
                        "name": self.document_name(key),
                        "fields": fields,
                    }),
                );
                if let Some(mask) = mask {
                    entry.insert("updateMask".to_string(), encode_mask(mask));
                }
            }
            Write::Delete { key } => {
                entry.insert("delete".to_string(), json!(self.document_name(key)));
            }
        }
        if let Some(precondition) = precondition {
            entry.insert("currentDocument".to_string(), precondition);
        }
        JsonValue::Object(entry)
    }

    pub fn encode_transform_write(
        &self,
        transform: &TransformWrite,
        precondition: Option<JsonValue>,
    ) -> JsonValue {
        let field_transforms: Vec<JsonValue> = transform
            .transform
            .field_transforms()
            .iter()
            .map(|field_transform| self.encode_field_transform(field_transform))
            .collect();
        let mut entry = Map::new();
        entry.insert(
            "transform".to_string(),
            json!({
                "document": self.document_name(&transform.key),
                "fieldTransforms": field_transforms,
            }),
        );
        if let Some(precondition) = precondition {
            entry.insert("currentDocument".to_string(), precondition);
        }
        JsonValue::Object(entry)
    }

    fn encode_field_transform(&self, transform: &FieldTransform) -> JsonValue {
        let field_path = transform.field_path().formatted_name();
        match transform.operation() {
            TransformOperation::ServerTimestamp => json!({
                "fieldPath": field_path,
                "setToServerValue": "REQUEST_TIME"
            }),
            TransformOperation::ArrayUnion(elements) => json!({
                "fieldPath": field_path,
                "appendMissingElements": { "values": self.encode_values(elements) }
            }),
            TransformOperation::ArrayRemove(elements) => json!({
                "fieldPath": field_path,
                "removeAllFromArray": { "values": self.encode_values(elements) }
            }),
            TransformOperation::NumericIncrement(operand) => json!({
                "fieldPath": field_path,
                "increment": self.encode_value(operand)
            }),
        }
    }

    pub fn encode_precondition(&self, precondition: &Precondition) -> Option<JsonValue> {
        match precondition {
            Precondition::None => None,
            Precondition::Exists(exists) => Some(json!({ "exists": exists })),
            Precondition::UpdateTime(time) => Some(json!({ "updateTime": time.to_rfc3339() })),
        }
    }

    pub fn encode_commit_request(
        &self,
        operations: &[WriteOperation],
        transaction: Option<&[u8]>,
    ) -> JsonValue {
        let writes: Vec<JsonValue> = operations
            .iter()
            .flat_map(|operation| self.encode_operation(operation))
            .collect();
        let mut request = Map::new();
        request.insert("database".to_string(), json!(self.database_name()));
        request.insert("writes".to_string(), JsonValue::Array(writes));
        if let Some(transaction) = transaction {
            request.insert(
                "transaction".to_string(),
                json!(BASE64_STANDARD.encode(transaction)),
            );
        }
        JsonValue::Object(request)
    }

    pub fn encode_begin_transaction_request(&self) -> JsonValue {
        json!({
            "database": self.database_name(),
            "options": { "readWrite": {} }
        })
    }

    pub fn decode_begin_transaction(&self, response: &JsonValue) -> FirestoreResult<Vec<u8>> {
        let encoded = response
            .get("transaction")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("beginTransaction response is missing a transaction"))?;
        BASE64_STANDARD
            .decode(encoded)
            .map_err(|err| internal_error(format!("Invalid transaction id: {err}")))
    }

    pub fn decode_commit_response(&self, response: &JsonValue) -> FirestoreResult<CommitResponse> {
        let commit_time = response
            .get("commitTime")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("commit response is missing commitTime"))?;
        let commit_time = Timestamp::parse_rfc3339(commit_time)?;

        let mut write_results = Vec::new();
        if let Some(results) = response.get("writeResults") {
            let results = results
                .as_array()
                .ok_or_else(|| internal_error("commit writeResults must be an array"))?;
            for result in results {
                let update_time = match result.get("updateTime").and_then(JsonValue::as_str) {
                    Some(time) => Some(Timestamp::parse_rfc3339(time)?),
                    None => None,
                };
                write_results.push(update_time);
            }
        }

        Ok(CommitResponse {
            commit_time,
            write_results,
        })
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        encode_value(value)
    }

    fn encode_values(&self, values: &[FirestoreValue]) -> Vec<JsonValue> {
        values.iter().map(encode_value).collect()
    }
}

fn encode_mask(mask: &DocumentMask) -> JsonValue {
    let field_paths: Vec<String> = mask
        .field_paths()
        .iter()
        .map(FieldPath::formatted_name)
        .collect();
    json!({ "fieldPaths": field_paths })
}

fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) if double.is_finite() => json!({ "doubleValue": double }),
        ValueKind::Double(double) if double.is_nan() => json!({ "doubleValue": "NaN" }),
        ValueKind::Double(double) if *double > 0.0 => json!({ "doubleValue": "Infinity" }),
        ValueKind::Double(_) => json!({ "doubleValue": "-Infinity" }),
        ValueKind::Timestamp(timestamp) => json!({ "timestampValue": timestamp.to_rfc3339() }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Bytes(bytes) => json!({ "bytesValue": bytes.to_base64() }),
        ValueKind::Reference(reference) => json!({ "referenceValue": reference }),
        ValueKind::GeoPoint(point) => json!({
            "geoPointValue": {
                "latitude": point.latitude(),
                "longitude": point.longitude(),
            }
        }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => {
            let mut fields = Map::new();
            for (key, value) in map.fields() {
                fields.insert(key.clone(), encode_value(value));
            }
            json!({ "mapValue": { "fields": fields } })
        }
        ValueKind::Sentinel(_) => fail("Sentinel values must be lowered into field transforms"),
    }
}
