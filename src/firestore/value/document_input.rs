//! Conversion of loosely typed input into document data.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::validation::{custom_object_message, ArgumentId, InputDescription};
use crate::firestore::value::{FirestoreValue, ValueKind};

/// Converts a JSON object into document data.
///
/// Fails with a descriptive message when `value` is not a key/value object.
pub fn document_from_json(
    arg: impl Into<ArgumentId>,
    value: &JsonValue,
) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
    let arg = arg.into();
    match value {
        JsonValue::Object(fields) => Ok(fields
            .iter()
            .map(|(key, value)| (key.clone(), FirestoreValue::from_json(value)))
            .collect()),
        other => Err(invalid_argument(custom_object_message(
            &arg,
            &InputDescription::of_json(other),
        ))),
    }
}

/// Unwraps a map value into document data.
///
/// Domain values (timestamps, references, sentinels, ...) are rejected with a
/// message naming their type.
pub fn document_from_value(
    arg: impl Into<ArgumentId>,
    value: FirestoreValue,
) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
    let arg = arg.into();
    let description = InputDescription::of_value(&value);
    match value.into_kind() {
        ValueKind::Map(map) => Ok(map.into_fields()),
        _ => Err(invalid_argument(custom_object_message(&arg, &description))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::Timestamp;
    use serde_json::json;

    #[test]
    fn json_object_becomes_document() {
        let data = document_from_json("data", &json!({ "name": "Ada", "age": 36 })).unwrap();
        assert_eq!(data["name"], FirestoreValue::from_string("Ada"));
        assert_eq!(data["age"], FirestoreValue::from_integer(36));
    }

    #[test]
    fn json_primitive_is_rejected() {
        let err = document_from_json("data", &json!("Ada")).unwrap_err();
        assert_eq!(
            err.message(),
            "Argument \"data\" is not a valid Firestore document. Input is not a plain object (found a string)."
        );
    }

    #[test]
    fn domain_value_is_rejected_by_type_name() {
        let err = document_from_value(1, FirestoreValue::from_timestamp(Timestamp::new(0, 0)))
            .unwrap_err();
        assert!(err.message().starts_with("Argument at index 1 is not a valid Firestore document."));
        assert!(err.message().contains("\"Timestamp\""));
    }

    #[test]
    fn map_value_is_accepted() {
        let value = FirestoreValue::from_map(BTreeMap::from([(
            "a".to_string(),
            FirestoreValue::from_bool(true),
        )]));
        assert_eq!(document_from_value("data", value).unwrap().len(), 1);
    }
}
