use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::firestore::model::{GeoPoint, Timestamp};
use crate::firestore::value::{ArrayValue, BytesValue, MapValue};

#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreValue {
    kind: ValueKind,
}

/// Write-time markers that never reach the document body.
///
/// `Delete` removes the field it is assigned to; every other variant is
/// computed by the backend and travels as a field transform.
#[derive(Clone, Debug, PartialEq)]
pub enum SentinelValue {
    Delete,
    ServerTimestamp,
    ArrayUnion(Vec<FirestoreValue>),
    ArrayRemove(Vec<FirestoreValue>),
    NumericIncrement(Box<FirestoreValue>),
}

impl SentinelValue {
    pub fn is_delete(&self) -> bool {
        matches!(self, SentinelValue::Delete)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    Bytes(BytesValue),
    Reference(String),
    GeoPoint(GeoPoint),
    Array(ArrayValue),
    Map(MapValue),
    Sentinel(SentinelValue),
}

impl FirestoreValue {
    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_timestamp(value: Timestamp) -> Self {
        Self {
            kind: ValueKind::Timestamp(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_bytes(value: BytesValue) -> Self {
        Self {
            kind: ValueKind::Bytes(value),
        }
    }

    /// Reference to another document, given as its full resource name.
    pub fn from_reference(name: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::Reference(name.into()),
        }
    }

    pub fn from_geo_point(value: GeoPoint) -> Self {
        Self {
            kind: ValueKind::GeoPoint(value),
        }
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Array(ArrayValue::new(values)),
        }
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Map(MapValue::new(map)),
        }
    }

    /// Converts untyped JSON into a value. Integral numbers that fit in
    /// `i64` become integers, every other number becomes a double.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::null(),
            JsonValue::Bool(flag) => Self::from_bool(*flag),
            JsonValue::Number(number) => match number.as_i64() {
                Some(integer) => Self::from_integer(integer),
                None => Self::from_double(number.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(text) => Self::from_string(text.clone()),
            JsonValue::Array(values) => Self::from_array(values.iter().map(Self::from_json).collect()),
            JsonValue::Object(fields) => Self::from_map(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Returns a sentinel that removes the field it is assigned to.
    ///
    /// Only valid in `update` calls and in `set` calls that merge.
    pub fn delete() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::Delete),
        }
    }

    /// Returns a sentinel that instructs Firestore to populate the field with the server timestamp.
    pub fn server_timestamp() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ServerTimestamp),
        }
    }

    /// Returns a sentinel that unions the provided elements with an existing array field.
    pub fn array_union(elements: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ArrayUnion(elements)),
        }
    }

    /// Returns a sentinel that removes the provided elements from an existing array field.
    pub fn array_remove(elements: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ArrayRemove(elements)),
        }
    }

    /// Returns a sentinel that increments the targeted numeric field by `operand`.
    pub fn numeric_increment(operand: FirestoreValue) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::NumericIncrement(Box::new(operand))),
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn as_sentinel(&self) -> Option<&SentinelValue> {
        match &self.kind {
            ValueKind::Sentinel(sentinel) => Some(sentinel),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match &self.kind {
            ValueKind::Map(map) => Some(map),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_basic_values() {
        let v = FirestoreValue::from_string("hello");
        match v.kind() {
            ValueKind::String(value) => assert_eq!(value, "hello"),
            _ => panic!("unexpected kind"),
        }
    }

    #[test]
    fn sentinels_are_tagged() {
        assert!(FirestoreValue::delete().as_sentinel().unwrap().is_delete());
        assert!(!FirestoreValue::server_timestamp()
            .as_sentinel()
            .unwrap()
            .is_delete());
        assert!(FirestoreValue::null().as_sentinel().is_none());
    }

    #[test]
    fn converts_json_numbers_and_nesting() {
        let value = FirestoreValue::from_json(&json!({
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", null],
            "nested": { "flag": true }
        }));
        let map = value.as_map().unwrap().fields();
        assert_eq!(map["count"], FirestoreValue::from_integer(3));
        assert_eq!(map["ratio"], FirestoreValue::from_double(0.5));
        assert_eq!(
            map["tags"],
            FirestoreValue::from_array(vec![
                FirestoreValue::from_string("a"),
                FirestoreValue::null()
            ])
        );
        assert!(map["nested"].as_map().is_some());
    }
}
