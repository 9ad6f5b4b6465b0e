use std::collections::BTreeMap;

use crate::firestore::model::FieldPath;
use crate::firestore::value::{FirestoreValue, MapValue, ValueKind};
use crate::firestore::write::update_map::UpdateMap;

/// Document body sent to the backend, with every sentinel removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentSnapshot {
    fields: BTreeMap<String, FirestoreValue>,
}

impl DocumentSnapshot {
    /// Builds the body for `create` and `set` data.
    ///
    /// Maps that were empty in the input are kept. Maps that only held
    /// sentinels are dropped together with their key.
    pub fn from_object(data: &BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            fields: strip_map(data),
        }
    }

    /// Builds the body for `update` data by expanding every field path into
    /// nested maps.
    ///
    /// A path whose value strips to nothing still writes an empty map, so
    /// the update mask and the body agree.
    pub fn from_update_map(map: &UpdateMap) -> Self {
        let mut fields = BTreeMap::new();
        for (path, value) in map.entries() {
            if value.as_sentinel().is_some() {
                continue;
            }
            let plain = strip_sentinels(value).unwrap_or_else(empty_map);
            set_value_at_segments(&mut fields, path.segments(), plain);
        }
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn value(&self, path: &FieldPath) -> Option<&FirestoreValue> {
        value_at_segments(&self.fields, path.segments())
    }

    pub fn to_map_value(&self) -> MapValue {
        MapValue::new(self.fields.clone())
    }
}

fn empty_map() -> FirestoreValue {
    FirestoreValue::from_map(BTreeMap::new())
}

fn strip_map(fields: &BTreeMap<String, FirestoreValue>) -> BTreeMap<String, FirestoreValue> {
    fields
        .iter()
        .filter_map(|(key, value)| strip_sentinels(value).map(|value| (key.clone(), value)))
        .collect()
}

fn strip_sentinels(value: &FirestoreValue) -> Option<FirestoreValue> {
    match value.kind() {
        ValueKind::Sentinel(_) => None,
        ValueKind::Map(map) if map.is_empty() => Some(value.clone()),
        ValueKind::Map(map) => {
            let stripped = strip_map(map.fields());
            if stripped.is_empty() {
                None
            } else {
                Some(FirestoreValue::from_map(stripped))
            }
        }
        _ => Some(value.clone()),
    }
}

pub(crate) fn value_at_segments<'a>(
    fields: &'a BTreeMap<String, FirestoreValue>,
    segments: &[String],
) -> Option<&'a FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = fields.get(first)?;
    if rest.is_empty() {
        return Some(value);
    }
    match value.kind() {
        ValueKind::Map(map) => value_at_segments(map.fields(), rest),
        _ => None,
    }
}

pub(crate) fn set_value_at_segments(
    fields: &mut BTreeMap<String, FirestoreValue>,
    segments: &[String],
    value: FirestoreValue,
) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }
    let entry = fields.entry(first.clone()).or_insert_with(empty_map);
    let mut child = match entry.kind() {
        ValueKind::Map(map) => map.fields().clone(),
        _ => BTreeMap::new(),
    };
    set_value_at_segments(&mut child, rest, value);
    *entry = FirestoreValue::from_map(child);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, FirestoreValue)>) -> FirestoreValue {
        FirestoreValue::from_map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn document(entries: Vec<(&str, FirestoreValue)>) -> BTreeMap<String, FirestoreValue> {
        match map(entries).into_kind() {
            ValueKind::Map(map) => map.into_fields(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn strips_sentinels_from_object_data() {
        let data = document(vec![
            ("a", FirestoreValue::from_integer(1)),
            ("ts", FirestoreValue::server_timestamp()),
            ("only_sentinels", map(vec![("x", FirestoreValue::server_timestamp())])),
            ("explicit_empty", map(vec![])),
            (
                "nested",
                map(vec![
                    ("keep", FirestoreValue::from_bool(true)),
                    ("drop", FirestoreValue::delete()),
                ]),
            ),
        ]);
        let snapshot = DocumentSnapshot::from_object(&data);
        let keys: Vec<_> = snapshot.fields().keys().cloned().collect();
        assert_eq!(keys, ["a", "explicit_empty", "nested"]);
        assert_eq!(
            snapshot.fields()["nested"],
            map(vec![("keep", FirestoreValue::from_bool(true))])
        );
    }

    #[test]
    fn update_paths_expand_into_nested_maps() {
        let mut update = UpdateMap::default();
        update.insert(
            FieldPath::from_dot_separated("a.b").unwrap(),
            FirestoreValue::from_integer(1),
        );
        update.insert(
            FieldPath::from_dot_separated("a.c").unwrap(),
            FirestoreValue::from_string("x"),
        );
        update.insert(
            FieldPath::from_dot_separated("gone").unwrap(),
            FirestoreValue::delete(),
        );
        update.insert(
            FieldPath::from_dot_separated("stamped").unwrap(),
            map(vec![("at", FirestoreValue::server_timestamp())]),
        );

        let snapshot = DocumentSnapshot::from_update_map(&update);
        assert_eq!(
            snapshot.fields()["a"],
            map(vec![
                ("b", FirestoreValue::from_integer(1)),
                ("c", FirestoreValue::from_string("x")),
            ])
        );
        assert!(!snapshot.fields().contains_key("gone"));
        assert_eq!(snapshot.fields()["stamped"], map(vec![]));
        assert_eq!(
            snapshot.value(&FieldPath::from_dot_separated("a.c").unwrap()),
            Some(&FirestoreValue::from_string("x"))
        );
    }
}
