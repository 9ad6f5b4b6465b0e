use std::collections::BTreeMap;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::FieldPath;
use crate::firestore::value::{FirestoreValue, SentinelValue, ValueKind};
use crate::firestore::write::update_map::UpdateMap;

/// Server-side computation applied to a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformOperation {
    ServerTimestamp,
    ArrayUnion(Vec<FirestoreValue>),
    ArrayRemove(Vec<FirestoreValue>),
    NumericIncrement(FirestoreValue),
}

impl TransformOperation {
    /// Maps a sentinel onto its transform. `Delete` has none; it is carried
    /// by the update mask instead.
    pub fn from_sentinel(sentinel: &SentinelValue) -> Option<Self> {
        match sentinel {
            SentinelValue::Delete => None,
            SentinelValue::ServerTimestamp => Some(TransformOperation::ServerTimestamp),
            SentinelValue::ArrayUnion(elements) => {
                Some(TransformOperation::ArrayUnion(elements.clone()))
            }
            SentinelValue::ArrayRemove(elements) => {
                Some(TransformOperation::ArrayRemove(elements.clone()))
            }
            SentinelValue::NumericIncrement(operand) => {
                Some(TransformOperation::NumericIncrement((**operand).clone()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldTransform {
    field_path: FieldPath,
    operation: TransformOperation,
}

impl FieldTransform {
    pub fn new(field_path: FieldPath, operation: TransformOperation) -> Self {
        Self {
            field_path,
            operation,
        }
    }

    pub fn field_path(&self) -> &FieldPath {
        &self.field_path
    }

    pub fn operation(&self) -> &TransformOperation {
        &self.operation
    }
}

/// Ordered collection of field transforms, keyed by full field path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentTransform {
    transforms: BTreeMap<FieldPath, TransformOperation>,
}

impl DocumentTransform {
    /// Collects transforms from nested document data.
    pub fn from_object(data: &BTreeMap<String, FirestoreValue>) -> FirestoreResult<Self> {
        let mut transforms = BTreeMap::new();
        for (key, value) in data {
            collect_transforms(value, FieldPath::new([key.as_str()])?, &mut transforms)?;
        }
        Ok(Self { transforms })
    }

    /// Collects transforms from update data, including sentinels nested
    /// under a path's map value.
    pub fn from_update_map(map: &UpdateMap) -> FirestoreResult<Self> {
        let mut transforms = BTreeMap::new();
        for (path, value) in map.entries() {
            collect_transforms(value, path.clone(), &mut transforms)?;
        }
        Ok(Self { transforms })
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn field_paths(&self) -> Vec<FieldPath> {
        self.transforms.keys().cloned().collect()
    }

    pub fn field_transforms(&self) -> Vec<FieldTransform> {
        self.transforms
            .iter()
            .map(|(path, operation)| FieldTransform::new(path.clone(), operation.clone()))
            .collect()
    }
}

fn collect_transforms(
    value: &FirestoreValue,
    path: FieldPath,
    transforms: &mut BTreeMap<FieldPath, TransformOperation>,
) -> FirestoreResult<()> {
    match value.kind() {
        ValueKind::Sentinel(sentinel) => {
            if let Some(operation) = TransformOperation::from_sentinel(sentinel) {
                transforms.insert(path, operation);
            }
        }
        ValueKind::Map(map) => {
            for (key, child) in map.fields() {
                collect_transforms(child, path.child(key.as_str())?, transforms)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_nested_transforms_in_path_order() {
        let mut nested = BTreeMap::new();
        nested.insert("count".to_string(), FirestoreValue::numeric_increment(FirestoreValue::from_integer(2)));
        nested.insert("plain".to_string(), FirestoreValue::from_integer(1));
        let mut data = BTreeMap::new();
        data.insert("z".to_string(), FirestoreValue::server_timestamp());
        data.insert("stats".to_string(), FirestoreValue::from_map(nested));
        data.insert("gone".to_string(), FirestoreValue::delete());

        let transform = DocumentTransform::from_object(&data).unwrap();
        let paths: Vec<_> = transform
            .field_paths()
            .iter()
            .map(FieldPath::canonical_string)
            .collect();
        assert_eq!(paths, ["stats.count", "z"]);
        assert_eq!(
            transform.field_transforms()[0].operation(),
            &TransformOperation::NumericIncrement(FirestoreValue::from_integer(2))
        );
    }

    #[test]
    fn update_paths_are_used_verbatim() {
        let mut update = UpdateMap::default();
        update.insert(
            FieldPath::from_dot_separated("a.b").unwrap(),
            FirestoreValue::array_union(vec![FirestoreValue::from_integer(1)]),
        );
        update.insert(
            FieldPath::from_dot_separated("c").unwrap(),
            FirestoreValue::from_integer(1),
        );
        let transform = DocumentTransform::from_update_map(&update).unwrap();
        assert_eq!(transform.len(), 1);
        assert_eq!(
            transform.field_transforms()[0].field_path(),
            &FieldPath::from_dot_separated("a.b").unwrap()
        );
    }
}
