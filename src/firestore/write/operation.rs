use std::collections::BTreeMap;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DocumentKey;
use crate::firestore::value::FirestoreValue;
use crate::firestore::write::document::DocumentSnapshot;
use crate::firestore::write::mask::DocumentMask;
use crate::firestore::write::parse::{parse_create_data, parse_set_data, parse_update_data};
use crate::firestore::write::precondition::Precondition;
use crate::firestore::write::set_options::SetOptions;
use crate::firestore::write::transform::DocumentTransform;
use crate::firestore::write::update_map::UpdateMap;
use crate::util::hard_assert;

/// Document-level write entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    /// Writes `document`. Without a mask the document is replaced; with one,
    /// only the masked fields are touched.
    Update {
        key: DocumentKey,
        document: DocumentSnapshot,
        mask: Option<DocumentMask>,
    },
    Delete {
        key: DocumentKey,
    },
}

impl Write {
    pub fn key(&self) -> &DocumentKey {
        match self {
            Write::Update { key, .. } | Write::Delete { key } => key,
        }
    }
}

/// Field transforms applied to a document after its write entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformWrite {
    pub key: DocumentKey,
    pub transform: DocumentTransform,
}

impl TransformWrite {
    fn non_empty(key: &DocumentKey, transform: DocumentTransform) -> Option<Self> {
        if transform.is_empty() {
            None
        } else {
            Some(Self {
                key: key.clone(),
                transform,
            })
        }
    }
}

/// One logical batch entry, lowered into at most two wire entries.
///
/// The write always precedes the transform on the wire, and the
/// precondition guards whichever entry is sent first.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOperation {
    write: Option<Write>,
    transform: Option<TransformWrite>,
    precondition: Precondition,
}

impl WriteOperation {
    /// Lowers `create` data. The document must not exist yet.
    pub fn create(key: DocumentKey, data: BTreeMap<String, FirestoreValue>) -> FirestoreResult<Self> {
        let parsed = parse_create_data(data)?;
        let transform = TransformWrite::non_empty(&key, parsed.transform);
        let write = Write::Update {
            key,
            document: parsed.snapshot,
            mask: None,
        };
        Ok(Self::from_parts(
            Some(write),
            transform,
            Precondition::Exists(false),
        ))
    }

    /// Lowers `set` data.
    ///
    /// A merging set whose data holds nothing but transforms sends only the
    /// transform. A merging set with no data at all still sends an empty
    /// masked write.
    pub fn set(
        key: DocumentKey,
        data: BTreeMap<String, FirestoreValue>,
        options: &SetOptions,
    ) -> FirestoreResult<Self> {
        let parsed = parse_set_data(data, options)?;
        let has_document_data = parsed.has_document_data();
        let transform = TransformWrite::non_empty(&key, parsed.transform);
        let write = if !parsed.merge {
            Some(Write::Update {
                key,
                document: parsed.snapshot,
                mask: None,
            })
        } else if has_document_data || transform.is_none() {
            Some(Write::Update {
                key,
                document: parsed.snapshot,
                mask: Some(parsed.mask),
            })
        } else {
            None
        };
        Ok(Self::from_parts(write, transform, Precondition::None))
    }

    /// Lowers `update` data. The caller supplies the resolved precondition.
    pub fn update(
        key: DocumentKey,
        data: UpdateMap,
        precondition: Precondition,
    ) -> FirestoreResult<Self> {
        let parsed = parse_update_data(data)?;
        let write = if parsed.has_document_data() {
            Some(Write::Update {
                key: key.clone(),
                document: parsed.snapshot,
                mask: Some(parsed.mask),
            })
        } else {
            None
        };
        let transform = TransformWrite::non_empty(&key, parsed.transform);
        Ok(Self::from_parts(write, transform, precondition))
    }

    pub fn delete(key: DocumentKey, precondition: Precondition) -> Self {
        Self::from_parts(Some(Write::Delete { key }), None, precondition)
    }

    fn from_parts(
        write: Option<Write>,
        transform: Option<TransformWrite>,
        precondition: Precondition,
    ) -> Self {
        hard_assert(
            write.is_some() || transform.is_some(),
            "A write operation needs a write or a transform",
        );
        Self {
            write,
            transform,
            precondition,
        }
    }

    pub fn write(&self) -> Option<&Write> {
        self.write.as_ref()
    }

    pub fn transform(&self) -> Option<&TransformWrite> {
        self.transform.as_ref()
    }

    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    pub fn key(&self) -> &DocumentKey {
        match (&self.write, &self.transform) {
            (Some(write), _) => write.key(),
            (None, Some(transform)) => &transform.key,
            (None, None) => unreachable!("checked on construction"),
        }
    }

    /// Number of entries this operation contributes to a commit request.
    pub fn wire_entry_count(&self) -> usize {
        usize::from(self.write.is_some()) + usize::from(self.transform.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::{FieldPath, Timestamp};

    fn key() -> DocumentKey {
        DocumentKey::from_string("cities/sf").unwrap()
    }

    fn data(entries: Vec<(&str, FirestoreValue)>) -> BTreeMap<String, FirestoreValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn create_guards_against_existing_document() {
        let op = WriteOperation::create(key(), data(vec![("a", FirestoreValue::from_integer(1))]))
            .unwrap();
        assert_eq!(op.precondition(), &Precondition::Exists(false));
        assert_eq!(op.wire_entry_count(), 1);
        assert!(matches!(op.write(), Some(Write::Update { mask: None, .. })));
    }

    #[test]
    fn set_with_plain_field_and_transform_needs_two_entries() {
        let op = WriteOperation::set(
            key(),
            data(vec![
                ("a", FirestoreValue::from_integer(1)),
                ("ts", FirestoreValue::server_timestamp()),
            ]),
            &SetOptions::default(),
        )
        .unwrap();
        assert_eq!(op.wire_entry_count(), 2);
        assert!(op.precondition().is_none());
    }

    #[test]
    fn merge_with_only_transforms_sends_only_transform() {
        let op = WriteOperation::set(
            key(),
            data(vec![("ts", FirestoreValue::server_timestamp())]),
            &SetOptions::merge_all(),
        )
        .unwrap();
        assert!(op.write().is_none());
        assert_eq!(op.wire_entry_count(), 1);
        assert_eq!(op.key(), &key());
    }

    #[test]
    fn merge_with_empty_data_sends_empty_masked_write() {
        let op = WriteOperation::set(key(), BTreeMap::new(), &SetOptions::merge_all()).unwrap();
        match op.write() {
            Some(Write::Update { document, mask: Some(mask), .. }) => {
                assert!(document.is_empty());
                assert!(mask.is_empty());
            }
            other => panic!("unexpected write {other:?}"),
        }
        assert!(op.transform().is_none());
    }

    #[test]
    fn set_without_merge_always_writes() {
        let op = WriteOperation::set(
            key(),
            data(vec![("ts", FirestoreValue::server_timestamp())]),
            &SetOptions::default(),
        )
        .unwrap();
        assert_eq!(op.wire_entry_count(), 2);
    }

    #[test]
    fn update_with_only_transform_skips_write() {
        let update = UpdateMap::from_pairs(vec![(
            "n",
            FirestoreValue::numeric_increment(FirestoreValue::from_integer(1)),
        )])
        .unwrap();
        let op = WriteOperation::update(key(), update, Precondition::Exists(true)).unwrap();
        assert!(op.write().is_none());
        assert_eq!(op.wire_entry_count(), 1);
        assert_eq!(op.precondition(), &Precondition::Exists(true));
    }

    #[test]
    fn update_with_delete_writes_mask() {
        let update = UpdateMap::from_pairs(vec![("gone", FirestoreValue::delete())]).unwrap();
        let op = WriteOperation::update(
            key(),
            update,
            Precondition::UpdateTime(Timestamp::new(1, 0)),
        )
        .unwrap();
        match op.write() {
            Some(Write::Update { mask: Some(mask), document, .. }) => {
                assert!(document.is_empty());
                assert_eq!(mask.field_paths(), &[FieldPath::from_dot_separated("gone").unwrap()]);
            }
            other => panic!("unexpected write {other:?}"),
        }
    }

    #[test]
    fn delete_carries_precondition() {
        let op = WriteOperation::delete(key(), Precondition::Exists(true));
        assert_eq!(op.wire_entry_count(), 1);
        assert!(matches!(op.write(), Some(Write::Delete { .. })));
    }
}
