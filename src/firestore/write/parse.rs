//! Validation and lowering of user data into the write value model.

use std::collections::BTreeMap;

use crate::firestore::constants::MAX_DEPTH;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::FieldPath;
use crate::firestore::validation::sentinel_method_name;
use crate::firestore::value::{FirestoreValue, SentinelValue, ValueKind};
use crate::firestore::write::document::DocumentSnapshot;
use crate::firestore::write::mask::{validate_no_conflicting_fields, DocumentMask};
use crate::firestore::write::set_options::SetOptions;
use crate::firestore::write::transform::DocumentTransform;
use crate::firestore::write::update_map::UpdateMap;

/// Where `FieldValue.delete()` may appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeletePolicy {
    Forbidden,
    Anywhere,
    /// Only as the direct value of an update path.
    RootOnly,
}

#[derive(Clone, Copy, Debug)]
struct ParseContext {
    method: &'static str,
    deletes: DeletePolicy,
}

/// Lowered `create` or `set` data.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSetData {
    pub snapshot: DocumentSnapshot,
    pub mask: DocumentMask,
    pub transform: DocumentTransform,
    pub merge: bool,
}

impl ParsedSetData {
    pub fn has_document_data(&self) -> bool {
        !self.snapshot.is_empty() || !self.mask.is_empty()
    }
}

/// Lowered `update` data.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedUpdateData {
    pub snapshot: DocumentSnapshot,
    pub mask: DocumentMask,
    pub transform: DocumentTransform,
}

impl ParsedUpdateData {
    pub fn has_document_data(&self) -> bool {
        !self.snapshot.is_empty() || !self.mask.is_empty()
    }
}

pub fn parse_create_data(data: BTreeMap<String, FirestoreValue>) -> FirestoreResult<ParsedSetData> {
    let context = ParseContext {
        method: "create",
        deletes: DeletePolicy::Forbidden,
    };
    validate_document(&data, context)?;
    Ok(ParsedSetData {
        snapshot: DocumentSnapshot::from_object(&data),
        mask: DocumentMask::from_top_level_keys(&data)?,
        transform: DocumentTransform::from_object(&data)?,
        merge: false,
    })
}

pub fn parse_set_data(
    data: BTreeMap<String, FirestoreValue>,
    options: &SetOptions,
) -> FirestoreResult<ParsedSetData> {
    options.validate()?;
    let merge = options.is_merge();
    let context = ParseContext {
        method: "set",
        deletes: if merge {
            DeletePolicy::Anywhere
        } else {
            DeletePolicy::Forbidden
        },
    };
    validate_document(&data, context)?;

    let (data, field_mask) = match options.field_mask() {
        Some(fields) => {
            let mask = DocumentMask::from_field_paths(fields.to_vec())?;
            (mask.apply_to(&data)?, Some(mask))
        }
        None => (data, None),
    };

    let transform = DocumentTransform::from_object(&data)?;
    let mask = match field_mask {
        Some(mut mask) => {
            mask.remove_fields(&transform.field_paths());
            mask
        }
        None if merge => DocumentMask::from_object(&data)?,
        None => DocumentMask::from_top_level_keys(&data)?,
    };

    Ok(ParsedSetData {
        snapshot: DocumentSnapshot::from_object(&data),
        mask,
        transform,
        merge,
    })
}

pub fn parse_update_data(map: UpdateMap) -> FirestoreResult<ParsedUpdateData> {
    if map.is_empty() {
        return Err(invalid_argument("At least one field must be updated."));
    }
    let context = ParseContext {
        method: "update",
        deletes: DeletePolicy::RootOnly,
    };
    for (path, value) in map.entries() {
        validate_value(value, path, context, true)?;
    }
    validate_no_conflicting_fields(&map.paths())?;

    Ok(ParsedUpdateData {
        snapshot: DocumentSnapshot::from_update_map(&map),
        mask: DocumentMask::from_update_map(&map),
        transform: DocumentTransform::from_update_map(&map)?,
    })
}

fn validate_document(
    data: &BTreeMap<String, FirestoreValue>,
    context: ParseContext,
) -> FirestoreResult<()> {
    for (key, value) in data {
        validate_value(value, &FieldPath::new([key.as_str()])?, context, false)?;
    }
    Ok(())
}

fn validate_value(
    value: &FirestoreValue,
    path: &FieldPath,
    context: ParseContext,
    is_update_root: bool,
) -> FirestoreResult<()> {
    if path.len() > MAX_DEPTH {
        return Err(invalid_argument(format!(
            "Input object is deeper than {MAX_DEPTH} levels (found in field \"{path}\")."
        )));
    }
    match value.kind() {
        ValueKind::Sentinel(SentinelValue::Delete) => match context.deletes {
            DeletePolicy::Anywhere => Ok(()),
            DeletePolicy::RootOnly if is_update_root => Ok(()),
            DeletePolicy::RootOnly => Err(invalid_argument(format!(
                "FieldValue.delete() can only appear at the top level of your update data (found in field \"{path}\")."
            ))),
            DeletePolicy::Forbidden => Err(invalid_argument(format!(
                "FieldValue.delete() cannot be used with {}() unless merging (found in field \"{path}\").",
                context.method
            ))),
        },
        ValueKind::Sentinel(sentinel) => validate_transform_operand(sentinel, path),
        ValueKind::Map(map) => {
            for (key, child) in map.fields() {
                validate_value(child, &path.child(key.as_str())?, context, false)?;
            }
            Ok(())
        }
        ValueKind::Array(array) => {
            for element in array.values() {
                assert_no_sentinel(element, path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_transform_operand(sentinel: &SentinelValue, path: &FieldPath) -> FirestoreResult<()> {
    match sentinel {
        SentinelValue::ArrayUnion(elements) | SentinelValue::ArrayRemove(elements) => {
            for element in elements {
                assert_no_sentinel(element, path).map_err(|_| {
                    invalid_argument(format!(
                        "{} elements cannot contain FieldValue sentinels (found in field \"{path}\").",
                        sentinel_method_name(sentinel)
                    ))
                })?;
            }
            Ok(())
        }
        SentinelValue::NumericIncrement(operand) => match operand.kind() {
            ValueKind::Integer(_) => Ok(()),
            ValueKind::Double(value) if value.is_finite() => Ok(()),
            _ => Err(invalid_argument(format!(
                "FieldValue.increment() requires a finite numeric operand (found in field \"{path}\")."
            ))),
        },
        SentinelValue::Delete | SentinelValue::ServerTimestamp => Ok(()),
    }
}

fn assert_no_sentinel(value: &FirestoreValue, path: &FieldPath) -> FirestoreResult<()> {
    match value.kind() {
        ValueKind::Sentinel(sentinel) => Err(invalid_argument(format!(
            "{} cannot be used inside arrays (found in field \"{path}\").",
            sentinel_method_name(sentinel)
        ))),
        ValueKind::Array(array) => array
            .values()
            .iter()
            .try_for_each(|element| assert_no_sentinel(element, path)),
        ValueKind::Map(map) => map
            .fields()
            .values()
            .try_for_each(|child| assert_no_sentinel(child, path)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(value: &str) -> FieldPath {
        FieldPath::from_dot_separated(value).unwrap()
    }

    fn data(entries: Vec<(&str, FirestoreValue)>) -> BTreeMap<String, FirestoreValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    fn nested(depth: usize) -> FirestoreValue {
        (0..depth).fold(FirestoreValue::from_integer(1), |value, _| {
            FirestoreValue::from_map(data(vec![("n", value)]))
        })
    }

    #[test]
    fn delete_requires_merge_for_set() {
        let input = data(vec![("a", FirestoreValue::delete())]);
        let err = parse_set_data(input.clone(), &SetOptions::default()).unwrap_err();
        assert!(err.message().contains("cannot be used with set() unless merging"));
        assert!(parse_create_data(input.clone()).is_err());

        let parsed = parse_set_data(input, &SetOptions::merge_all()).unwrap();
        assert!(parsed.snapshot.is_empty());
        assert_eq!(parsed.mask.field_paths(), &[path("a")]);
    }

    #[test]
    fn nested_delete_rejected_in_update() {
        let update = UpdateMap::from_pairs(vec![(
            "a",
            FirestoreValue::from_map(data(vec![("b", FirestoreValue::delete())])),
        )])
        .unwrap();
        let err = parse_update_data(update).unwrap_err();
        assert!(err.message().contains("top level of your update data"));

        let update = UpdateMap::from_pairs(vec![("a.b", FirestoreValue::delete())]).unwrap();
        let parsed = parse_update_data(update).unwrap();
        assert_eq!(parsed.mask.field_paths(), &[path("a.b")]);
        assert!(parsed.snapshot.is_empty());
    }

    #[test]
    fn sentinels_rejected_in_arrays() {
        let input = data(vec![(
            "list",
            FirestoreValue::from_array(vec![FirestoreValue::server_timestamp()]),
        )]);
        let err = parse_set_data(input, &SetOptions::default()).unwrap_err();
        assert!(err.message().contains("cannot be used inside arrays"));

        let input = data(vec![(
            "list",
            FirestoreValue::array_union(vec![FirestoreValue::delete()]),
        )]);
        let err = parse_create_data(input).unwrap_err();
        assert!(err
            .message()
            .starts_with("FieldValue.arrayUnion() elements cannot contain"));
    }

    #[test]
    fn increment_operand_must_be_finite_number() {
        for operand in [
            FirestoreValue::from_string("1"),
            FirestoreValue::from_double(f64::NAN),
            FirestoreValue::from_double(f64::INFINITY),
        ] {
            let input = data(vec![("n", FirestoreValue::numeric_increment(operand))]);
            assert!(parse_create_data(input).is_err());
        }
        let input = data(vec![(
            "n",
            FirestoreValue::numeric_increment(FirestoreValue::from_double(0.5)),
        )]);
        assert_eq!(parse_create_data(input).unwrap().transform.len(), 1);
    }

    #[test]
    fn depth_limit_is_enforced() {
        parse_create_data(data(vec![("root", nested(MAX_DEPTH - 1))])).unwrap();
        let err = parse_create_data(data(vec![("root", nested(MAX_DEPTH))])).unwrap_err();
        assert!(err.message().starts_with("Input object is deeper than 20 levels"));
    }

    #[test]
    fn merge_fields_project_and_drop_transform_paths() {
        let input = data(vec![
            ("a", FirestoreValue::from_integer(1)),
            ("b", FirestoreValue::from_integer(2)),
            ("ts", FirestoreValue::server_timestamp()),
        ]);
        let options = SetOptions::merge_fields(["a", "ts"]).unwrap();
        let parsed = parse_set_data(input.clone(), &options).unwrap();
        assert_eq!(parsed.mask.field_paths(), &[path("a")]);
        assert_eq!(parsed.transform.len(), 1);
        assert!(!parsed.snapshot.fields().contains_key("b"));

        let options = SetOptions::merge_fields(["missing"]).unwrap();
        let err = parse_set_data(input, &options).unwrap_err();
        assert_eq!(err.message(), "Input data is missing for field \"missing\".");
    }

    #[test]
    fn update_requires_fields_and_rejects_conflicts() {
        let err = parse_update_data(UpdateMap::default()).unwrap_err();
        assert_eq!(err.message(), "At least one field must be updated.");

        let update = UpdateMap::from_pairs(vec![
            ("a.b", FirestoreValue::from_integer(1)),
            ("a", FirestoreValue::from_integer(2)),
        ])
        .unwrap();
        let err = parse_update_data(update).unwrap_err();
        assert_eq!(err.message(), "Field \"a\" was specified multiple times.");
    }

    #[test]
    fn update_mask_skips_transform_paths() {
        let update = UpdateMap::from_pairs(vec![
            ("count", FirestoreValue::numeric_increment(FirestoreValue::from_integer(1))),
            ("name", FirestoreValue::from_string("x")),
        ])
        .unwrap();
        let parsed = parse_update_data(update).unwrap();
        assert_eq!(parsed.mask.field_paths(), &[path("name")]);
        assert_eq!(parsed.transform.field_paths(), vec![path("count")]);
    }
}
