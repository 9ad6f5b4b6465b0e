use std::collections::BTreeMap;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::FieldPath;
use crate::firestore::value::{FirestoreValue, ValueKind};
use crate::firestore::write::document::{set_value_at_segments, value_at_segments};
use crate::firestore::write::update_map::UpdateMap;

/// Rejects a list in which one path equals or is a prefix of another.
pub fn validate_no_conflicting_fields(paths: &[FieldPath]) -> FirestoreResult<()> {
    let mut sorted: Vec<&FieldPath> = paths.iter().collect();
    sorted.sort();
    for pair in sorted.windows(2) {
        if pair[0].is_prefix_of(pair[1]) {
            return Err(invalid_argument(format!(
                "Field \"{}\" was specified multiple times.",
                pair[0]
            )));
        }
    }
    Ok(())
}

/// Sorted set of field paths a write is allowed to touch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentMask {
    field_paths: Vec<FieldPath>,
}

impl DocumentMask {
    /// Builds a mask from explicit paths, rejecting duplicates and overlaps.
    pub fn from_field_paths(paths: Vec<FieldPath>) -> FirestoreResult<Self> {
        validate_no_conflicting_fields(&paths)?;
        Ok(Self::sorted(paths))
    }

    /// Mask covering the top-level keys of `data`, used for full replacement.
    pub fn from_top_level_keys(data: &BTreeMap<String, FirestoreValue>) -> FirestoreResult<Self> {
        let paths = data
            .keys()
            .map(|key| FieldPath::new([key.as_str()]))
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(Self::sorted(paths))
    }

    /// Mask of every leaf path in `data`, for `merge: true` writes.
    ///
    /// Deletes and explicitly empty maps are leaves; other sentinels are
    /// left to the transform.
    pub fn from_object(data: &BTreeMap<String, FirestoreValue>) -> FirestoreResult<Self> {
        let mut paths = Vec::new();
        collect_leaf_paths(data, None, &mut paths)?;
        Ok(Self::sorted(paths))
    }

    /// Mask of every supplied update path except those assigned a
    /// server-computed value.
    pub fn from_update_map(map: &UpdateMap) -> Self {
        let paths = map
            .entries()
            .iter()
            .filter(|(_, value)| match value.as_sentinel() {
                Some(sentinel) => sentinel.is_delete(),
                None => true,
            })
            .map(|(path, _)| path.clone())
            .collect();
        Self::sorted(paths)
    }

    fn sorted(mut field_paths: Vec<FieldPath>) -> Self {
        field_paths.sort();
        field_paths.dedup();
        Self { field_paths }
    }

    pub fn field_paths(&self) -> &[FieldPath] {
        &self.field_paths
    }

    pub fn len(&self) -> usize {
        self.field_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths.is_empty()
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.field_paths.binary_search(path).is_ok()
    }

    /// Removes every path that exactly matches one of `paths`.
    pub fn remove_fields(&mut self, paths: &[FieldPath]) {
        self.field_paths.retain(|candidate| !paths.contains(candidate));
    }

    /// Projects `data` onto the mask.
    ///
    /// Every masked path must resolve to a value in `data`.
    pub fn apply_to(
        &self,
        data: &BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
        let mut projected = BTreeMap::new();
        for path in &self.field_paths {
            let value = value_at_segments(data, path.segments()).ok_or_else(|| {
                invalid_argument(format!("Input data is missing for field \"{path}\"."))
            })?;
            set_value_at_segments(&mut projected, path.segments(), value.clone());
        }
        Ok(projected)
    }
}

fn collect_leaf_paths(
    fields: &BTreeMap<String, FirestoreValue>,
    parent: Option<&FieldPath>,
    paths: &mut Vec<FieldPath>,
) -> FirestoreResult<()> {
    for (key, value) in fields {
        let path = match parent {
            Some(parent) => parent.child(key.as_str())?,
            None => FieldPath::new([key.as_str()])?,
        };
        match value.kind() {
            ValueKind::Sentinel(sentinel) => {
                if sentinel.is_delete() {
                    paths.push(path);
                }
            }
            ValueKind::Map(map) if !map.is_empty() => {
                collect_leaf_paths(map.fields(), Some(&path), paths)?
            }
            _ => paths.push(path),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(value: &str) -> FieldPath {
        FieldPath::from_dot_separated(value).unwrap()
    }

    fn rendered(mask: &DocumentMask) -> Vec<String> {
        mask.field_paths()
            .iter()
            .map(FieldPath::canonical_string)
            .collect()
    }

    fn data(entries: Vec<(&str, FirestoreValue)>) -> BTreeMap<String, FirestoreValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn conflicting_fields_are_rejected() {
        let err = validate_no_conflicting_fields(&[path("a.b"), path("c"), path("a")]).unwrap_err();
        assert_eq!(err.message(), "Field \"a\" was specified multiple times.");
        let err = validate_no_conflicting_fields(&[path("x"), path("x")]).unwrap_err();
        assert_eq!(err.message(), "Field \"x\" was specified multiple times.");
        validate_no_conflicting_fields(&[path("a.b"), path("a.c"), path("ab")]).unwrap();
    }

    #[test]
    fn object_mask_collects_leaves() {
        let input = data(vec![
            ("a", FirestoreValue::from_integer(1)),
            (
                "b",
                FirestoreValue::from_map(data(vec![
                    ("c", FirestoreValue::from_bool(true)),
                    ("ts", FirestoreValue::server_timestamp()),
                    ("gone", FirestoreValue::delete()),
                ])),
            ),
            ("empty", FirestoreValue::from_map(BTreeMap::new())),
        ]);
        let mask = DocumentMask::from_object(&input).unwrap();
        assert_eq!(rendered(&mask), ["a", "b.c", "b.gone", "empty"]);
        assert!(mask.contains(&path("b.c")));
        assert!(!mask.contains(&path("b.ts")));
    }

    #[test]
    fn projection_requires_every_field() {
        let input = data(vec![
            (
                "a",
                FirestoreValue::from_map(data(vec![
                    ("b", FirestoreValue::from_integer(1)),
                    ("c", FirestoreValue::from_integer(2)),
                ])),
            ),
            ("d", FirestoreValue::from_integer(3)),
        ]);
        let mask = DocumentMask::from_field_paths(vec![path("a.b"), path("d")]).unwrap();
        let projected = mask.apply_to(&input).unwrap();
        assert_eq!(
            projected["a"],
            FirestoreValue::from_map(data(vec![("b", FirestoreValue::from_integer(1))]))
        );
        assert_eq!(projected["d"], FirestoreValue::from_integer(3));

        let missing = DocumentMask::from_field_paths(vec![path("a.z")]).unwrap();
        let err = missing.apply_to(&input).unwrap_err();
        assert_eq!(err.message(), "Input data is missing for field \"a.z\".");
    }

    #[test]
    fn remove_fields_matches_exactly() {
        let mut mask = DocumentMask::from_field_paths(vec![path("a"), path("b.c")]).unwrap();
        mask.remove_fields(&[path("b"), path("a")]);
        assert_eq!(rendered(&mask), ["b.c"]);
    }
}
