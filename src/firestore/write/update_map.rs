use std::collections::BTreeMap;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{FieldPath, IntoFieldPath};
use crate::firestore::validation::ArgumentId;
use crate::firestore::value::FirestoreValue;

/// Field-path keyed data supplied to `update`.
///
/// Entries keep the order they were supplied in; conflicts are checked when
/// the data is parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateMap {
    entries: Vec<(FieldPath, FirestoreValue)>,
}

impl UpdateMap {
    /// Builds update data from a map whose keys are dotted field paths.
    pub fn from_data(data: BTreeMap<String, FirestoreValue>) -> FirestoreResult<Self> {
        let entries = data
            .into_iter()
            .map(|(key, value)| Ok((FieldPath::from_dot_separated(&key)?, value)))
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Builds update data from field/value pairs.
    ///
    /// A field that fails to parse is reported by its position in the
    /// flattened `field, value, field, value, ...` argument list.
    pub fn from_pairs<P: IntoFieldPath>(pairs: Vec<(P, FirestoreValue)>) -> FirestoreResult<Self> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (index, (field, value)) in pairs.into_iter().enumerate() {
            let path = field.into_field_path().map_err(|err| {
                let arg = ArgumentId::from(1 + index * 2);
                err.with_prefix(&format!("{arg} is not a valid field path."))
            })?;
            entries.push((path, value));
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, path: FieldPath, value: FirestoreValue) {
        self.entries.push((path, value));
    }

    pub fn entries(&self) -> &[(FieldPath, FirestoreValue)] {
        &self.entries
    }

    pub fn paths(&self) -> Vec<FieldPath> {
        self.entries.iter().map(|(path, _)| path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_dotted_paths() {
        let mut data = BTreeMap::new();
        data.insert("a.b".to_string(), FirestoreValue::from_integer(1));
        let update = UpdateMap::from_data(data).unwrap();
        assert_eq!(update.paths()[0].segments(), &["a", "b"]);

        let mut bad = BTreeMap::new();
        bad.insert("a..b".to_string(), FirestoreValue::null());
        assert!(UpdateMap::from_data(bad).is_err());
    }

    #[test]
    fn pair_errors_name_the_argument() {
        let err = UpdateMap::from_pairs(vec![
            ("ok", FirestoreValue::null()),
            ("bad.", FirestoreValue::null()),
        ])
        .unwrap_err();
        assert!(err
            .message()
            .starts_with("Argument at index 3 is not a valid field path."));
    }

    #[test]
    fn pairs_accept_explicit_paths() {
        let update = UpdateMap::from_pairs(vec![(
            FieldPath::new(["with.dot"]).unwrap(),
            FirestoreValue::from_bool(true),
        )])
        .unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update.paths()[0].len(), 1);
    }
}
