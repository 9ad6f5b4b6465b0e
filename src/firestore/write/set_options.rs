use serde_json::Value as JsonValue;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{FieldPath, IntoFieldPath};
use crate::firestore::validation::{validate_type, ArgumentId, ExpectedType, ValidationOptions};
use crate::firestore::write::mask::validate_no_conflicting_fields;

/// Options that configure the behaviour of `set` writes.
///
/// `merge` and `merge_fields` are mutually exclusive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOptions {
    /// When `true`, only the fields present in the data are written and all
    /// other fields of the existing document are preserved.
    pub merge: bool,
    /// Explicit allow-list of the fields to write. Data outside these paths is
    /// dropped before it reaches the server.
    pub merge_fields: Option<Vec<FieldPath>>,
}

impl SetOptions {
    /// Builds set options that merge every field present in the provided data.
    pub fn merge_all() -> Self {
        Self {
            merge: true,
            merge_fields: None,
        }
    }

    /// Builds set options that merge only the specified field paths.
    pub fn merge_fields<I, P>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: IntoFieldPath,
    {
        let fields = fields
            .into_iter()
            .map(IntoFieldPath::into_field_path)
            .collect::<FirestoreResult<Vec<_>>>()?;
        let options = Self {
            merge: false,
            merge_fields: Some(fields),
        };
        options.validate()?;
        Ok(options)
    }

    /// Parses `{"merge": bool}` or `{"mergeFields": ["a.b", ...]}`.
    pub fn from_json(arg: impl Into<ArgumentId>, value: &JsonValue) -> FirestoreResult<Self> {
        let arg = arg.into();
        let JsonValue::Object(object) = value else {
            return Err(invalid_argument(format!(
                "{arg} is not a valid SetOptions. Input is not an object."
            )));
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| *key != "merge" && *key != "mergeFields")
        {
            return Err(invalid_argument(format!(
                "{arg} is not a valid SetOptions. \"{unknown}\" is not a valid option."
            )));
        }

        let merge = object.get("merge");
        validate_type("merge", merge, ExpectedType::Boolean, ValidationOptions::optional())?;

        let merge_fields = match object.get("mergeFields") {
            None => None,
            Some(JsonValue::Array(entries)) => {
                let mut fields = Vec::with_capacity(entries.len());
                for (index, entry) in entries.iter().enumerate() {
                    let element = format!("mergeFields[{index}]");
                    validate_type(
                        element.as_str(),
                        Some(entry),
                        ExpectedType::String,
                        ValidationOptions::default(),
                    )?;
                    fields.push(FieldPath::from_dot_separated(entry.as_str().unwrap_or_default())?);
                }
                Some(fields)
            }
            Some(_) => {
                return Err(invalid_argument(format!(
                    "{arg} is not a valid SetOptions. \"mergeFields\" must be an array of field paths."
                )))
            }
        };

        let options = Self {
            merge: merge.and_then(JsonValue::as_bool).unwrap_or(false),
            merge_fields,
        };
        options.validate_as(&arg)?;
        Ok(options)
    }

    /// Indicates whether the write should behave like a merge.
    pub fn is_merge(&self) -> bool {
        self.merge || self.merge_fields.is_some()
    }

    /// Returns the explicit field mask, if any.
    pub fn field_mask(&self) -> Option<&[FieldPath]> {
        self.merge_fields.as_deref()
    }

    pub fn validate(&self) -> FirestoreResult<()> {
        self.validate_as(&ArgumentId::from("options"))
    }

    fn validate_as(&self, arg: &ArgumentId) -> FirestoreResult<()> {
        if self.merge && self.merge_fields.is_some() {
            return Err(invalid_argument(format!(
                "{arg} is not a valid SetOptions. You cannot specify both \"merge\" and \"mergeFields\"."
            )));
        }
        if let Some(fields) = &self.merge_fields {
            if fields.is_empty() {
                return Err(invalid_argument(
                    "merge_fields requires at least one field path",
                ));
            }
            validate_no_conflicting_fields(fields)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_and_merge_fields_are_exclusive() {
        let options = SetOptions {
            merge: true,
            merge_fields: Some(vec![FieldPath::from_dot_separated("a").unwrap()]),
        };
        let err = options.validate().unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");

        let err = SetOptions::from_json("options", &json!({ "merge": true, "mergeFields": ["a"] }))
            .unwrap_err();
        assert!(err.message().contains("cannot specify both"));
    }

    #[test]
    fn merge_fields_reject_ambiguity_and_emptiness() {
        let err = SetOptions::merge_fields(["a", "a.b"]).unwrap_err();
        assert_eq!(err.message(), "Field \"a\" was specified multiple times.");
        assert!(SetOptions::merge_fields(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn parses_json_options() {
        let options = SetOptions::from_json("options", &json!({ "mergeFields": ["a.b", "c"] }))
            .unwrap();
        assert!(options.is_merge());
        assert_eq!(options.field_mask().unwrap().len(), 2);

        let options = SetOptions::from_json("options", &json!({ "merge": false })).unwrap();
        assert!(!options.is_merge());

        let err = SetOptions::from_json("options", &json!({ "mergeFields": [1] })).unwrap_err();
        assert_eq!(err.message(), "Argument \"mergeFields[0]\" is not a valid string.");
        assert!(SetOptions::from_json("options", &json!({ "merge": "yes" })).is_err());
        assert!(SetOptions::from_json("options", &json!({ "mergeFields": "a" })).is_err());
    }
}
