use serde_json::Value as JsonValue;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::Timestamp;
use crate::firestore::validation::{validate_type, ArgumentId, ExpectedType, ValidationOptions};

const EXISTS_KEY: &str = "exists";
const LAST_UPDATE_TIME_KEY: &str = "lastUpdateTime";

/// Server-enforced guard on a write.
///
/// At most one condition can be expressed, so a precondition that both
/// checks existence and pins an update time is unrepresentable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Precondition {
    #[default]
    None,
    /// The document must (or must not) exist.
    Exists(bool),
    /// The document must exist and have been last updated at this time.
    UpdateTime(Timestamp),
}

impl Precondition {
    pub fn exists(exists: bool) -> Self {
        Precondition::Exists(exists)
    }

    pub fn update_time(timestamp: Timestamp) -> Self {
        Precondition::UpdateTime(timestamp)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Precondition::None)
    }

    /// Parses `{"exists": bool}` or `{"lastUpdateTime": "<RFC 3339>"}`.
    ///
    /// An empty object yields [`Precondition::None`].
    pub fn from_json(arg: impl Into<ArgumentId>, value: &JsonValue) -> FirestoreResult<Self> {
        let arg = arg.into();
        let JsonValue::Object(object) = value else {
            return Err(invalid_argument(format!(
                "{arg} is not a valid precondition. Input is not an object."
            )));
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| *key != EXISTS_KEY && *key != LAST_UPDATE_TIME_KEY)
        {
            return Err(invalid_argument(format!(
                "{arg} is not a valid precondition. \"{unknown}\" is not a valid option."
            )));
        }

        let exists = object.get(EXISTS_KEY);
        let last_update_time = object.get(LAST_UPDATE_TIME_KEY);
        validate_type(EXISTS_KEY, exists, ExpectedType::Boolean, ValidationOptions::optional())?;
        validate_type(
            LAST_UPDATE_TIME_KEY,
            last_update_time,
            ExpectedType::String,
            ValidationOptions::optional(),
        )?;

        match (exists, last_update_time) {
            (Some(_), Some(_)) => Err(invalid_argument(format!(
                "{arg} is not a valid precondition. Input specifies more than one precondition."
            ))),
            (Some(exists), None) => Ok(Precondition::Exists(exists.as_bool().unwrap_or_default())),
            (None, Some(time)) => Ok(Precondition::UpdateTime(Timestamp::parse_rfc3339(
                time.as_str().unwrap_or_default(),
            )?)),
            (None, None) => Ok(Precondition::None),
        }
    }

    /// Checks that the precondition can guard an `update`, which always
    /// requires the document to exist.
    pub(crate) fn validate_for_update(&self, arg: impl Into<ArgumentId>) -> FirestoreResult<()> {
        if let Precondition::Exists(false) = self {
            let arg = arg.into();
            return Err(invalid_argument(format!(
                "{arg} is not a valid precondition. Updates require the document to exist, so \"exists\" cannot be false."
            )));
        }
        Ok(())
    }
}
