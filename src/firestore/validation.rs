//! Argument validation shared by every write entry point.
//!
//! The typed API rules out most shape errors at compile time; the helpers
//! here cover what remains: numeric ranges, enumerations, call arity, and
//! untyped input (`serde_json::Value`) such as documents, set options, and
//! preconditions decoded from configuration or other services. Every failure
//! is reported as `firestore/invalid-argument` with a message that names the
//! offending argument.

use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{FirestoreValue, SentinelValue, ValueKind};

/// Identifies an argument either by its position or by its name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentId {
    Index(usize),
    Name(String),
}

impl Display for ArgumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentId::Index(index) => write!(f, "Argument at index {index}"),
            ArgumentId::Name(name) => write!(f, "Argument \"{name}\""),
        }
    }
}

impl From<usize> for ArgumentId {
    fn from(value: usize) -> Self {
        ArgumentId::Index(value)
    }
}

impl From<&str> for ArgumentId {
    fn from(value: &str) -> Self {
        ArgumentId::Name(value.to_string())
    }
}

impl From<String> for ArgumentId {
    fn from(value: String) -> Self {
        ArgumentId::Name(value)
    }
}

/// Kinds accepted by [`validate_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedType {
    String,
    Number,
    Integer,
    Boolean,
    /// Any structured value (object or array).
    Object,
    /// A key/value object, the only shape accepted as document data.
    PlainObject,
}

impl ExpectedType {
    fn label(self) -> &'static str {
        match self {
            ExpectedType::String => "string",
            ExpectedType::Number => "number",
            ExpectedType::Integer => "integer",
            ExpectedType::Boolean => "boolean",
            ExpectedType::Object => "object",
            ExpectedType::PlainObject => "plain object",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Skip every check when the value is absent.
    pub optional: bool,
}

impl ValidationOptions {
    pub fn optional() -> Self {
        Self { optional: true }
    }
}

/// Options for the numeric validators. Bounds are inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NumberOptions {
    pub optional: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberOptions {
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            optional: false,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            optional: false,
            min: Some(min),
            max: None,
        }
    }
}

fn invalid_type_message(arg: &ArgumentId, expected: ExpectedType) -> String {
    format!("{arg} is not a valid {}.", expected.label())
}

/// Validates that `value` has the `expected` shape.
pub fn validate_type(
    arg: impl Into<ArgumentId>,
    value: Option<&JsonValue>,
    expected: ExpectedType,
    options: ValidationOptions,
) -> FirestoreResult<()> {
    let arg = arg.into();
    let Some(value) = value else {
        if options.optional {
            return Ok(());
        }
        return Err(invalid_argument(invalid_type_message(&arg, expected)));
    };

    let matches = match expected {
        ExpectedType::String => value.is_string(),
        ExpectedType::Number => value.as_f64().is_some_and(f64::is_finite),
        ExpectedType::Integer => is_json_integer(value),
        ExpectedType::Boolean => value.is_boolean(),
        ExpectedType::Object => value.is_object() || value.is_array(),
        ExpectedType::PlainObject => value.is_object(),
    };

    if matches {
        Ok(())
    } else {
        Err(invalid_argument(invalid_type_message(&arg, expected)))
    }
}

fn is_json_integer(value: &JsonValue) -> bool {
    if value.is_i64() || value.is_u64() {
        return true;
    }
    value
        .as_f64()
        .is_some_and(|number| number.is_finite() && number.fract() == 0.0)
}

/// Validates a finite number and, when requested, its inclusive range.
pub fn validate_number(
    arg: impl Into<ArgumentId>,
    value: Option<f64>,
    options: NumberOptions,
) -> FirestoreResult<()> {
    validate_numeric(arg.into(), value, options, ExpectedType::Number)
}

/// Validates an integral number and, when requested, its inclusive range.
pub fn validate_integer(
    arg: impl Into<ArgumentId>,
    value: Option<f64>,
    options: NumberOptions,
) -> FirestoreResult<()> {
    validate_numeric(arg.into(), value, options, ExpectedType::Integer)
}

fn validate_numeric(
    arg: ArgumentId,
    value: Option<f64>,
    options: NumberOptions,
    expected: ExpectedType,
) -> FirestoreResult<()> {
    let Some(value) = value else {
        if options.optional {
            return Ok(());
        }
        return Err(invalid_argument(invalid_type_message(&arg, expected)));
    };

    if !value.is_finite() {
        return Err(invalid_argument(invalid_type_message(&arg, expected)));
    }
    if expected == ExpectedType::Integer && value.fract() != 0.0 {
        return Err(invalid_argument(invalid_type_message(&arg, expected)));
    }

    validate_range(&arg, value, options.min, options.max)
}

fn validate_range(
    arg: &ArgumentId,
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> FirestoreResult<()> {
    let below = min.is_some_and(|min| value < min);
    let above = max.is_some_and(|max| value > max);
    if !below && !above {
        return Ok(());
    }

    let message = match (min, max) {
        (Some(min), Some(max)) => format!(
            "{arg} must be within [{min}, {max}] inclusive, but was: {value}"
        ),
        (Some(min), None) => format!("{arg} must be at least {min}, but was: {value}"),
        (None, Some(max)) => format!("{arg} must be at most {max}, but was: {value}"),
        (None, None) => unreachable!("range violation without bounds"),
    };
    Err(invalid_argument(message))
}

/// Validates that `value` is one of `allowed`.
pub fn validate_enum(
    arg: impl Into<ArgumentId>,
    value: Option<&str>,
    allowed: &[&str],
    options: ValidationOptions,
) -> FirestoreResult<()> {
    let arg = arg.into();
    match value {
        None if options.optional => Ok(()),
        Some(value) if allowed.contains(&value) => Ok(()),
        _ => Err(invalid_argument(format!(
            "{arg} is invalid. Acceptable values are: {}",
            allowed.join(", ")
        ))),
    }
}

/// Validates that a string is present and non-empty.
pub fn validate_non_empty_string(
    arg: impl Into<ArgumentId>,
    value: Option<&str>,
    options: ValidationOptions,
) -> FirestoreResult<()> {
    let arg = arg.into();
    match value {
        None if options.optional => Ok(()),
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(invalid_argument(format!("{arg} must be a non-empty string."))),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

pub fn validate_min_number_of_arguments(
    function_name: &str,
    provided: usize,
    min: usize,
) -> FirestoreResult<()> {
    if provided < min {
        return Err(invalid_argument(format!(
            "Function \"{function_name}()\" requires at least {min} {}.",
            plural(min)
        )));
    }
    Ok(())
}

pub fn validate_max_number_of_arguments(
    function_name: &str,
    provided: usize,
    max: usize,
) -> FirestoreResult<()> {
    if provided > max {
        return Err(invalid_argument(format!(
            "Function \"{function_name}()\" accepts at most {max} {}.",
            plural(max)
        )));
    }
    Ok(())
}

/// Validates the number of arguments a call shape received.
pub fn validate_argument_count(
    function_name: &str,
    provided: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> FirestoreResult<()> {
    if let Some(min) = min {
        validate_min_number_of_arguments(function_name, provided, min)?;
    }
    if let Some(max) = max {
        validate_max_number_of_arguments(function_name, provided, max)?;
    }
    Ok(())
}

/// Value types the client knows by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainType {
    DocumentReference,
    Timestamp,
    GeoPoint,
    Bytes,
    FieldValue,
}

impl DomainType {
    pub fn name(self) -> &'static str {
        match self {
            DomainType::DocumentReference => "DocumentReference",
            DomainType::Timestamp => "Timestamp",
            DomainType::GeoPoint => "GeoPoint",
            DomainType::Bytes => "Bytes",
            DomainType::FieldValue => "FieldValue",
        }
    }
}

/// Coarse description of an input that was rejected where a document was
/// required.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputDescription {
    /// A scalar such as a string, number, boolean or null.
    Primitive(&'static str),
    /// A structured value that is not a key/value object.
    Array,
    /// One of the client's own value types.
    Domain(DomainType),
    /// A key/value object.
    Object,
}

impl InputDescription {
    pub fn of_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => InputDescription::Primitive("null"),
            JsonValue::Bool(_) => InputDescription::Primitive("a boolean"),
            JsonValue::Number(_) => InputDescription::Primitive("a number"),
            JsonValue::String(_) => InputDescription::Primitive("a string"),
            JsonValue::Array(_) => InputDescription::Array,
            JsonValue::Object(_) => InputDescription::Object,
        }
    }

    pub fn of_value(value: &FirestoreValue) -> Self {
        match value.kind() {
            ValueKind::Null => InputDescription::Primitive("null"),
            ValueKind::Boolean(_) => InputDescription::Primitive("a boolean"),
            ValueKind::Integer(_) | ValueKind::Double(_) => InputDescription::Primitive("a number"),
            ValueKind::String(_) => InputDescription::Primitive("a string"),
            ValueKind::Timestamp(_) => InputDescription::Domain(DomainType::Timestamp),
            ValueKind::Bytes(_) => InputDescription::Domain(DomainType::Bytes),
            ValueKind::Reference(_) => InputDescription::Domain(DomainType::DocumentReference),
            ValueKind::GeoPoint(_) => InputDescription::Domain(DomainType::GeoPoint),
            ValueKind::Array(_) => InputDescription::Array,
            ValueKind::Map(_) => InputDescription::Object,
            ValueKind::Sentinel(_) => InputDescription::Domain(DomainType::FieldValue),
        }
    }
}

/// Builds the message used when an input cannot serve as document data.
///
/// A client value type gets a message naming the type, since the fix is to
/// move it under a field; arrays and scalars get a message asking for a
/// key/value object.
pub fn custom_object_message(arg: &ArgumentId, input: &InputDescription) -> String {
    match input {
        InputDescription::Domain(DomainType::FieldValue) => format!(
            "{arg} is not a valid Firestore document. FieldValue sentinels can only be used as field values, not as the document itself."
        ),
        InputDescription::Domain(domain) => format!(
            "{arg} is not a valid Firestore document. Detected an object of type \"{}\" which can only be stored in a field of a document.",
            domain.name()
        ),
        InputDescription::Array => format!(
            "{arg} is not a valid Firestore document. Arrays are not supported as document data; wrap the values in a map."
        ),
        InputDescription::Primitive(found) => format!(
            "{arg} is not a valid Firestore document. Input is not a plain object (found {found})."
        ),
        InputDescription::Object => format!("{arg} is not a valid Firestore document."),
    }
}

/// Returns the user-facing name of a sentinel, as shown in error messages.
pub(crate) fn sentinel_method_name(sentinel: &SentinelValue) -> &'static str {
    match sentinel {
        SentinelValue::Delete => "FieldValue.delete()",
        SentinelValue::ServerTimestamp => "FieldValue.serverTimestamp()",
        SentinelValue::ArrayUnion(_) => "FieldValue.arrayUnion()",
        SentinelValue::ArrayRemove(_) => "FieldValue.arrayRemove()",
        SentinelValue::NumericIncrement(_) => "FieldValue.increment()",
    }
}
