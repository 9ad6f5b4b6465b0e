mod array_value;
mod bytes_value;
mod document_input;
mod map_value;
mod value;

pub use array_value::ArrayValue;
pub use bytes_value::BytesValue;
pub use document_input::{document_from_json, document_from_value};
pub use map_value::MapValue;
pub use value::{FirestoreValue, SentinelValue, ValueKind};
