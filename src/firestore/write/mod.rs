//! Write value model: what a batch entry writes, which fields it may touch,
//! which fields the server computes, and under which condition it applies.

pub mod document;
pub mod mask;
pub mod operation;
pub mod parse;
pub mod precondition;
pub mod set_options;
pub mod transform;
pub mod update_map;

pub use document::DocumentSnapshot;
pub use mask::{validate_no_conflicting_fields, DocumentMask};
pub use operation::{TransformWrite, Write, WriteOperation};
pub use parse::{parse_create_data, parse_set_data, parse_update_data, ParsedSetData, ParsedUpdateData};
pub use precondition::Precondition;
pub use set_options::SetOptions;
pub use transform::{DocumentTransform, FieldTransform, TransformOperation};
pub use update_map::UpdateMap;
