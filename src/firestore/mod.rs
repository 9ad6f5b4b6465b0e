pub mod api;
mod constants;
pub mod error;
pub mod model;
pub mod remote;
pub mod settings;
pub mod validation;
pub mod value;
pub mod write;

pub use api::{CollectionReference, DocumentReference, Firestore, WriteBatch, WriteResult};
pub use constants::{MAX_BATCH_WRITES, MAX_DEPTH};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{FieldPath, Timestamp};
pub use settings::FirestoreSettings;
pub use value::FirestoreValue;
pub use write::{Precondition, SetOptions};
