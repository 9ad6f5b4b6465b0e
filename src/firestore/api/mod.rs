mod database;
mod reference;
mod write_batch;
mod write_result;

pub use database::Firestore;
pub use reference::{CollectionReference, DocumentReference};
pub use write_batch::WriteBatch;
pub use write_result::WriteResult;
