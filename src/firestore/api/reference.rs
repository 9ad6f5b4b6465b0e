use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

use super::database::Firestore;

const AUTO_ID_LENGTH: usize = 20;

#[derive(Clone, Debug)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "Invalid collection reference. Collection references must have an odd number of segments, but {} has {}.",
                path.canonical_string(),
                path.len()
            )));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, a random 20-character id is generated.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = document_id
            .map(str::to_string)
            .unwrap_or_else(generate_auto_id);
        if id.is_empty() || id.contains('/') {
            return Err(invalid_argument(format!(
                "Invalid document id \"{id}\". Document ids must be non-empty and cannot contain '/'."
            )));
        }
        DocumentReference::new(self.firestore.clone(), self.path.child(id))
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path.canonical_string())
    }
}

/// Location of a single document within a client's database.
#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { firestore, key })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Fully qualified resource name, as sent on the wire.
    pub fn formatted_name(&self) -> String {
        format!(
            "{}/documents/{}",
            self.firestore.database_id().formatted_name(),
            self.key.path().canonical_string()
        )
    }

    pub fn parent(&self) -> FirestoreResult<CollectionReference> {
        CollectionReference::new(self.firestore.clone(), self.key.collection_path())
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path().canonical_string())
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}
