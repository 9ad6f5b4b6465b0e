use crate::firestore::model::Timestamp;

/// Outcome of one logical write in a committed batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteResult {
    write_time: Timestamp,
}

impl WriteResult {
    pub(crate) fn new(write_time: Timestamp) -> Self {
        Self { write_time }
    }

    /// Time at which the server applied the write.
    pub fn write_time(&self) -> Timestamp {
        self.write_time
    }

    pub fn is_equal(&self, other: &WriteResult) -> bool {
        self == other
    }
}
