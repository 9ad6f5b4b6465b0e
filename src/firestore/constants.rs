pub(crate) const DEFAULT_DATABASE_ID: &str = "(default)";
pub(crate) const DEFAULT_HOST: &str = "firestore.googleapis.com";
pub(crate) const DEFAULT_API_VERSION: &str = "v1";

/// Maximum number of writes a single batch may hold.
pub const MAX_BATCH_WRITES: usize = 500;

/// Maximum nesting depth of document data.
pub const MAX_DEPTH: usize = 20;

/// A client that has not completed a request for longer than this is
/// assumed to have a cold connection.
pub(crate) const IDLE_TIMEOUT_MS: i64 = 110_000;
