//! Pure pieces of the commit protocol: the idle heuristic and the mapping of
//! wire results back onto logical operations.

use crate::firestore::constants::IDLE_TIMEOUT_MS;
use crate::firestore::model::Timestamp;
use crate::firestore::remote::serializer::CommitResponse;
use crate::firestore::write::WriteOperation;
use crate::util::hard_assert;

/// Decides whether a commit should first open a transaction.
///
/// A client that prefers transactions wraps its commit when it has never
/// completed a request, or when the last one finished more than
/// [`IDLE_TIMEOUT_MS`] ago. Both times are in milliseconds since the epoch.
pub fn should_begin_transaction(
    prefer_transactions: bool,
    last_successful_request_ms: Option<i64>,
    now_ms: i64,
) -> bool {
    if !prefer_transactions {
        return false;
    }
    match last_successful_request_ms {
        None => true,
        Some(last) => now_ms - last > IDLE_TIMEOUT_MS,
    }
}

/// Maps the flat per-wire-entry results onto one update time per operation.
///
/// An operation that produced a write and a transform takes the transform's
/// time. A missing update time falls back to the commit time.
///
/// # Panics
///
/// Panics when the server returned a different number of results than the
/// number of wire entries sent, which breaks the commit contract.
pub fn demultiplex_write_results(
    operations: &[WriteOperation],
    response: &CommitResponse,
) -> Vec<Timestamp> {
    let expected: usize = operations
        .iter()
        .map(WriteOperation::wire_entry_count)
        .sum();
    if expected > 0 {
        hard_assert(
            response.write_results.len() == expected,
            format!(
                "Expected one write result per write ({}), but got {}.",
                expected,
                response.write_results.len()
            ),
        );
    }

    let mut results = response.write_results.iter();
    operations
        .iter()
        .map(|operation| {
            let mut update_time = None;
            for _ in 0..operation.wire_entry_count() {
                update_time = results.next().copied().flatten();
            }
            update_time.unwrap_or(response.commit_time)
        })
        .collect()
}
