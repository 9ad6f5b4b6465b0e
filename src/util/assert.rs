use crate::util::CONSTANTS;

/// Panics with an internal-assertion message when `condition` is false.
///
/// Reserved for states that indicate a bug in the client or a backend
/// response that breaks the protocol, never for user input.
pub fn hard_assert(condition: bool, message: impl AsRef<str>) {
    if !condition {
        fail(message);
    }
}

/// Panics unconditionally with an internal-assertion message.
pub fn fail(message: impl AsRef<str>) -> ! {
    panic!("{}", assertion_error(message));
}

pub fn assertion_error(message: impl AsRef<str>) -> String {
    format!(
        "Firestore ({}) INTERNAL ASSERT FAILED: {}",
        CONSTANTS.sdk_version,
        message.as_ref()
    )
}
