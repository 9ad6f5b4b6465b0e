use std::env;

pub const EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";
pub const FUNCTION_TRIGGER_TYPE_VAR: &str = "FUNCTION_TRIGGER_TYPE";
pub const LOG_LEVEL_VAR: &str = "FIRESTORE_LOG_LEVEL";

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Host of a local Firestore emulator, when one is configured.
pub fn emulator_host() -> Option<String> {
    non_empty_var(EMULATOR_HOST_VAR)
}

/// Returns `true` when running inside a Cloud Functions instance.
///
/// Function instances are frozen between invocations, so their connections
/// are usually cold by the time the next commit arrives.
pub fn is_cloud_functions() -> bool {
    non_empty_var(FUNCTION_TRIGGER_TYPE_VAR).is_some()
}

pub fn log_level() -> Option<String> {
    non_empty_var(LOG_LEVEL_VAR)
}
