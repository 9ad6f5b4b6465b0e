use reqwest::StatusCode;
use serde::Deserialize;

use crate::firestore::error::{
    aborted, already_exists, deadline_exceeded, failed_precondition, internal_error,
    invalid_argument, not_found, permission_denied, resource_exhausted, unauthenticated,
    unavailable, FirestoreError,
};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a failed HTTP response onto a [`FirestoreError`].
///
/// The canonical status in a Google error body wins over the HTTP status,
/// since several statuses share one HTTP code (409 is both `ABORTED` and
/// `ALREADY_EXISTS`).
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    let payload = extract_error_payload(body);
    let message = payload
        .as_ref()
        .and_then(|payload| payload.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    if let Some(code) = payload.as_ref().and_then(|payload| payload.status.as_deref()) {
        return map_status_code(code, message);
    }

    match status {
        StatusCode::BAD_REQUEST => invalid_argument(message),
        StatusCode::UNAUTHORIZED => unauthenticated(message),
        StatusCode::FORBIDDEN => permission_denied(message),
        StatusCode::NOT_FOUND => not_found(message),
        StatusCode::CONFLICT => aborted(message),
        StatusCode::PRECONDITION_FAILED => failed_precondition(message),
        StatusCode::TOO_MANY_REQUESTS => resource_exhausted(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => deadline_exceeded(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => unavailable(message),
        status if status.is_client_error() => invalid_argument(message),
        _ => internal_error(message),
    }
}

fn map_status_code(status: &str, message: String) -> FirestoreError {
    match status {
        "INVALID_ARGUMENT" | "OUT_OF_RANGE" => invalid_argument(message),
        "FAILED_PRECONDITION" => failed_precondition(message),
        "UNAUTHENTICATED" => unauthenticated(message),
        "PERMISSION_DENIED" => permission_denied(message),
        "NOT_FOUND" => not_found(message),
        "ALREADY_EXISTS" => already_exists(message),
        "ABORTED" => aborted(message),
        "RESOURCE_EXHAUSTED" => resource_exhausted(message),
        "UNAVAILABLE" => unavailable(message),
        "DEADLINE_EXCEEDED" => deadline_exceeded(message),
        "CANCELLED" | "DATA_LOSS" | "UNKNOWN" | "INTERNAL" => internal_error(message),
        other => internal_error(format!("Unhandled Firestore error status {other}: {message}")),
    }
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}
