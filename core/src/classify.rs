//! Maps a non-success HTTP response to a [`KuraiError`].
//!
//! The mapping depends only on the status code, the response headers and the
//! body, so it can be exercised with synthetic responses.

use serde_json::{Map, Value};

use crate::error::{ErrorKind, KuraiError};
use crate::http::HttpResponse;

const DEFAULT_MESSAGE: &str = "unknown error";

/// Classify a received response that is not in the 2xx range.
pub fn classify(status: u16, headers: &[(String, String)], body: &str) -> KuraiError {
    let (message, response_data) = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(data)) => (error_message(&data), data),
        _ => (format!("Error HTTP {status}"), Map::new()),
    };

    let kind = match status {
        401 => ErrorKind::Authentication,
        400 => ErrorKind::Validation,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit {
            retry_after: retry_after(headers),
        },
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Generic,
    };

    KuraiError::from_response(kind, message, status, response_data)
}

/// Convenience wrapper over [`classify`] for a whole response.
pub fn classify_response(response: &HttpResponse) -> KuraiError {
    classify(response.status, &response.headers, &response.body)
}

/// `error` field, with `": {detail}"` appended when a detail is present.
fn error_message(data: &Map<String, Value>) -> String {
    let mut message = match data.get("error") {
        Some(Value::String(error)) => error.clone(),
        Some(Value::Null) | None => DEFAULT_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    };
    match data.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => {
            message.push_str(": ");
            message.push_str(detail);
        }
        Some(Value::String(_)) | Some(Value::Null) | None => {}
        Some(other) => {
            message.push_str(": ");
            message.push_str(&other.to_string());
        }
    }
    message
}

/// Numeric `Retry-After` in seconds. HTTP-date values are not supported and
/// yield `None`.
fn retry_after(headers: &[(String, String)]) -> Option<u64> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
