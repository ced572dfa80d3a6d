//! Error type for the Kurai API client.
//!
//! # Design
//! One struct carries the fields every failure shares (message, HTTP status,
//! server payload) and an `ErrorKind` discriminant tells callers what went
//! wrong. Remote failures are produced by [`crate::classify`]; local ones
//! (bad configuration, pre-flight validation, transport failures) are built
//! with the constructors below.

use serde_json::{Map, Value};

/// What kind of failure a [`KuraiError`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// DNS, TCP, TLS failure or timeout. Nothing reached the server.
    Connection,
    /// HTTP 401.
    Authentication,
    /// HTTP 400, or a local argument check that failed before dispatch.
    Validation,
    /// HTTP 404.
    NotFound,
    /// HTTP 429. `retry_after` holds the `Retry-After` header in seconds
    /// when the server sent a numeric one.
    RateLimit { retry_after: Option<u64> },
    /// HTTP 5xx, or a 2xx whose body is not JSON.
    Server,
    /// Missing or empty tenant URL / API key.
    Configuration,
    /// Any other non-2xx status and miscellaneous local failures.
    Generic,
}

/// Error returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", render(.status_code, .message))]
pub struct KuraiError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    response_data: Map<String, Value>,
}

fn render(status_code: &Option<u16>, message: &str) -> String {
    match status_code {
        Some(status) => format!("Kurai Error [{status}]: {message}"),
        None => format!("Kurai Error: {message}"),
    }
}

pub type Result<T> = std::result::Result<T, KuraiError>;

impl KuraiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            response_data: Map::new(),
        }
    }

    /// Error carrying the status and payload of a received response.
    pub fn from_response(
        kind: ErrorKind,
        message: impl Into<String>,
        status_code: u16,
        response_data: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: Some(status_code),
            response_data,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// The JSON object the server answered with, empty when there was none
    /// or it could not be parsed.
    pub fn response_data(&self) -> &Map<String, Value> {
        &self.response_data
    }

    /// Seconds the server asked us to wait. Only set for rate-limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self.kind {
            ErrorKind::RateLimit { retry_after } => retry_after,
            _ => None,
        }
    }
}
