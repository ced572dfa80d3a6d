//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! [`crate::Endpoints`] builder produces `HttpRequest` values and parses
//! `HttpResponse` values without touching the network; a
//! [`crate::transport::Transport`] executes the actual I/O. Keeping the two
//! apart makes request building and error classification deterministic and
//! easy to test.
//!
//! All fields use owned types so a request can be handed to any transport
//! without lifetime concerns.

use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A file sent as one part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Multipart field name the file is sent under.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// A binary attachment with the generic `application/octet-stream` type.
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: Self::OCTET_STREAM.to_string(),
            bytes,
        }
    }
}

/// What a caller hands to the dispatcher: a JSON document, or form fields
/// with optional file attachments. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form {
        fields: Vec<(String, String)>,
        attachments: Vec<Attachment>,
    },
}

/// A request body after encoding selection.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent with `content-type: application/json`.
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`.
    UrlEncoded(Vec<(String, String)>),
    /// Sent as `multipart/form-data`. The transport picks the boundary, so
    /// no content-type header is attached by the builder.
    Multipart {
        fields: Vec<(String, String)>,
        attachments: Vec<Attachment>,
    },
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL without the query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
