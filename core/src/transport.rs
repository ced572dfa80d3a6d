//! Executes [`HttpRequest`] values over the network.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use crate::error::{KuraiError, Result};
use crate::http::{Attachment, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Something that can perform one HTTP round-trip.
///
/// Any received response, whatever its status, is `Ok`. `Err` means no
/// response arrived: a Connection error when the network failed, or the kind
/// of the local problem (an unencodable body, a bad attachment content type,
/// an unusable URL) when the request could not be assembled.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a reusable `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KuraiError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(method(request.method), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            None => builder,
            Some(RequestBody::Json(value)) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| KuraiError::generic(format!("serialization failed: {e}")))?;
                builder.body(bytes)
            }
            Some(RequestBody::UrlEncoded(fields)) => builder.form(&fields),
            Some(RequestBody::Multipart { fields, attachments }) => {
                builder.multipart(multipart_form(fields, attachments)?)
            }
        };

        let response = builder.send().map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn multipart_form(fields: Vec<(String, String)>, attachments: Vec<Attachment>) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    for attachment in attachments {
        let content_type = attachment.content_type;
        let part = Part::bytes(attachment.bytes)
            .file_name(attachment.file_name)
            .mime_str(&content_type)
            .map_err(|e| {
                KuraiError::validation(format!("invalid content type `{content_type}`: {e}"))
            })?;
        form = form.part(attachment.field, part);
    }
    Ok(form)
}

fn transport_error(e: reqwest::Error) -> KuraiError {
    if e.is_builder() {
        // Nothing left the process.
        KuraiError::generic(format!("invalid request: {e}"))
    } else if e.is_timeout() {
        KuraiError::connection(format!("connection timeout: {e}"))
    } else if e.is_connect() {
        KuraiError::connection(format!("connection error: {e}"))
    } else {
        KuraiError::connection(format!("request error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request(url: &str, body: Option<RequestBody>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body,
        }
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn unusable_url_is_not_a_connection_error() {
        let err = transport().send(request("not a url", None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.message().starts_with("invalid request"));
    }

    #[test]
    fn bad_attachment_content_type_fails_before_sending() {
        let mut attachment = Attachment::new("file", "a.pdf", b"%PDF".to_vec());
        attachment.content_type = "not a mime type".to_string();
        let body = RequestBody::Multipart {
            fields: Vec::new(),
            attachments: vec![attachment],
        };

        // Port 9 is never contacted: the form is rejected first.
        let err = transport()
            .send(request("http://127.0.0.1:9/upload", Some(body)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
