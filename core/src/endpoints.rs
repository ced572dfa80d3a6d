//! Stateless HTTP request builder and response parser for the Kurai API.
//!
//! # Design
//! `Endpoints` holds only the immutable [`ClientConfig`] and carries no state
//! between calls. Every remote operation has a `build_*` method that
//! validates its arguments and produces an [`HttpRequest`]; any response is
//! turned into a result by [`Endpoints::parse_response`]. The headers of
//! each request are assembled from scratch, so requests built concurrently
//! never share or leak encoding state.

use serde_json::{json, Map, Value};

use crate::classify::classify_response;
use crate::config::ClientConfig;
use crate::error::{ErrorKind, KuraiError, Result};
use crate::http::{Attachment, HttpMethod, HttpRequest, HttpResponse, Payload, RequestBody};
use crate::types::{
    object_or_empty, AnalyticsPeriod, DocumentQuery, EmailReply, FinishQueueItem, GridQuery,
    NextItemQuery, OutgoingEmail, Priority, QueueItemUpdate,
};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const USER_AGENT: &str = concat!("Kurai-SDK/", env!("CARGO_PKG_VERSION"));

/// Longest stage label the server accepts, in characters.
pub const MAX_STAGE_LEN: usize = 255;

const EMAIL_ATTACHMENT_FIELD: &str = "archivos";

/// Builds requests for, and parses responses from, one tenant.
#[derive(Debug, Clone)]
pub struct Endpoints {
    config: ClientConfig,
}

impl Endpoints {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a request for `path` (relative to the tenant URL).
    ///
    /// PATCH bodies are always form-urlencoded: a JSON object is flattened
    /// into fields and a missing payload becomes an empty form. Form payloads
    /// on other verbs are sent as multipart.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Vec<(String, String)>,
        payload: Option<Payload>,
    ) -> Result<HttpRequest> {
        let body = encode(method, payload)?;

        let mut headers = vec![
            (API_KEY_HEADER.to_string(), self.config.api_key().to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        if let Some(RequestBody::Json(_)) = body {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url()),
            query,
            headers,
            body,
        })
    }

    /// Turn a response into the decoded JSON body or a classified error.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        if !response.is_success() {
            return Err(classify_response(&response));
        }
        serde_json::from_str(&response.body).map_err(|e| {
            KuraiError::from_response(
                ErrorKind::Server,
                format!("malformed JSON response: {e}"),
                response.status,
                Map::new(),
            )
        })
    }

    fn get(&self, path: &str, query: Vec<(String, String)>) -> Result<HttpRequest> {
        self.build_request(HttpMethod::Get, path, query, None)
    }

    fn with_json(&self, method: HttpMethod, path: &str, body: Value) -> Result<HttpRequest> {
        self.build_request(method, path, Vec::new(), Some(Payload::Json(body)))
    }

    // -----------------------------------------------------------------------
    // Areas
    // -----------------------------------------------------------------------

    pub fn build_list_areas(&self) -> Result<HttpRequest> {
        self.get("/public/api/areas", Vec::new())
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Upload `file` into an area. With `process` set the server also starts
    /// extraction right away.
    pub fn build_upload_document(
        &self,
        file: Attachment,
        area_id: u64,
        description: &str,
        process: bool,
    ) -> Result<HttpRequest> {
        let path = if process {
            "/public/api/upload-and-process"
        } else {
            "/public/api/upload"
        };
        let file = Attachment {
            field: "file".to_string(),
            ..file
        };
        let payload = Payload::Form {
            fields: vec![
                ("area_id".to_string(), area_id.to_string()),
                ("description".to_string(), description.to_string()),
            ],
            attachments: vec![file],
        };
        self.build_request(HttpMethod::Post, path, Vec::new(), Some(payload))
    }

    pub fn build_get_document_extracted_data(&self, document_id: u64) -> Result<HttpRequest> {
        self.get(
            &format!("/public/api/documents/{document_id}/extracted-data"),
            Vec::new(),
        )
    }

    pub fn build_get_documents_extracted_data_batch(
        &self,
        document_ids: &[u64],
    ) -> Result<HttpRequest> {
        self.with_json(
            HttpMethod::Post,
            "/public/api/documents/extracted-data/batch",
            json!({ "document_ids": document_ids }),
        )
    }

    pub fn build_list_processed_documents(&self, query: &DocumentQuery) -> Result<HttpRequest> {
        let mut params = vec![
            ("page".to_string(), query.page.to_string()),
            ("per_page".to_string(), query.per_page.to_string()),
        ];
        if let Some(area_id) = query.area_id {
            params.push(("area_id".to_string(), area_id.to_string()));
        }
        if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
            params.push(("status".to_string(), status.to_string()));
        }
        self.get("/public/api/documents/processed", params)
    }

    pub fn build_get_document_url(&self, document_id: u64) -> Result<HttpRequest> {
        self.get(&format!("/public/api/documents/{document_id}/url"), Vec::new())
    }

    pub fn build_bulk_delete_documents(&self, document_ids: &[u64]) -> Result<HttpRequest> {
        self.with_json(
            HttpMethod::Delete,
            "/public/api/documents/bulk",
            json!({ "document_ids": document_ids }),
        )
    }

    // -----------------------------------------------------------------------
    // Queues
    // -----------------------------------------------------------------------

    pub fn build_add_queue_item(
        &self,
        queue: &str,
        data: Value,
        priority: Priority,
    ) -> Result<HttpRequest> {
        self.with_json(
            HttpMethod::Post,
            "/public/api/queues/add-item",
            json!({
                "queue": queue,
                "data": data,
                "priority": priority.as_str(),
            }),
        )
    }

    pub fn build_get_next_queue_item(&self, query: &NextItemQuery) -> Result<HttpRequest> {
        let params = vec![
            ("queue".to_string(), query.queue.clone()),
            ("status".to_string(), query.status.as_str().to_string()),
            ("priority_order".to_string(), query.priority_order.to_string()),
            (
                "mark_as_processing".to_string(),
                query.mark_as_processing.to_string(),
            ),
        ];
        self.get("/public/api/queues/next-item", params)
    }

    pub fn build_update_queue_item(&self, update: &QueueItemUpdate) -> Result<HttpRequest> {
        require_item_id(&update.item_id)?;
        check_stage(update.stage.as_deref())?;
        let body = serde_json::to_value(update)
            .map_err(|e| KuraiError::generic(format!("serialization failed: {e}")))?;
        self.with_json(HttpMethod::Post, "/public/api/queues/items/update-data", body)
    }

    pub fn build_bulk_delete_queue_items(&self, item_ids: &[String]) -> Result<HttpRequest> {
        self.with_json(
            HttpMethod::Delete,
            "/public/api/queues/items/bulk",
            json!({ "item_ids": item_ids }),
        )
    }

    pub fn build_get_queue_analytics(&self, period: AnalyticsPeriod) -> Result<HttpRequest> {
        self.get(
            "/public/api/queues/analytics",
            vec![("period".to_string(), period.as_str().to_string())],
        )
    }

    /// Mark a queue item successful. Sent as a form-urlencoded PATCH with the
    /// output serialized to a JSON string.
    pub fn build_finish_queue_item(&self, finish: &FinishQueueItem) -> Result<HttpRequest> {
        let item_id = require_item_id(&finish.item_id)?;
        if !(0..=100).contains(&finish.progress) {
            return Err(KuraiError::validation(
                "progress must be an integer between 0 and 100",
            ));
        }
        check_stage(finish.stage.as_deref())?;

        let mut fields = vec![("progress".to_string(), finish.progress.to_string())];
        if let Some(output) = finish.output.as_ref().filter(|o| !is_empty_json(o)) {
            fields.push(("output".to_string(), output.to_string()));
        }
        if let Some(stage) = finish.stage.as_deref().filter(|s| !s.is_empty()) {
            fields.push(("etapa".to_string(), stage.to_string()));
        }

        self.build_request(
            HttpMethod::Patch,
            &format!("/public/api/queues/items/{item_id}/finish"),
            Vec::new(),
            Some(Payload::Form {
                fields,
                attachments: Vec::new(),
            }),
        )
    }

    // -----------------------------------------------------------------------
    // Grids
    // -----------------------------------------------------------------------

    pub fn build_get_grid_data(&self, grid_id: u64, query: &GridQuery) -> Result<HttpRequest> {
        let mut params = vec![
            ("page".to_string(), query.page.to_string()),
            ("per_page".to_string(), query.per_page.to_string()),
        ];
        params.extend(query.filters.iter().cloned());
        self.get(&format!("/api/public/grids/{grid_id}/data"), params)
    }

    pub fn build_get_grid_info(&self, grid_id: u64) -> Result<HttpRequest> {
        self.get(&format!("/api/public/grids/{grid_id}/info"), Vec::new())
    }

    // -----------------------------------------------------------------------
    // Email
    // -----------------------------------------------------------------------

    pub fn build_get_email_by_id(&self, email_id: &str) -> Result<HttpRequest> {
        self.get(
            "/public/api/correo",
            vec![("email_id".to_string(), email_id.to_string())],
        )
    }

    /// JSON for a plain reply, multipart once attachments are involved.
    pub fn build_reply_to_email(&self, reply: &EmailReply) -> Result<HttpRequest> {
        let mut fields = vec![
            ("email_id".to_string(), reply.email_id.clone()),
            ("mensaje".to_string(), reply.message.clone()),
            ("tipo_respuesta".to_string(), reply.body_type.as_str().to_string()),
        ];
        if let Some(subject) = reply.custom_subject.as_deref().filter(|s| !s.is_empty()) {
            fields.push(("asunto_personalizado".to_string(), subject.to_string()));
        }

        let payload = if reply.attachments.is_empty() {
            Payload::Json(fields_to_json(fields))
        } else {
            Payload::Form {
                fields,
                attachments: email_attachments(&reply.attachments),
            }
        };
        self.build_request(
            HttpMethod::Post,
            "/public/api/correo/responder",
            Vec::new(),
            Some(payload),
        )
    }

    /// JSON with recipient arrays for a plain email; with attachments the
    /// recipient lists are joined with ", " into multipart text fields.
    pub fn build_send_email(&self, email: &OutgoingEmail) -> Result<HttpRequest> {
        require_recipients(&email.to)?;

        let payload = if email.attachments.is_empty() {
            let mut body = json!({
                "to": email.to,
                "subject": email.subject,
                "body": email.body,
                "body_type": email.body_type.as_str(),
            });
            if !email.cc.is_empty() {
                body["cc"] = json!(email.cc);
            }
            if !email.bcc.is_empty() {
                body["bcc"] = json!(email.bcc);
            }
            if let Some(reply_to) = email.reply_to.as_deref().filter(|s| !s.is_empty()) {
                body["reply_to"] = json!(reply_to);
            }
            if let Some(text) = email.body_text.as_deref().filter(|s| !s.is_empty()) {
                body["body_text"] = json!(text);
            }
            Payload::Json(body)
        } else {
            let mut fields = vec![
                ("to".to_string(), email.to.join(", ")),
                ("subject".to_string(), email.subject.clone()),
                ("body".to_string(), email.body.clone()),
                ("body_type".to_string(), email.body_type.as_str().to_string()),
            ];
            if !email.cc.is_empty() {
                fields.push(("cc".to_string(), email.cc.join(", ")));
            }
            if !email.bcc.is_empty() {
                fields.push(("bcc".to_string(), email.bcc.join(", ")));
            }
            if let Some(reply_to) = email.reply_to.as_deref().filter(|s| !s.is_empty()) {
                fields.push(("reply_to".to_string(), reply_to.to_string()));
            }
            if let Some(text) = email.body_text.as_deref().filter(|s| !s.is_empty()) {
                fields.push(("body_text".to_string(), text.to_string()));
            }
            Payload::Form {
                fields,
                attachments: email_attachments(&email.attachments),
            }
        };

        self.build_request(
            HttpMethod::Post,
            "/public/api/correo/enviar",
            Vec::new(),
            Some(payload),
        )
    }

    pub fn build_send_notification_email(
        &self,
        to: &[String],
        template_type: &str,
        template_data: Option<Value>,
    ) -> Result<HttpRequest> {
        require_recipients(to)?;
        self.with_json(
            HttpMethod::Post,
            "/public/api/correo/notification",
            json!({
                "to": to,
                "template_type": template_type,
                "template_data": object_or_empty(template_data),
            }),
        )
    }
}

/// Pick the wire encoding for `payload`.
fn encode(method: HttpMethod, payload: Option<Payload>) -> Result<Option<RequestBody>> {
    let body = match (method, payload) {
        (HttpMethod::Patch, None) => Some(RequestBody::UrlEncoded(Vec::new())),
        (HttpMethod::Patch, Some(Payload::Json(Value::Object(map)))) => {
            Some(RequestBody::UrlEncoded(flatten(map)))
        }
        (HttpMethod::Patch, Some(Payload::Json(_))) => {
            return Err(KuraiError::validation(
                "PATCH payloads must be a JSON object or form fields",
            ));
        }
        (HttpMethod::Patch, Some(Payload::Form { fields, attachments }))
            if attachments.is_empty() =>
        {
            Some(RequestBody::UrlEncoded(fields))
        }
        (_, Some(Payload::Json(value))) => Some(RequestBody::Json(value)),
        (_, Some(Payload::Form { fields, attachments })) => {
            Some(RequestBody::Multipart { fields, attachments })
        }
        (_, None) => None,
    };
    Ok(body)
}

/// Top-level object fields as form fields: strings verbatim, nulls dropped,
/// everything else as JSON text.
fn flatten(map: Map<String, Value>) -> Vec<(String, String)> {
    map.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect()
}

fn fields_to_json(fields: Vec<(String, String)>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

fn email_attachments(attachments: &[Attachment]) -> Vec<Attachment> {
    attachments
        .iter()
        .map(|a| Attachment {
            field: EMAIL_ATTACHMENT_FIELD.to_string(),
            ..a.clone()
        })
        .collect()
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn require_item_id(item_id: &str) -> Result<&str> {
    let trimmed = item_id.trim();
    if trimmed.is_empty() {
        return Err(KuraiError::validation(
            "item_id is required and cannot be empty",
        ));
    }
    Ok(trimmed)
}

fn check_stage(stage: Option<&str>) -> Result<()> {
    match stage {
        Some(stage) if stage.chars().count() > MAX_STAGE_LEN => Err(KuraiError::validation(
            format!("etapa cannot exceed {MAX_STAGE_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

fn require_recipients(to: &[String]) -> Result<()> {
    if to.iter().all(|address| address.trim().is_empty()) {
        return Err(KuraiError::validation("at least one recipient is required"));
    }
    Ok(())
}
