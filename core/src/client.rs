//! Blocking client for the Kurai API.
//!
//! # Design
//! `KuraiClient` pairs the stateless [`Endpoints`] builder with a
//! [`Transport`]. Each resource method validates its arguments, builds one
//! request, sends it and hands the response to the classifier. There is no
//! retry, cache or background work: one method call is one round-trip, and
//! argument errors are reported before anything touches the network.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::endpoints::Endpoints;
use crate::error::{ErrorKind, KuraiError, Result};
use crate::http::{Attachment, HttpMethod, HttpRequest, Payload, RequestBody};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    AnalyticsPeriod, BodyType, DocumentQuery, EmailReply, FinishQueueItem, GridQuery,
    HealthReport, NextItemQuery, OutgoingEmail, Priority, QueueItemUpdate,
};

/// Client for one tenant of the Kurai API.
#[derive(Debug, Clone)]
pub struct KuraiClient<T = HttpTransport> {
    endpoints: Endpoints,
    transport: T,
}

impl KuraiClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, transport))
    }

    /// Client configured from `LEXIA_TENANT_URL` and `LEXIA_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> KuraiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            endpoints: Endpoints::new(config),
            transport,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn config(&self) -> &ClientConfig {
        self.endpoints.config()
    }

    /// Send an arbitrary request to `path` and return the decoded JSON body.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        query: Vec<(String, String)>,
        payload: Option<Payload>,
    ) -> Result<Value> {
        let request = self.endpoints.build_request(method, path, query, payload)?;
        self.dispatch(request)
    }

    fn dispatch(&self, request: HttpRequest) -> Result<Value> {
        let method = request.method.as_str();
        let url = request.url.clone();
        debug!(method, url = %url, encoding = encoding(&request.body), "sending request");

        let response = self.transport.send(request).inspect_err(|e| {
            warn!(method, url = %url, error = %e, "request failed before a response arrived");
        })?;
        debug!(method, url = %url, status = response.status, "received response");

        self.endpoints.parse_response(response).inspect_err(|e| {
            warn!(method, url = %url, status = ?e.status_code(), kind = ?e.kind(), "request failed");
        })
    }

    /// Check that the API answers with the configured key. Never fails; the
    /// error is folded into the report instead.
    pub fn health_check(&self) -> HealthReport {
        match self.list_areas() {
            Ok(_) => HealthReport::ok(),
            Err(e) => HealthReport::failed(e.to_string()),
        }
    }

    pub fn list_areas(&self) -> Result<Value> {
        self.dispatch(self.endpoints.build_list_areas()?)
    }

    /// Upload the file at `path` into an area.
    pub fn upload_document(
        &self,
        path: impl AsRef<Path>,
        area_id: u64,
        description: &str,
    ) -> Result<Value> {
        let file = read_attachment(path.as_ref())?;
        self.upload_document_bytes(file, area_id, description, false)
    }

    /// Upload the file at `path` and start extraction right away.
    pub fn upload_and_process_document(
        &self,
        path: impl AsRef<Path>,
        area_id: u64,
        description: &str,
    ) -> Result<Value> {
        let file = read_attachment(path.as_ref())?;
        self.upload_document_bytes(file, area_id, description, true)
    }

    /// Upload an in-memory file.
    pub fn upload_document_bytes(
        &self,
        file: Attachment,
        area_id: u64,
        description: &str,
        process: bool,
    ) -> Result<Value> {
        self.dispatch(
            self.endpoints
                .build_upload_document(file, area_id, description, process)?,
        )
    }

    pub fn get_document_extracted_data(&self, document_id: u64) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_document_extracted_data(document_id)?)
    }

    pub fn get_documents_extracted_data_batch(&self, document_ids: &[u64]) -> Result<Value> {
        self.dispatch(
            self.endpoints
                .build_get_documents_extracted_data_batch(document_ids)?,
        )
    }

    pub fn list_processed_documents(&self, query: &DocumentQuery) -> Result<Value> {
        self.dispatch(self.endpoints.build_list_processed_documents(query)?)
    }

    pub fn get_document_url(&self, document_id: u64) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_document_url(document_id)?)
    }

    pub fn bulk_delete_documents(&self, document_ids: &[u64]) -> Result<Value> {
        self.dispatch(self.endpoints.build_bulk_delete_documents(document_ids)?)
    }

    pub fn add_queue_item(&self, queue: &str, data: Value, priority: Priority) -> Result<Value> {
        self.dispatch(self.endpoints.build_add_queue_item(queue, data, priority)?)
    }

    pub fn get_next_queue_item(&self, query: &NextItemQuery) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_next_queue_item(query)?)
    }

    pub fn update_queue_item(&self, update: &QueueItemUpdate) -> Result<Value> {
        self.dispatch(self.endpoints.build_update_queue_item(update)?)
    }

    pub fn bulk_delete_queue_items(&self, item_ids: &[String]) -> Result<Value> {
        self.dispatch(self.endpoints.build_bulk_delete_queue_items(item_ids)?)
    }

    pub fn get_queue_analytics(&self, period: AnalyticsPeriod) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_queue_analytics(period)?)
    }

    /// Mark a queue item as successful. Rejects an empty id, progress outside
    /// 0..=100 and stages over 255 characters without contacting the server.
    pub fn finish_queue_item(&self, finish: &FinishQueueItem) -> Result<Value> {
        self.dispatch(self.endpoints.build_finish_queue_item(finish)?)
    }

    pub fn get_grid_data(&self, grid_id: u64, query: &GridQuery) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_grid_data(grid_id, query)?)
    }

    pub fn get_grid_info(&self, grid_id: u64) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_grid_info(grid_id)?)
    }

    pub fn get_email_by_id(&self, email_id: &str) -> Result<Value> {
        self.dispatch(self.endpoints.build_get_email_by_id(email_id)?)
    }

    pub fn reply_to_email(&self, reply: &EmailReply) -> Result<Value> {
        self.dispatch(self.endpoints.build_reply_to_email(reply)?)
    }

    pub fn send_email(&self, email: &OutgoingEmail) -> Result<Value> {
        self.dispatch(self.endpoints.build_send_email(email)?)
    }

    /// Single recipient, no attachments.
    pub fn send_simple_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        body_type: BodyType,
    ) -> Result<Value> {
        let mut email = OutgoingEmail::new(vec![to.to_string()], subject, body);
        email.body_type = body_type;
        self.send_email(&email)
    }

    /// Send one of the server-side templates (`document_processed`,
    /// `queue_completed`, ...).
    pub fn send_notification_email(
        &self,
        to: &[String],
        template_type: &str,
        template_data: Option<Value>,
    ) -> Result<Value> {
        self.dispatch(
            self.endpoints
                .build_send_notification_email(to, template_type, template_data)?,
        )
    }
}

fn encoding(body: &Option<RequestBody>) -> &'static str {
    match body {
        None => "none",
        Some(RequestBody::Json(_)) => "json",
        Some(RequestBody::UrlEncoded(_)) => "urlencoded",
        Some(RequestBody::Multipart { .. }) => "multipart",
    }
}

fn read_attachment(path: &Path) -> Result<Attachment> {
    if !path.is_file() {
        return Err(KuraiError::validation(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        KuraiError::new(
            ErrorKind::Generic,
            format!("could not read {}: {e}", path.display()),
        )
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Attachment::new("file", file_name, bytes))
}
