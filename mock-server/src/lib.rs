use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, delete, get, patch, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Key accepted by [`app`].
pub const MOCK_API_KEY: &str = "lx-mock-key";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: u64,
    pub nombre: String,
    pub area_id: u64,
    pub description: String,
    pub status: String,
    pub size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: Uuid,
    pub queue_name: String,
    pub reference: String,
    pub priority: String,
    pub status: String,
    pub data: Value,
    pub output: Option<Value>,
    pub progress: i64,
    pub etapa: Option<String>,
    /// Insertion order, used to break priority ties.
    pub seq: u64,
}

/// An email accepted by the send or reply endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SentEmail {
    pub kind: String,
    pub encoding: String,
    pub fields: HashMap<String, Value>,
    pub attachments: Vec<String>,
}

#[derive(Default)]
pub struct Store {
    pub documents: Vec<Document>,
    pub queue: HashMap<Uuid, QueueItem>,
    pub sent: Vec<SentEmail>,
    next_document_id: u64,
    next_seq: u64,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    db: Db,
}

const AREAS: [(u64, &str); 2] = [(1, "Facturas"), (2, "Contratos")];
const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];
const STATUSES: [&str; 4] = ["New", "In Progress", "Successful", "Failed"];

pub fn app() -> Router {
    app_with_key(MOCK_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        db: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/public/api/areas", get(list_areas))
        .route("/public/api/upload", post(upload))
        .route("/public/api/upload-and-process", post(upload_and_process))
        .route("/public/api/documents/{id}/extracted-data", get(extracted_data))
        .route("/public/api/documents/extracted-data/batch", post(extracted_data_batch))
        .route("/public/api/documents/processed", get(processed_documents))
        .route("/public/api/documents/{id}/url", get(document_url))
        .route("/public/api/documents/bulk", delete(bulk_delete_documents))
        .route("/public/api/queues/add-item", post(add_item))
        .route("/public/api/queues/next-item", get(next_item))
        .route("/public/api/queues/items/update-data", post(update_item))
        .route("/public/api/queues/items/bulk", delete(bulk_delete_items))
        .route("/public/api/queues/analytics", get(analytics))
        .route("/public/api/queues/items/{id}/finish", patch(finish_item))
        .route("/api/public/grids/{id}/data", get(grid_data))
        .route("/api/public/grids/{id}/info", get(grid_info))
        .route("/public/api/correo", get(get_email))
        .route("/public/api/correo/responder", post(reply_email))
        .route("/public/api/correo/enviar", post(send_email))
        .route("/public/api/correo/notification", post(notification))
        .route("/mock/status/{code}", any(mock_status))
        .route("/mock/malformed/{code}", any(mock_malformed))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type ApiResult = Result<Json<Value>, Response>;

fn reject(status: StatusCode, error: &str, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "error": error, "detail": detail.into() }))).into_response()
}

fn bad_request(detail: impl Into<String>) -> Response {
    reject(StatusCode::BAD_REQUEST, "Validation error", detail)
}

fn not_found(detail: impl Into<String>) -> Response {
    reject(StatusCode::NOT_FOUND, "Not found", detail)
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if key != Some(&*state.api_key) {
        tracing::debug!(uri = %request.uri(), "rejecting request with bad API key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        )
            .into_response();
    }
    next.run(request).await
}

// --- areas ---

async fn list_areas() -> Json<Value> {
    let areas: Vec<Value> = AREAS
        .iter()
        .map(|(id, nombre)| json!({ "id": id, "nombre": nombre }))
        .collect();
    Json(json!({ "success": true, "areas": areas }))
}

// --- documents ---

async fn upload(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    store_upload(state, multipart, "uploaded").await
}

async fn upload_and_process(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    store_upload(state, multipart, "processing").await
}

async fn store_upload(state: AppState, mut multipart: Multipart, status: &str) -> ApiResult {
    let mut file: Option<(String, usize)> = None;
    let mut area_id = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                file = Some((file_name, bytes.len()));
            }
            "area_id" => {
                let text = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                area_id = Some(
                    text.parse::<u64>()
                        .map_err(|_| bad_request(format!("area_id `{text}` is not a number")))?,
                );
            }
            "description" => {
                description = field.text().await.map_err(|e| bad_request(e.to_string()))?;
            }
            _ => {}
        }
    }

    let (nombre, size) = file.ok_or_else(|| bad_request("file is required"))?;
    let area_id = area_id.ok_or_else(|| bad_request("area_id missing"))?;
    if !AREAS.iter().any(|(id, _)| *id == area_id) {
        return Err(not_found(format!("area {area_id} does not exist")));
    }

    let mut store = state.db.write().await;
    store.next_document_id += 1;
    let document = Document {
        id: store.next_document_id,
        nombre,
        area_id,
        description,
        status: status.to_string(),
        size,
    };
    store.documents.push(document.clone());
    tracing::debug!(id = document.id, "stored document");
    Ok(Json(json!({ "success": true, "document": document })))
}

async fn find_document(state: &AppState, id: u64) -> Result<Document, Response> {
    let store = state.db.read().await;
    store
        .documents
        .iter()
        .find(|d| d.id == id)
        .cloned()
        .ok_or_else(|| not_found(format!("document {id} does not exist")))
}

fn extraction(document: &Document) -> Value {
    json!({
        "document_id": document.id,
        "nombre": document.nombre,
        "extracted_data": { "area_id": document.area_id, "pages": 1 },
    })
}

async fn extracted_data(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let document = find_document(&state, id).await?;
    let mut body = extraction(&document);
    body["success"] = json!(true);
    Ok(Json(body))
}

#[derive(Deserialize)]
struct DocumentIds {
    document_ids: Vec<u64>,
}

async fn extracted_data_batch(
    State(state): State<AppState>,
    Json(input): Json<DocumentIds>,
) -> ApiResult {
    if input.document_ids.is_empty() {
        return Err(bad_request("document_ids cannot be empty"));
    }
    let store = state.db.read().await;
    let results: Vec<Value> = input
        .document_ids
        .iter()
        .map(|id| match store.documents.iter().find(|d| d.id == *id) {
            Some(document) => extraction(document),
            None => json!({ "document_id": id, "error": "not found" }),
        })
        .collect();
    Ok(Json(json!({ "success": true, "results": results })))
}

#[derive(Deserialize)]
struct DocumentFilter {
    page: Option<usize>,
    per_page: Option<usize>,
    area_id: Option<u64>,
    status: Option<String>,
}

async fn processed_documents(
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> Json<Value> {
    let page = filter.page.unwrap_or(1).max(1);
    let per_page = filter.per_page.unwrap_or(50).max(1);
    let store = state.db.read().await;
    let matching: Vec<&Document> = store
        .documents
        .iter()
        .filter(|d| filter.area_id.map_or(true, |area| d.area_id == area))
        .filter(|d| filter.status.as_deref().map_or(true, |s| d.status == s))
        .collect();
    let documents: Vec<&Document> = matching
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .copied()
        .collect();
    Json(json!({
        "success": true,
        "page": page,
        "per_page": per_page,
        "total": matching.len(),
        "documents": documents,
    }))
}

async fn document_url(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let document = find_document(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "url": format!("https://files.mock/{}/{}", document.id, document.nombre),
    })))
}

async fn bulk_delete_documents(
    State(state): State<AppState>,
    Json(input): Json<DocumentIds>,
) -> Json<Value> {
    let mut store = state.db.write().await;
    let before = store.documents.len();
    store.documents.retain(|d| !input.document_ids.contains(&d.id));
    let deleted = before - store.documents.len();
    Json(json!({ "success": true, "deleted": deleted }))
}

// --- queues ---

#[derive(Deserialize)]
struct AddItem {
    queue: String,
    #[serde(default)]
    data: Value,
    priority: String,
}

async fn add_item(State(state): State<AppState>, Json(input): Json<AddItem>) -> ApiResult {
    if input.queue.trim().is_empty() {
        return Err(bad_request("queue is required"));
    }
    if !PRIORITIES.contains(&input.priority.as_str()) {
        return Err(bad_request(format!("unknown priority `{}`", input.priority)));
    }
    let mut store = state.db.write().await;
    store.next_seq += 1;
    let item = QueueItem {
        id: Uuid::new_v4(),
        queue_name: input.queue,
        reference: format!("REF-{:05}", store.next_seq),
        priority: input.priority,
        status: "New".to_string(),
        data: input.data,
        output: None,
        progress: 0,
        etapa: None,
        seq: store.next_seq,
    };
    store.queue.insert(item.id, item.clone());
    Ok(Json(json!({ "success": true, "item": item })))
}

#[derive(Deserialize)]
struct NextItemParams {
    queue: String,
    status: Option<String>,
    priority_order: Option<String>,
    mark_as_processing: Option<String>,
}

fn priority_rank(priority: &str) -> usize {
    PRIORITIES.iter().position(|p| *p == priority).unwrap_or(0)
}

async fn next_item(State(state): State<AppState>, Query(params): Query<NextItemParams>) -> ApiResult {
    let status = params.status.unwrap_or_else(|| "New".to_string());
    if !STATUSES.contains(&status.as_str()) {
        return Err(bad_request(format!("unknown status `{status}`")));
    }
    let by_priority = params.priority_order.as_deref() != Some("false");
    let mark = params.mark_as_processing.as_deref() == Some("true");

    let mut store = state.db.write().await;
    let mut candidates: Vec<&QueueItem> = store
        .queue
        .values()
        .filter(|item| item.queue_name == params.queue && item.status == status)
        .collect();
    if by_priority {
        candidates.sort_by_key(|item| (std::cmp::Reverse(priority_rank(&item.priority)), item.seq));
    } else {
        candidates.sort_by_key(|item| item.seq);
    }
    let id = candidates
        .first()
        .map(|item| item.id)
        .ok_or_else(|| not_found(format!("no `{status}` items in queue {}", params.queue)))?;

    let item = store
        .queue
        .get_mut(&id)
        .ok_or_else(|| not_found(format!("queue item {id} does not exist")))?;
    if mark {
        item.status = "In Progress".to_string();
    }
    Ok(Json(json!({ "success": true, "item": item })))
}

#[derive(Deserialize)]
struct UpdateItem {
    item_id: String,
    #[serde(default = "default_merge_mode")]
    merge_mode: String,
    data: Option<Value>,
    status: Option<String>,
    etapa: Option<String>,
}

fn default_merge_mode() -> String {
    "update".to_string()
}

fn parse_item_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| bad_request(format!("`{raw}` is not a valid item id")))
}

async fn update_item(State(state): State<AppState>, Json(input): Json<UpdateItem>) -> ApiResult {
    let id = parse_item_id(&input.item_id)?;
    if let Some(status) = input.status.as_deref() {
        if !STATUSES.contains(&status) {
            return Err(bad_request(format!("unknown status `{status}`")));
        }
    }
    let mut store = state.db.write().await;
    let item = store
        .queue
        .get_mut(&id)
        .ok_or_else(|| not_found(format!("queue item {id} does not exist")))?;

    if let Some(data) = input.data {
        match (input.merge_mode.as_str(), &mut item.data, data) {
            ("update", Value::Object(existing), Value::Object(new)) => existing.extend(new),
            ("update" | "replace", current, new) => *current = new,
            (other, _, _) => return Err(bad_request(format!("unknown merge_mode `{other}`"))),
        }
    }
    if let Some(status) = input.status {
        item.status = status;
    }
    if let Some(etapa) = input.etapa {
        item.etapa = Some(etapa);
    }
    Ok(Json(json!({ "success": true, "item": item })))
}

#[derive(Deserialize)]
struct ItemIds {
    item_ids: Vec<String>,
}

async fn bulk_delete_items(State(state): State<AppState>, Json(input): Json<ItemIds>) -> ApiResult {
    let ids = input
        .item_ids
        .iter()
        .map(|raw| parse_item_id(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let mut store = state.db.write().await;
    let deleted = ids.iter().filter(|id| store.queue.remove(*id).is_some()).count();
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

#[derive(Deserialize)]
struct AnalyticsParams {
    period: Option<String>,
}

async fn analytics(State(state): State<AppState>, Query(params): Query<AnalyticsParams>) -> ApiResult {
    let period = params.period.unwrap_or_else(|| "24h".to_string());
    if !["24h", "7d", "30d"].contains(&period.as_str()) {
        return Err(bad_request(format!("unknown period `{period}`")));
    }
    let store = state.db.read().await;
    let count = |status: &str| store.queue.values().filter(|i| i.status == status).count();
    Ok(Json(json!({
        "success": true,
        "period": period,
        "summary": {
            "total_items": store.queue.len(),
            "pending_items": count("New") + count("In Progress"),
            "processed_items": count("Successful"),
            "failed_items": count("Failed"),
        },
    })))
}

#[derive(Deserialize)]
struct FinishForm {
    progress: Option<String>,
    output: Option<String>,
    etapa: Option<String>,
}

/// Only accepts `application/x-www-form-urlencoded`; the `Form` extractor
/// answers 415 for anything else.
async fn finish_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(input): Form<FinishForm>,
) -> ApiResult {
    let id = parse_item_id(&raw_id)?;
    let progress = match input.progress.as_deref() {
        None => 100,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|p| (0..=100).contains(p))
            .ok_or_else(|| bad_request(format!("invalid progress `{raw}`")))?,
    };
    let output = input
        .output
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| bad_request(format!("output is not valid JSON: {e}")))?;
    if input.etapa.as_ref().is_some_and(|e| e.chars().count() > 255) {
        return Err(bad_request("etapa cannot exceed 255 characters"));
    }

    let mut store = state.db.write().await;
    let item = store
        .queue
        .get_mut(&id)
        .ok_or_else(|| not_found(format!("queue item {id} does not exist")))?;
    item.status = "Successful".to_string();
    item.progress = progress;
    if output.is_some() {
        item.output = output;
    }
    if input.etapa.is_some() {
        item.etapa = input.etapa;
    }
    Ok(Json(json!({ "success": true, "item": item })))
}

// --- grids ---

fn grid_rows() -> Vec<Value> {
    vec![
        json!({ "id": 1, "cliente": "ACME", "estado": "activo" }),
        json!({ "id": 2, "cliente": "Globex", "estado": "inactivo" }),
        json!({ "id": 3, "cliente": "Initech", "estado": "activo" }),
    ]
}

async fn grid_data(Path(id): Path<u64>, Query(params): Query<HashMap<String, String>>) -> ApiResult {
    if id != 1 {
        return Err(not_found(format!("grid {id} does not exist")));
    }
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(50)
        .max(1);
    let rows: Vec<Value> = grid_rows()
        .into_iter()
        .filter(|row| {
            params
                .iter()
                .filter(|(key, _)| key.as_str() != "page" && key.as_str() != "per_page")
                .all(|(key, value)| row.get(key).and_then(Value::as_str) == Some(value.as_str()))
        })
        .collect();
    let total = rows.len();
    let data: Vec<Value> = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    Ok(Json(json!({ "success": true, "grid_id": id, "total": total, "data": data })))
}

async fn grid_info(Path(id): Path<u64>) -> ApiResult {
    if id != 1 {
        return Err(not_found(format!("grid {id} does not exist")));
    }
    Ok(Json(json!({
        "success": true,
        "grid": { "id": 1, "nombre": "Clientes", "columns": ["id", "cliente", "estado"] },
    })))
}

// --- email ---

#[derive(Deserialize)]
struct EmailParams {
    email_id: String,
}

async fn get_email(Query(params): Query<EmailParams>) -> ApiResult {
    if params.email_id != "mail-1" {
        return Err(not_found(format!("email {} does not exist", params.email_id)));
    }
    Ok(Json(json!({
        "success": true,
        "email": {
            "id": "mail-1",
            "from": "cliente@ejemplo.com",
            "subject": "Factura enero",
            "body": "Adjunto la factura.",
        },
    })))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// Read a JSON or multipart email submission into a [`SentEmail`].
async fn read_submission(state: &AppState, kind: &str, request: Request) -> Result<SentEmail, Response> {
    if is_multipart(request.headers()) {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        let mut fields = HashMap::new();
        let mut attachments = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                attachments.push(file_name);
            } else {
                let text = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                fields.insert(name, Value::String(text));
            }
        }
        Ok(SentEmail {
            kind: kind.to_string(),
            encoding: "multipart".to_string(),
            fields,
            attachments,
        })
    } else {
        let Json(body) = Json::<HashMap<String, Value>>::from_request(request, state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        Ok(SentEmail {
            kind: kind.to_string(),
            encoding: "json".to_string(),
            fields: body,
            attachments: Vec::new(),
        })
    }
}

async fn record(state: &AppState, email: SentEmail) -> Json<Value> {
    let mut store = state.db.write().await;
    store.sent.push(email.clone());
    Json(json!({
        "success": true,
        "message_id": format!("msg-{}", store.sent.len()),
        "encoding": email.encoding,
        "attachments": email.attachments,
        "fields": email.fields,
    }))
}

fn require_field(email: &SentEmail, name: &str) -> Result<(), Response> {
    match email.fields.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::Array(items)) if !items.is_empty() => Ok(()),
        _ => Err(bad_request(format!("{name} is required"))),
    }
}

async fn reply_email(State(state): State<AppState>, request: Request) -> ApiResult {
    let email = read_submission(&state, "reply", request).await?;
    require_field(&email, "email_id")?;
    require_field(&email, "mensaje")?;
    Ok(record(&state, email).await)
}

async fn send_email(State(state): State<AppState>, request: Request) -> ApiResult {
    let email = read_submission(&state, "send", request).await?;
    for name in ["to", "subject", "body"] {
        require_field(&email, name)?;
    }
    Ok(record(&state, email).await)
}

#[derive(Deserialize)]
struct Notification {
    to: Vec<String>,
    template_type: String,
    #[serde(default)]
    template_data: Value,
}

async fn notification(State(state): State<AppState>, Json(input): Json<Notification>) -> ApiResult {
    if input.to.is_empty() {
        return Err(bad_request("to is required"));
    }
    let email = SentEmail {
        kind: "notification".to_string(),
        encoding: "json".to_string(),
        fields: HashMap::from([
            ("to".to_string(), json!(input.to)),
            ("template_type".to_string(), json!(input.template_type)),
            ("template_data".to_string(), input.template_data),
        ]),
        attachments: Vec::new(),
    };
    Ok(record(&state, email).await)
}

// --- canned failures ---

async fn mock_status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(json!({ "error": "Mock error", "detail": format!("status {code}") }));
    if status == StatusCode::TOO_MANY_REQUESTS {
        return (status, [(header::RETRY_AFTER, "120")], body).into_response();
    }
    (status, body).into_response()
}

async fn mock_malformed(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "<html><body>upstream exploded</body></html>").into_response()
}
