//! Typed inputs for the resource methods.
//!
//! # Design
//! Responses stay untyped (`serde_json::Value`) so that new fields on the
//! server never break a caller. Inputs are typed: the enums below carry the
//! exact strings the remote API expects, and the option structs group the
//! parameters of calls that take more than a couple of them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::Attachment;

/// Queue item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Map the numeric levels 0/1/2. Anything else falls back to `Medium`.
    pub fn from_level(level: i64) -> Self {
        match level {
            0 => Priority::Low,
            1 => Priority::Medium,
            2 => Priority::High,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// Lifecycle state of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Successful,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::New => "New",
            ItemStatus::InProgress => "In Progress",
            ItemStatus::Successful => "Successful",
            ItemStatus::Failed => "Failed",
        }
    }
}

/// Window for queue analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl AnalyticsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsPeriod::Day => "24h",
            AnalyticsPeriod::Week => "7d",
            AnalyticsPeriod::Month => "30d",
        }
    }
}

impl std::str::FromStr for AnalyticsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(AnalyticsPeriod::Day),
            "7d" => Ok(AnalyticsPeriod::Week),
            "30d" => Ok(AnalyticsPeriod::Month),
            other => Err(format!("unknown period `{other}`, expected 24h, 7d or 30d")),
        }
    }
}

/// How `update_queue_item` combines new data with what the item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    #[default]
    Update,
    Replace,
}

/// Body format of an outgoing email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "texto")]
    Text,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Html => "html",
            BodyType::Text => "texto",
        }
    }
}

/// Filters for `list_processed_documents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub page: u32,
    pub per_page: u32,
    pub area_id: Option<u64>,
    pub status: Option<String>,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            area_id: None,
            status: None,
        }
    }
}

/// Parameters for `get_next_queue_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextItemQuery {
    pub queue: String,
    pub status: ItemStatus,
    pub priority_order: bool,
    pub mark_as_processing: bool,
}

impl NextItemQuery {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            status: ItemStatus::New,
            priority_order: true,
            mark_as_processing: false,
        }
    }
}

/// Changes applied by `update_queue_item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItemUpdate {
    pub item_id: String,
    pub merge_mode: MergeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(rename = "etapa", skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl QueueItemUpdate {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            merge_mode: MergeMode::Update,
            data: None,
            status: None,
            stage: None,
        }
    }
}

/// Marks a queue item as successful.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishQueueItem {
    pub item_id: String,
    pub output: Option<Value>,
    /// Must lie in 0..=100. Signed so out-of-range input can be rejected
    /// rather than wrapped.
    pub progress: i64,
    /// At most 255 characters.
    pub stage: Option<String>,
}

impl FinishQueueItem {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            output: None,
            progress: 100,
            stage: None,
        }
    }
}

/// Pagination and column filters for `get_grid_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridQuery {
    pub page: u32,
    pub per_page: u32,
    pub filters: Vec<(String, String)>,
}

impl Default for GridQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            filters: Vec::new(),
        }
    }
}

/// A reply to a received email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailReply {
    pub email_id: String,
    pub message: String,
    pub body_type: BodyType,
    pub custom_subject: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailReply {
    pub fn new(email_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            message: message.into(),
            body_type: BodyType::Text,
            custom_subject: None,
            attachments: Vec::new(),
        }
    }
}

/// A new outgoing email.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub body_type: BodyType,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    /// Plain-text alternative of an HTML body.
    pub body_text: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl OutgoingEmail {
    pub fn new(to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            body: body.into(),
            body_type: BodyType::Html,
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: None,
            body_text: None,
            attachments: Vec::new(),
        }
    }
}

/// Outcome of `health_check`. Serializes to the report printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub api_accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            api_accessible: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            api_accessible: false,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.api_accessible
    }
}

/// Template data defaults to an empty object.
pub(crate) fn object_or_empty(value: Option<Value>) -> Value {
    value.unwrap_or_else(|| Value::Object(Map::new()))
}
