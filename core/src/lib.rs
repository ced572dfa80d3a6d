//! Blocking client for the Kurai document-processing and workflow API.
//!
//! # Overview
//! Covers document upload and extraction, work queues, grids and email.
//! Successful responses come back as untyped `serde_json::Value`; every
//! failure is a [`KuraiError`] whose [`ErrorKind`] says what went wrong.
//!
//! # Design
//! - [`Endpoints`] builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network, so encoding selection and error
//!   classification are deterministic and testable on their own.
//! - [`Transport`] is the I/O seam; [`HttpTransport`] implements it with a
//!   blocking `reqwest` client.
//! - [`KuraiClient`] combines the two and exposes one method per endpoint.
//! - Headers are built per request from the immutable [`ClientConfig`], so a
//!   client can be shared between threads.
//!
//! ```no_run
//! use kurai_core::{ClientConfig, KuraiClient};
//!
//! let config = ClientConfig::new("https://api.cloud.lexia.la", "lx-xxxxxxxx")?;
//! let client = KuraiClient::new(config)?;
//! let areas = client.list_areas()?;
//! println!("{areas}");
//! # Ok::<(), kurai_core::KuraiError>(())
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use classify::{classify, classify_response};
pub use client::KuraiClient;
pub use config::ClientConfig;
pub use endpoints::Endpoints;
pub use error::{ErrorKind, KuraiError, Result};
pub use http::{Attachment, HttpMethod, HttpRequest, HttpResponse, Payload, RequestBody};
pub use transport::{HttpTransport, Transport};
pub use types::{
    AnalyticsPeriod, BodyType, DocumentQuery, EmailReply, FinishQueueItem, GridQuery,
    HealthReport, ItemStatus, MergeMode, NextItemQuery, OutgoingEmail, Priority, QueueItemUpdate,
};

/// Version of this crate, sent in the `User-Agent` header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
