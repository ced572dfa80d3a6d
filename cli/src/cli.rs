use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kurai_core::AnalyticsPeriod;

#[derive(Debug, Parser)]
#[command(name = "kurai")]
#[command(version, about = "Command line client for the Kurai document and workflow API")]
pub struct Cli {
    /// Tenant URL (falls back to LEXIA_TENANT_URL)
    #[arg(long, global = true)]
    pub tenant_url: Option<String>,

    /// API key (falls back to LEXIA_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Print the full response as pretty JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    // Help is printed when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the API is reachable with the configured key
    HealthCheck,

    /// List the available areas
    ListAreas,

    /// Upload a document into an area
    Upload {
        /// Path of the file to upload
        path: PathBuf,

        /// Area that receives the document
        #[arg(long)]
        area_id: u64,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Start processing right after the upload
        #[arg(long, default_value_t = false)]
        process: bool,
    },

    /// Add an item to a work queue
    AddQueueItem {
        /// Queue name
        queue: String,

        /// Item data as a JSON document
        #[arg(long)]
        data: Option<String>,

        /// Priority: 0=Low, 1=Medium, 2=High
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=2))]
        priority: i64,
    },

    /// Show queue analytics for a period
    QueueAnalytics {
        /// Analysis window: 24h, 7d or 30d
        #[arg(long, default_value = "24h")]
        period: AnalyticsPeriod,
    },
}
