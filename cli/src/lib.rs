//! The `kurai` command line client.
//!
//! Commands write their report to any `io::Write`, so they can be driven
//! from tests against a mock server as easily as from `main`.

pub mod cli;
pub mod error;

use std::io::Write;

use clap::CommandFactory;
use kurai_core::{AnalyticsPeriod, ClientConfig, KuraiClient, Priority, Transport};
use serde_json::{Map, Value};

pub use cli::{Cli, Commands};
pub use error::CliError;

/// Whether a command that ran to completion succeeded. Only an unhealthy
/// API counts as a failure; a response with `success: false` is reported
/// and the command still exits cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Resolve the configuration from flags and environment, then run the
/// selected command.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<Outcome, CliError> {
    match &cli.command {
        None => return print_help(out),
        Some(Commands::Upload { path, .. }) if !path.exists() => {
            return Err(CliError::FileNotFound(path.clone()));
        }
        Some(Commands::AddQueueItem { data: Some(data), .. }) => {
            parse_data(data)?;
        }
        Some(_) => {}
    }

    let config = ClientConfig::resolve(cli.tenant_url.clone(), cli.api_key.clone())?;
    let client = KuraiClient::new(config)?;
    run_with(&client, cli, out)
}

/// Run the selected command with an already built client.
pub fn run_with<T: Transport>(
    client: &KuraiClient<T>,
    cli: &Cli,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    let Some(command) = &cli.command else {
        return print_help(out);
    };
    match command {
        Commands::HealthCheck => health_check(client, out),
        Commands::ListAreas => list_areas(client, cli.json, out),
        Commands::Upload {
            path,
            area_id,
            description,
            process,
        } => {
            let description = description.as_deref().unwrap_or("");
            let result = if *process {
                client.upload_and_process_document(path, *area_id, description)?
            } else {
                client.upload_document(path, *area_id, description)?
            };
            upload_report(&result, *process, cli.json, out)
        }
        Commands::AddQueueItem {
            queue,
            data,
            priority,
        } => {
            let data = match data {
                Some(data) => parse_data(data)?,
                None => Value::Object(Map::new()),
            };
            let result = client.add_queue_item(queue, data, Priority::from_level(*priority))?;
            queue_item_report(&result, cli.json, out)
        }
        Commands::QueueAnalytics { period } => {
            let result = client.get_queue_analytics(*period)?;
            analytics_report(&result, *period, cli.json, out)
        }
    }
}

fn print_help(out: &mut impl Write) -> Result<Outcome, CliError> {
    writeln!(out, "{}", Cli::command().render_help())?;
    Ok(Outcome::Success)
}

fn parse_data(data: &str) -> Result<Value, CliError> {
    serde_json::from_str(data).map_err(CliError::InvalidData)
}

fn health_check<T: Transport>(
    client: &KuraiClient<T>,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    let report = client.health_check();
    let outcome = if report.is_ok() {
        writeln!(out, "API is working")?;
        Outcome::Success
    } else {
        writeln!(out, "API has problems")?;
        Outcome::Failure
    };
    let details = serde_json::to_value(&report).map_err(CliError::Render)?;
    print_json(out, "Details", &details)?;
    Ok(outcome)
}

fn list_areas<T: Transport>(
    client: &KuraiClient<T>,
    json: bool,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    let result = client.list_areas()?;

    match result.get("areas").and_then(Value::as_array) {
        Some(areas) if !areas.is_empty() => {
            writeln!(out, "{} areas found:", areas.len())?;
            for area in areas {
                writeln!(
                    out,
                    "  - ID: {}, Name: {}",
                    field(area, "id"),
                    field(area, "nombre")
                )?;
            }
        }
        _ => writeln!(out, "No areas found")?,
    }

    if json {
        print_json(out, "Full response", &result)?;
    }
    Ok(Outcome::Success)
}

fn upload_report(
    result: &Value,
    processed: bool,
    json: bool,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    if processed {
        writeln!(out, "Document uploaded and queued for processing")?;
    } else {
        writeln!(out, "Document uploaded")?;
    }
    let document = &result["document"];
    writeln!(out, "  ID: {}", field(document, "id"))?;
    writeln!(out, "  Name: {}", field(document, "nombre"))?;
    writeln!(out, "  Status: {}", field(document, "status"))?;

    if json {
        print_json(out, "Full response", result)?;
    }
    Ok(Outcome::Success)
}

fn queue_item_report(result: &Value, json: bool, out: &mut impl Write) -> Result<Outcome, CliError> {
    if result["success"].as_bool().unwrap_or(false) {
        let item = &result["item"];
        writeln!(out, "Item added to queue")?;
        writeln!(out, "  ID: {}", field(item, "id"))?;
        writeln!(out, "  Queue: {}", field(item, "queue_name"))?;
        writeln!(out, "  Reference: {}", field(item, "reference"))?;
        writeln!(out, "  Priority: {}", field(item, "priority"))?;
    } else {
        writeln!(out, "Could not add the item")?;
    }

    if json {
        print_json(out, "Full response", result)?;
    }
    Ok(Outcome::Success)
}

fn analytics_report(
    result: &Value,
    period: AnalyticsPeriod,
    json: bool,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    if result["success"].as_bool().unwrap_or(false) {
        let summary = &result["summary"];
        let count = |name: &str| summary[name].as_u64().unwrap_or(0);
        writeln!(out, "Queue analytics:")?;
        writeln!(out, "  Total items: {}", count("total_items"))?;
        writeln!(out, "  Pending: {}", count("pending_items"))?;
        writeln!(out, "  Processed: {}", count("processed_items"))?;
        writeln!(out, "  Failed: {}", count("failed_items"))?;
        writeln!(
            out,
            "  Period: {}",
            result["period"].as_str().unwrap_or(period.as_str())
        )?;
    } else {
        writeln!(out, "Could not fetch analytics")?;
    }

    if json {
        print_json(out, "Full response", result)?;
    }
    Ok(Outcome::Success)
}

/// A field rendered for humans: strings without quotes, missing as `N/A`.
fn field(value: &Value, name: &str) -> String {
    match value.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn print_json(out: &mut impl Write, title: &str, value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Render)?;
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.len()))?;
    writeln!(out, "{rendered}")?;
    Ok(())
}
