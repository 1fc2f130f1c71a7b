//! Agent health command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthReport, Readiness};
use crate::output::{color_status, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct HealthSummary {
    health: HealthReport,
    readiness: Readiness,
}

/// Show component health and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthReport = client.probe("healthz").await?;
    let readiness: Readiness = client.probe("readyz").await?;

    if let OutputFormat::Json = format {
        return print_json(&HealthSummary { health, readiness });
    }

    println!("{} {}", "Status:".bold(), color_status(&health.status));
    let ready = if readiness.ready { "ready" } else { "not ready" };
    match &readiness.reason {
        Some(reason) => println!("{} {} ({})", "Readiness:".bold(), color_status(ready), reason),
        None => println!("{} {}", "Readiness:".bold(), color_status(ready)),
    }
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&component.status),
            message: component.message.clone().unwrap_or_default(),
        })
        .collect();
    print_rows(rows, &health, format)
}
