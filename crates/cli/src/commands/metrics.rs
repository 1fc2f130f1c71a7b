//! Collection commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Batch, CollectRequest, CollectResponse, Metric};
use crate::output::{
    format_timestamp, format_value, print_json, print_rows, print_success, print_warning,
    OutputFormat,
};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

fn rows(metrics: &[Metric]) -> Vec<MetricRow> {
    metrics
        .iter()
        .map(|m| MetricRow {
            namespace: m.namespace.clone(),
            value: format_value(m.value),
            unit: m.unit.clone(),
        })
        .collect()
}

/// Run a one-shot collection through the agent
pub async fn collect(client: &ApiClient, namespaces: Vec<String>, format: OutputFormat) -> Result<()> {
    let response: CollectResponse = client
        .post("api/v1/collect", &CollectRequest { namespaces })
        .await?;

    print_rows(rows(&response.metrics), &response, format)?;
    if matches!(format, OutputFormat::Table) && !response.metrics.is_empty() {
        print_success(&format!("Collected {} metrics", response.metrics.len()));
    }
    Ok(())
}

/// Show the last batch produced by the agent's periodic loop
pub async fn show_latest(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let Some(batch) = client.get_optional::<Batch>("api/v1/latest").await? else {
        print_warning("The agent has not completed a collection cycle yet");
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&batch),
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Collected at:".bold(),
                format_timestamp(&batch.collected_at)
            );
            print_rows(rows(&batch.metrics), &batch, format)
        }
    }
}
