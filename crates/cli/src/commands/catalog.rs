//! Metric catalog command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, MetricType};
use crate::output::{print_rows, OutputFormat};

#[derive(Tabled)]
struct MetricTypeRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// List every namespace template the agent can collect
pub async fn show_catalog(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let types: Vec<MetricType> = client.get("api/v1/catalog").await?;

    let rows: Vec<MetricTypeRow> = types
        .iter()
        .map(|t| MetricTypeRow {
            namespace: t.namespace.clone(),
            unit: t.unit.clone(),
            description: t.description.clone(),
        })
        .collect();
    print_rows(rows, &types, format)
}
