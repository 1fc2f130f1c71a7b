//! vSphere collector CLI
//!
//! A command-line tool for browsing the metric catalog, running one-shot
//! collections and checking on a running vSphere collector agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{catalog, health, metrics};

/// vSphere collector CLI
#[derive(Parser)]
#[command(name = "vsc")]
#[command(author, version, about = "CLI for the vSphere performance collector", long_about = None)]
pub struct Cli {
    /// Agent endpoint URL (falls back to ~/.config/vsc/config.json, then http://localhost:8080)
    #[arg(long, env = "VSC_AGENT_URL")]
    pub agent_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the metric namespaces the agent can collect
    Catalog,

    /// Collect metric namespaces once
    Collect {
        /// Namespaces such as /intel/vmware/vsphere/host/*/cpu/*/idle
        #[arg(required = true)]
        namespaces: Vec<String>,
    },

    /// Show the last batch from the agent's periodic collection
    Latest,

    /// Show agent health and readiness
    Health,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let client = client::ApiClient::new(&config.resolve_agent_url(cli.agent_url))?;

    match cli.command {
        Commands::Catalog => catalog::show_catalog(&client, cli.format).await,
        Commands::Collect { namespaces } => metrics::collect(&client, namespaces, cli.format).await,
        Commands::Latest => metrics::show_latest(&client, cli.format).await,
        Commands::Health => health::show_health(&client, cli.format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
