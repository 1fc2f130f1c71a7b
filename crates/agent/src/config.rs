//! Agent configuration
//!
//! Read from `VSPHERE_*` environment variables (nested keys separated by
//! `__`) on top of an optional file named by `VSPHERE_CONFIG`.

use anyhow::{Context, Result};
use serde::Deserialize;
use vsphere_lib::{parse_namespaces, ConnectionConfig, MetricRequest};

const ENV_PREFIX: &str = "VSPHERE";
const CONFIG_FILE_ENV: &str = "VSPHERE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// vSphere endpoint URL
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Accept self-signed vSphere certificates
    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub cluster_name: String,

    /// Namespaces collected on every tick; empty disables the periodic loop
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// API server port for health/metrics/collection endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Collection interval in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_port() -> u16 {
    8080
}

fn default_collection_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

impl AgentConfig {
    /// Load configuration from the environment and the optional config file
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("namespaces"),
        );
        Self::from_builder(builder)
    }

    pub(crate) fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("failed to read agent configuration")?;
        config
            .try_deserialize()
            .context("invalid agent configuration")
    }

    /// Connection parameters for the collector
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            insecure: self.insecure,
            cluster_name: self.cluster_name.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Parse the configured namespaces; any malformed entry is an error
    pub fn requests(&self) -> Result<Vec<MetricRequest>> {
        parse_namespaces(&self.namespaces).context("invalid namespace in configuration")
    }
}
