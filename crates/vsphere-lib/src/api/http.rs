//! JSON gateway transport for [`PerfApi`]
//!
//! Speaks to a vSphere gateway exposing the performance manager and the
//! cluster inventory as JSON resources below the configured URL.

use super::{PerfApi, QueryPerfResponse, QuerySpec};
use crate::config::ConnectionConfig;
use crate::error::{CollectorError, Result};
use crate::models::{CounterDescriptor, HostSystem, ManagedObjectRef, VirtualMachine};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// HTTP client for a vSphere JSON gateway
pub struct HttpPerfApi {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryPerfRequest<'a> {
    query_spec: &'a [QuerySpec],
}

impl HttpPerfApi {
    /// Build a client from validated connection parameters
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| CollectorError::transport("client initialization", e))?;

        let base_url = Url::parse(&config.url).map_err(|e| CollectorError::Config {
            reason: format!("invalid url `{}`: {}", config.url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CollectorError::Config {
                reason: format!("url `{}` cannot be used as a base", config.url),
            });
        }

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so path_segments_mut succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Option<T>)> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| CollectorError::transport(operation, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok((status, None));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::transport(
                operation,
                format!("API error ({}): {}", status, body),
            ));
        }

        let body = response
            .json()
            .await
            .map_err(|e| CollectorError::transport(operation, format!("invalid body: {}", e)))?;
        Ok((status, Some(body)))
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments);
        debug!(url = %url, operation, "GET");
        match self.send(operation, self.client.get(url)).await? {
            (_, Some(body)) => Ok(body),
            (status, None) => Err(CollectorError::transport(
                operation,
                format!("API error ({})", status),
            )),
        }
    }
}

#[async_trait]
impl PerfApi for HttpPerfApi {
    async fn retrieve_counters(&self) -> Result<Vec<CounterDescriptor>> {
        self.get("counter catalog refresh", &["perf", "counters"])
            .await
    }

    async fn retrieve_hosts(&self, cluster: &str) -> Result<Vec<HostSystem>> {
        let operation = "host inventory fetch";
        let url = self.endpoint(&["clusters", cluster, "hosts"]);
        debug!(url = %url, operation, "GET");
        match self.send(operation, self.client.get(url)).await? {
            (_, Some(hosts)) => Ok(hosts),
            (_, None) => Err(CollectorError::not_found("cluster", cluster)),
        }
    }

    async fn retrieve_vms(&self, host: &ManagedObjectRef) -> Result<Vec<VirtualMachine>> {
        self.get("virtual machine inventory fetch", &["hosts", &host.value, "vms"])
            .await
    }

    async fn query_perf(&self, specs: &[QuerySpec]) -> Result<QueryPerfResponse> {
        let operation = "performance query";
        let url = self.endpoint(&["perf", "query"]);
        debug!(url = %url, specs = specs.len(), "POST");
        let request = self
            .client
            .post(url)
            .json(&QueryPerfRequest { query_spec: specs });
        match self.send(operation, request).await? {
            (_, Some(response)) => Ok(response),
            (status, None) => Err(CollectorError::transport(
                operation,
                format!("API error ({})", status),
            )),
        }
    }
}
