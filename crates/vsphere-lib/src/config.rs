//! Connection configuration for the vSphere endpoint

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Parameters needed to reach one vSphere cluster
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Endpoint URL, e.g. `https://vcenter.example.com/sdk`
    pub url: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed certificates
    #[serde(default)]
    pub insecure: bool,
    pub cluster_name: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ConnectionConfig {
    /// Check required parameters; fails before any network call is made
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("url", &self.url),
            ("username", &self.username),
            ("password", &self.password),
            ("cluster_name", &self.cluster_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CollectorError::Config {
                    reason: format!("missing required parameter `{}`", field),
                });
            }
        }

        url::Url::parse(&self.url).map_err(|e| CollectorError::Config {
            reason: format!("invalid url `{}`: {}", self.url, e),
        })?;

        if self.request_timeout_secs == 0 {
            return Err(CollectorError::Config {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Keep the password out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("cluster_name", &self.cluster_name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
