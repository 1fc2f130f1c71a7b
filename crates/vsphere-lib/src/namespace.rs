//! Metric namespace grammar
//!
//! Namespaces are fixed-position paths:
//! - `/intel/vmware/vsphere/host/<host>/<group>/<instance>/<metric>`
//! - `/intel/vmware/vsphere/host/<host>/vm/<vm>/<group>/<instance>/<metric>`
//!
//! Host, VM and instance positions accept the `*` wildcard.

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const VENDOR: &str = "intel";
pub const CLASS: &str = "vmware";
pub const PRODUCT: &str = "vsphere";
pub const WILDCARD: &str = "*";

const HOST_ANCHOR: &str = "host";
const VM_ANCHOR: &str = "vm";
const HOST_FORM_LEN: usize = 8;
const VM_FORM_LEN: usize = 10;

/// Entity a metric is sampled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Host,
    Vm,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Host => write!(f, "host"),
            SourceKind::Vm => write!(f, "vm"),
        }
    }
}

/// `true` when `selector` is the wildcard or equals `value`
pub fn selector_matches(selector: &str, value: &str) -> bool {
    selector == WILDCARD || selector == value
}

/// A requested metric namespace split into its positional fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRequest {
    pub host: String,
    /// `Some` for VM-level requests
    pub vm: Option<String>,
    pub group: String,
    pub instance: String,
    pub metric: String,
}

impl MetricRequest {
    /// Build a request from namespace elements (without separators)
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        let parts: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();
        let invalid = |reason: &str| CollectorError::InvalidNamespace {
            namespace: format!("/{}", parts.join("/")),
            reason: reason.to_string(),
        };

        if parts.len() < HOST_FORM_LEN {
            return Err(invalid("too few elements"));
        }
        if parts[0] != VENDOR || parts[1] != CLASS || parts[2] != PRODUCT {
            return Err(invalid("unexpected prefix"));
        }
        if parts[3] != HOST_ANCHOR {
            return Err(invalid("expected host element"));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty element"));
        }

        let request = match (parts.len(), parts[5]) {
            (VM_FORM_LEN, VM_ANCHOR) => Self {
                host: parts[4].to_string(),
                vm: Some(parts[6].to_string()),
                group: parts[7].to_string(),
                instance: parts[8].to_string(),
                metric: parts[9].to_string(),
            },
            (HOST_FORM_LEN, anchor) if anchor != VM_ANCHOR => Self {
                host: parts[4].to_string(),
                vm: None,
                group: parts[5].to_string(),
                instance: parts[6].to_string(),
                metric: parts[7].to_string(),
            },
            _ => return Err(invalid("unexpected number of elements")),
        };

        if request.group == WILDCARD || request.metric == WILDCARD {
            return Err(invalid("group and metric must be literal"));
        }

        Ok(request)
    }

    pub fn kind(&self) -> SourceKind {
        if self.vm.is_some() {
            SourceKind::Vm
        } else {
            SourceKind::Host
        }
    }

    /// Namespace string with wildcard positions replaced by concrete values
    pub fn resolve(&self, host: &str, vm: &str, instance: &str) -> String {
        let pick = |selector: &str, value: &str| {
            if selector == WILDCARD {
                value.to_string()
            } else {
                selector.to_string()
            }
        };

        let resolved = Self {
            host: pick(&self.host, host),
            vm: self.vm.as_deref().map(|selector| pick(selector, vm)),
            group: self.group.clone(),
            instance: pick(&self.instance, instance),
            metric: self.metric.clone(),
        };
        resolved.to_string()
    }
}

impl FromStr for MetricRequest {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        Self::from_segments(&segments)
    }
}

impl fmt::Display for MetricRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{VENDOR}/{CLASS}/{PRODUCT}/{HOST_ANCHOR}/{}", self.host)?;
        if let Some(vm) = &self.vm {
            write!(f, "/{VM_ANCHOR}/{}", vm)?;
        }
        write!(f, "/{}/{}/{}", self.group, self.instance, self.metric)
    }
}
