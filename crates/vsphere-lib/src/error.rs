//! Error taxonomy for a collection cycle
//!
//! Every variant is fatal for the cycle that produced it. Requests for
//! metrics that simply do not exist are not errors and never reach this type.

use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Errors raised while collecting vSphere metrics
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Missing or invalid connection parameters, raised before any network call
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Catalog refresh, inventory fetch or performance query failed
    #[error("{operation} failed: {reason}")]
    Transport { operation: String, reason: String },

    /// A counter, entity reference or cluster could not be resolved
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The provider broke the real-time sampling contract
    #[error("malformed performance response: {reason}")]
    MalformedResponse { reason: String },

    #[error("no metrics specified")]
    NoMetricsRequested,

    #[error("invalid namespace {namespace}: {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// None of the requested namespaces matched a known metric definition
    #[error("requested namespaces do not match any known vSphere metric")]
    EmptyQuery,
}

impl CollectorError {
    pub fn transport(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Short label used in log fields and Prometheus labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Transport { .. } => "transport",
            Self::NotFound { .. } => "not_found",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::NoMetricsRequested | Self::InvalidNamespace { .. } | Self::EmptyQuery => {
                "invalid_request"
            }
        }
    }

    /// Whether the failure originates from talking to vSphere rather than from the caller
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::MalformedResponse { .. })
    }
}
