//! Error types for MetricScout

use thiserror::Error;

/// Result type alias using MetricScout's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for discovery and query operations
#[derive(Error, Debug)]
pub enum Error {
    /// Discovery found no usable metric patterns for the service
    #[error("service '{service}' may not be instrumented: no metric patterns returned data")]
    NotInstrumented {
        /// Service that was probed
        service: String,
    },

    /// Discovery found metrics, but neither latency nor throughput among them
    #[error("service '{service}' has metrics but none usable for {needed}: found {found:?}")]
    InsufficientMetrics {
        /// Service that was probed
        service: String,
        /// What the caller required (e.g. "latency or throughput")
        needed: String,
        /// Metric names that were discovered
        found: Vec<String>,
    },

    /// Instrumentation exists but the query window returned nothing
    #[error("no data for service '{service}' in the requested window: {hint}")]
    NoDataInWindow {
        /// Service that was queried
        service: String,
        /// Guidance distinguishing missing traffic from missing instrumentation
        hint: String,
    },

    /// Backend call failed after retry exhaustion
    #[error("telemetry backend error after {attempts} attempts: {message}")]
    TransientBackend {
        /// Total attempts made, including the first
        attempts: u32,
        /// Last observed error
        message: String,
    },

    /// Input rejected before any backend call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a not-instrumented error
    pub fn not_instrumented(service: impl Into<String>) -> Self {
        Self::NotInstrumented {
            service: service.into(),
        }
    }

    /// Create an insufficient-metrics error
    pub fn insufficient_metrics(
        service: impl Into<String>,
        needed: impl Into<String>,
        found: Vec<String>,
    ) -> Self {
        Self::InsufficientMetrics {
            service: service.into(),
            needed: needed.into(),
            found,
        }
    }

    /// Create a no-data-in-window error
    pub fn no_data(service: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::NoDataInWindow {
            service: service.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error looks like a backend rate limit
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::Http(e) => e.status().map_or(false, |s| s.as_u16() == 429),
            Self::TransientBackend { message, .. } => {
                message.contains("429") || message.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }
}
