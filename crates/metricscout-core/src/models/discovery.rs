//! Discovered-metric data models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Semantic role a metric plays within its pattern group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricRole {
    /// Request duration / response time
    Latency,
    /// Request or call volume
    Throughput,
    /// Error / exception counts
    Errors,
}

impl MetricRole {
    /// Stable lowercase name, used in cache keys and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latency => "latency",
            Self::Throughput => "throughput",
            Self::Errors => "errors",
        }
    }
}

/// A set of discovered metric names sharing one base pattern
///
/// The base pattern is everything before the last `.` segment, e.g.
/// `trace.servlet.request` for `trace.servlet.request.duration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPatternGroup {
    /// Common prefix of every metric in the group
    pub base_pattern: String,

    /// Full metric names discovered under the base pattern
    pub metrics: Vec<String>,

    /// Whether the group measures incoming (server-side) traffic
    pub is_server_side: bool,
}

impl MetricPatternGroup {
    /// Number of discovered metrics in this group
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Result of metric discovery for one (service, environment) pair
///
/// Immutable once produced; a fresh discovery run supersedes the cached
/// value after expiry rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredMetrics {
    /// Role-to-metric mapping for the best server-side group
    pub primary: BTreeMap<MetricRole, String>,

    /// Role mappings for every other discovered group, keyed by base pattern
    ///
    /// Covers both alternate server-side frameworks and client-side
    /// (outbound) traffic groups.
    pub alternates: BTreeMap<String, BTreeMap<MetricRole, String>>,

    /// Every metric name that returned data during probing
    pub all_metrics: Vec<String>,
}

impl DiscoveredMetrics {
    /// Metric name for a role in the primary group, if discovered
    pub fn primary_metric(&self, role: MetricRole) -> Option<&str> {
        self.primary.get(&role).map(String::as_str)
    }

    /// Whether the primary group can serve latency or throughput queries
    ///
    /// A group with neither is still usable for error-only monitoring, but
    /// callers needing rates or durations must check this and fail with an
    /// insufficient-metrics error instead of proceeding with zeros.
    pub fn has_traffic_metrics(&self) -> bool {
        self.primary.contains_key(&MetricRole::Latency)
            || self.primary.contains_key(&MetricRole::Throughput)
    }
}
