//! Per-operation metrics model

use serde::{Deserialize, Serialize};

/// Normalized metrics for one operation (resource) of a service
///
/// Produced by either the pre-aggregated time-series path or the
/// span-aggregation path. The pre-aggregated path can only populate
/// `p95_latency_ms`; counts and the other percentiles stay zero there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetrics {
    /// Operation (resource) name, e.g. `GET /cart`
    pub operation: String,

    /// Total request count in the window
    pub request_count: i64,

    /// Error count in the window
    pub error_count: i64,

    /// 50th percentile latency in milliseconds
    pub p50_latency_ms: f64,

    /// 95th percentile latency in milliseconds
    pub p95_latency_ms: f64,

    /// 99th percentile latency in milliseconds
    pub p99_latency_ms: f64,

    /// Error rate as a percentage (0–100)
    pub error_rate: f64,
}

impl OperationMetrics {
    /// Derive the error rate from counts, guarding against zero requests
    pub fn derive_error_rate(request_count: i64, error_count: i64) -> f64 {
        if request_count == 0 {
            0.0
        } else {
            error_count as f64 / request_count as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_zero_requests() {
        assert_eq!(OperationMetrics::derive_error_rate(0, 0), 0.0);
        assert_eq!(OperationMetrics::derive_error_rate(0, 5), 0.0);
    }

    #[test]
    fn error_rate_percentage() {
        let rate = OperationMetrics::derive_error_rate(200, 10);
        assert!((rate - 5.0).abs() < f64::EPSILON);
    }
}
