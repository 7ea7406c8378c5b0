//! Telemetry backend collaborators
//!
//! The discovery and orchestration layers only see these traits; the
//! concrete HTTP implementation lives in [`http`] and every outbound call
//! goes through the retry wrapper in [`retry`].

mod http;
mod retry;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{Compute, GroupBy};

pub use http::HttpBackend;
pub use retry::with_retry;

/// One time series returned by a metrics query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Tag scope the series was grouped under, e.g.
    /// `service:checkout,resource_name:GET /cart`
    pub scope: String,

    /// `(timestamp_seconds, value)` points, oldest first
    pub points: Vec<(f64, f64)>,
}

impl MetricSeries {
    /// Value of the most recent point, if any
    pub fn latest_value(&self) -> Option<f64> {
        self.points.last().map(|(_, v)| *v)
    }

    /// Value of a tag within the series scope, if present
    pub fn scope_tag(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}:");
        self.scope
            .split(',')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix(prefix.as_str()))
    }
}

/// One group-by bucket from a span aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanBucket {
    /// Group-by tag values, keyed by facet
    pub by: HashMap<String, String>,

    /// Positional compute values (`c0`, `c1`, ...)
    pub computes: HashMap<String, f64>,
}

/// Queries pre-aggregated metric time series
#[async_trait]
pub trait TimeSeriesClient: Send + Sync {
    /// Evaluate a metrics query over `[from_ms, to_ms]`
    async fn query_metrics(&self, query: &str, from_ms: i64, to_ms: i64)
        -> Result<Vec<MetricSeries>>;
}

/// Searches the backend's metric-name catalog
#[async_trait]
pub trait MetricCatalogClient: Send + Sync {
    /// List metric names matching a wildcard pattern
    async fn list_metrics(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Runs on-demand aggregations over raw spans
#[async_trait]
pub trait SpanAggregationClient: Send + Sync {
    /// Aggregate spans matching `query` over `[from_ms, to_ms]`
    async fn aggregate_spans(
        &self,
        query: &str,
        from_ms: i64,
        to_ms: i64,
        computes: &[Compute],
        group_by: Option<&GroupBy>,
    ) -> Result<Vec<SpanBucket>>;
}

/// Searches raw span records
#[async_trait]
pub trait SpanSearchClient: Send + Sync {
    /// List spans matching `query`, sorted by `sort`, capped at `limit`
    async fn list_spans(
        &self,
        query: &str,
        from_ms: i64,
        to_ms: i64,
        sort: &str,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Programmable in-memory backend for tests

    use parking_lot::Mutex;

    use super::*;
    use crate::error::Error;

    /// Mock backend implementing every collaborator trait
    ///
    /// Responses are matched by substring against the query, so tests do not
    /// have to reproduce full query strings.
    #[derive(Default)]
    pub struct MockBackend {
        series: Mutex<Vec<(String, Vec<MetricSeries>)>>,
        failing: Mutex<Vec<String>>,
        metric_names: Mutex<Vec<String>>,
        buckets: Mutex<Vec<SpanBucket>>,
        spans: Mutex<Vec<serde_json::Value>>,
        pub metric_queries: Mutex<Vec<String>>,
        pub aggregate_queries: Mutex<Vec<String>>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `series` for any metrics query containing `fragment`
        pub fn with_series(&self, fragment: &str, series: Vec<MetricSeries>) {
            self.series.lock().push((fragment.to_string(), series));
        }

        /// Fail any metrics query containing `fragment`
        pub fn fail_on(&self, fragment: &str) {
            self.failing.lock().push(fragment.to_string());
        }

        /// Set the metric-name catalog returned by `list_metrics`
        pub fn with_metric_names(&self, names: &[&str]) {
            *self.metric_names.lock() = names.iter().map(|s| s.to_string()).collect();
        }

        /// Set the buckets returned by `aggregate_spans`
        pub fn with_buckets(&self, buckets: Vec<SpanBucket>) {
            *self.buckets.lock() = buckets;
        }

        /// Convenience: one series with a single point
        pub fn single_point(scope: &str, value: f64) -> Vec<MetricSeries> {
            vec![MetricSeries {
                scope: scope.to_string(),
                points: vec![(1_700_000_000.0, value)],
            }]
        }
    }

    #[async_trait]
    impl TimeSeriesClient for MockBackend {
        async fn query_metrics(
            &self,
            query: &str,
            _from_ms: i64,
            _to_ms: i64,
        ) -> Result<Vec<MetricSeries>> {
            self.metric_queries.lock().push(query.to_string());
            if self.failing.lock().iter().any(|f| query.contains(f.as_str())) {
                return Err(Error::internal("mock backend failure"));
            }
            let series = self.series.lock();
            Ok(series
                .iter()
                .filter(|(fragment, _)| query.contains(fragment.as_str()))
                .flat_map(|(_, s)| s.clone())
                .collect())
        }
    }

    #[async_trait]
    impl MetricCatalogClient for MockBackend {
        async fn list_metrics(&self, _pattern: &str) -> Result<Vec<String>> {
            Ok(self.metric_names.lock().clone())
        }
    }

    #[async_trait]
    impl SpanAggregationClient for MockBackend {
        async fn aggregate_spans(
            &self,
            query: &str,
            _from_ms: i64,
            _to_ms: i64,
            _computes: &[Compute],
            _group_by: Option<&GroupBy>,
        ) -> Result<Vec<SpanBucket>> {
            self.aggregate_queries.lock().push(query.to_string());
            Ok(self.buckets.lock().clone())
        }
    }

    #[async_trait]
    impl SpanSearchClient for MockBackend {
        async fn list_spans(
            &self,
            _query: &str,
            _from_ms: i64,
            _to_ms: i64,
            _sort: &str,
            _limit: usize,
        ) -> Result<Vec<serde_json::Value>> {
            Ok(self.spans.lock().clone())
        }
    }
}
