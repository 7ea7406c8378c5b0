//! Per-operation metrics via the hybrid query strategy
//!
//! Two sequential attempts, first success wins. The pre-aggregated path
//! reads an already-rolled-up latency metric grouped by operation name and
//! is cheap but partial; the span-aggregation path recomputes everything
//! from raw spans and is complete but expensive. Both normalize into
//! [`OperationMetrics`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info};

use crate::backend::{SpanAggregationClient, TimeSeriesClient};
use crate::cache::{cache_key, TtlCache};
use crate::discovery::DiscoveryEngine;
use crate::error::{Error, Result};
use crate::models::{DiscoveredMetrics, MetricRole, OperationMetrics, TimeRange};
use crate::query::{AggregationResultReader, AggregationSpec, QueryBuilder};

/// Operations breakdowns are hot data; both paths cache for this long
/// regardless of the requested window
const OPERATIONS_TTL: Duration = Duration::from_secs(120);

/// Nanoseconds per millisecond, for converting aggregated durations
const NS_PER_MS: f64 = 1_000_000.0;

/// Orchestrates the pre-aggregated and span-aggregation strategies
pub struct OperationsOrchestrator {
    discovery: Arc<DiscoveryEngine>,
    time_series: Arc<dyn TimeSeriesClient>,
    span_aggregation: Arc<dyn SpanAggregationClient>,
    result_cache: Arc<TtlCache<String, serde_json::Value>>,
}

impl OperationsOrchestrator {
    /// Wire up the orchestrator from its collaborators
    pub fn new(
        discovery: Arc<DiscoveryEngine>,
        time_series: Arc<dyn TimeSeriesClient>,
        span_aggregation: Arc<dyn SpanAggregationClient>,
        result_cache: Arc<TtlCache<String, serde_json::Value>>,
    ) -> Self {
        Self {
            discovery,
            time_series,
            span_aggregation,
            result_cache,
        }
    }

    /// Per-operation metrics for a service over the window
    pub async fn get_operations(
        &self,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<OperationMetrics>> {
        for source in ["timeseries", "spans"] {
            let key = self.key(source, service, environment, range);
            if let Some(hit) = self.result_cache.get(&key) {
                debug!(service, source, "operations cache hit");
                return Ok(serde_json::from_value(hit)?);
            }
        }

        // discovery informs the fast path and the final error message;
        // not-found outcomes fall through to the span path
        let discovered = match self.discovery.discover(service, environment, Some(range)).await {
            Ok(d) => Some(d),
            Err(Error::NotInstrumented { .. }) => None,
            Err(e) => return Err(e),
        };

        if let Some(latency_metric) = discovered
            .as_ref()
            .and_then(|d| d.primary_metric(MetricRole::Latency))
        {
            let operations = self
                .preaggregated_path(latency_metric, service, environment, range)
                .await?;
            if !operations.is_empty() {
                self.store("timeseries", service, environment, range, &operations)?;
                return Ok(operations);
            }
            debug!(service, "pre-aggregated path yielded no operations, trying span aggregation");
        }

        let operations = self.span_path(service, environment, range).await?;
        if !operations.is_empty() {
            self.store("spans", service, environment, range, &operations)?;
            return Ok(operations);
        }

        Err(self.empty_result_error(service, discovered.as_ref()))
    }

    /// Fast path: query the discovered latency metric grouped by operation
    /// name
    ///
    /// Structurally partial: only `p95_latency_ms` can be populated from a
    /// rolled-up series; counts and the other percentiles stay zero.
    async fn preaggregated_path(
        &self,
        latency_metric: &str,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<OperationMetrics>> {
        let scope = match environment {
            Some(env) => format!("service:{service},env:{env}"),
            None => format!("service:{service}"),
        };
        let query = format!("avg:{latency_metric}{{{scope}}} by {{resource_name}}");

        let series = self
            .time_series
            .query_metrics(&query, range.from_ms, range.to_ms)
            .await?;

        let mut operations = Vec::new();
        for s in &series {
            let Some(operation) = s.scope_tag("resource_name") else {
                continue;
            };
            let Some(latest) = s.latest_value() else {
                continue;
            };
            operations.push(OperationMetrics {
                operation: operation.to_string(),
                request_count: 0,
                error_count: 0,
                p50_latency_ms: 0.0,
                p95_latency_ms: latest,
                p99_latency_ms: 0.0,
                error_rate: 0.0,
            });
        }

        info!(
            service,
            operations = operations.len(),
            "pre-aggregated operations query complete"
        );
        Ok(operations)
    }

    /// Full path: aggregate service-entry spans grouped by resource name
    ///
    /// Entry spans only, so internal and downstream spans never count as
    /// top-level request operations.
    async fn span_path(
        &self,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<OperationMetrics>> {
        let mut builder = QueryBuilder::new().service(service);
        if let Some(env) = environment {
            builder = builder.environment(env);
        }
        let query = builder.span_kind("entry").build();

        let spec = AggregationSpec::standard_by_resource();
        let buckets = self
            .span_aggregation
            .aggregate_spans(
                &query,
                range.from_ms,
                range.to_ms,
                &spec.computes,
                spec.group_by.as_ref(),
            )
            .await?;

        let reader = AggregationResultReader::new(&spec);
        let mut operations = Vec::new();
        for bucket in &buckets {
            let Some(operation) = bucket.by.get("resource_name") else {
                continue;
            };
            let request_count = reader.count(bucket) as i64;
            let error_count = reader.error_count(bucket) as i64;
            operations.push(OperationMetrics {
                operation: operation.clone(),
                request_count,
                error_count,
                p50_latency_ms: reader.duration_percentile(bucket, "pc50") / NS_PER_MS,
                p95_latency_ms: reader.duration_percentile(bucket, "pc95") / NS_PER_MS,
                p99_latency_ms: reader.duration_percentile(bucket, "pc99") / NS_PER_MS,
                error_rate: OperationMetrics::derive_error_rate(request_count, error_count),
            });
        }

        info!(
            service,
            operations = operations.len(),
            "span-aggregation operations query complete"
        );
        Ok(operations)
    }

    fn key(
        &self,
        source: &str,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
    ) -> String {
        // keyed on the window width, not its absolute bounds, so repeated
        // "last 1h" calls share an entry for the cache's lifetime
        cache_key(
            "get_operations",
            &json!({
                "source": source,
                "service": service,
                "environment": environment,
                "window_ms": range.span_ms(),
            }),
        )
    }

    fn store(
        &self,
        source: &str,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
        operations: &[OperationMetrics],
    ) -> Result<()> {
        let key = self.key(source, service, environment, range);
        self.result_cache
            .insert(key, serde_json::to_value(operations)?, OPERATIONS_TTL);
        Ok(())
    }

    fn empty_result_error(&self, service: &str, discovered: Option<&DiscoveredMetrics>) -> Error {
        match discovered {
            None => Error::not_instrumented(service),
            Some(d) if !d.has_traffic_metrics() => Error::insufficient_metrics(
                service,
                "latency or throughput",
                d.all_metrics.clone(),
            ),
            Some(d) => Error::no_data(
                service,
                format!(
                    "instrumentation exists ({} metrics discovered) but the window has no traffic; try widening the time range",
                    d.all_metrics.len()
                ),
            ),
        }
    }
}
