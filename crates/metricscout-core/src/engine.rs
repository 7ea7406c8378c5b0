//! Application context wiring the engine together
//!
//! Caches and clients are explicitly constructed here and injected into the
//! discovery and orchestration layers; nothing in the crate holds global
//! state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::backend::{
    HttpBackend, MetricCatalogClient, MetricSeries, SpanAggregationClient, SpanSearchClient,
    TimeSeriesClient,
};
use crate::cache::{cache_key, start_sweeper, ttl_for_range, TtlCache};
use crate::config::Config;
use crate::discovery::{validate_service, DiscoveryEngine};
use crate::error::Result;
use crate::models::{DiscoveredMetrics, OperationMetrics, TimeRange};
use crate::operations::OperationsOrchestrator;
use crate::query::QueryBuilder;

/// Default sort for span searches: newest first
const SPAN_SORT: &str = "-timestamp";

/// The assembled discovery and query engine
pub struct Engine {
    discovery: Arc<DiscoveryEngine>,
    operations: OperationsOrchestrator,
    time_series: Arc<dyn TimeSeriesClient>,
    span_search: Arc<dyn SpanSearchClient>,
    result_cache: Arc<TtlCache<String, serde_json::Value>>,
    config: Config,
}

impl Engine {
    /// Assemble an engine from explicit collaborator instances
    pub fn new(
        config: Config,
        time_series: Arc<dyn TimeSeriesClient>,
        metric_catalog: Arc<dyn MetricCatalogClient>,
        span_aggregation: Arc<dyn SpanAggregationClient>,
        span_search: Arc<dyn SpanSearchClient>,
    ) -> Self {
        let discovery = Arc::new(DiscoveryEngine::new(
            Arc::clone(&time_series),
            metric_catalog,
            &config.probe,
            config.cache.clone(),
        ));
        let result_cache = Arc::new(TtlCache::new(config.cache.result_capacity));
        let operations = OperationsOrchestrator::new(
            Arc::clone(&discovery),
            Arc::clone(&time_series),
            span_aggregation,
            Arc::clone(&result_cache),
        );

        Self {
            discovery,
            operations,
            time_series,
            span_search,
            result_cache,
            config,
        }
    }

    /// Assemble an engine backed by the HTTP backend from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(
            config.backend.clone(),
            config.retry.clone(),
        )?);
        Ok(Self::new(
            config,
            Arc::clone(&backend) as _,
            Arc::clone(&backend) as _,
            Arc::clone(&backend) as _,
            backend as _,
        ))
    }

    /// Spawn the periodic cache sweepers; they run for the process lifetime
    pub fn start_sweepers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let every = Duration::from_secs(self.config.cache.sweep_interval_seconds);
        vec![
            start_sweeper(self.discovery.cache(), every),
            start_sweeper(Arc::clone(&self.result_cache), every),
        ]
    }

    /// Discover working metrics for a service
    pub async fn discover(
        &self,
        service: &str,
        environment: Option<&str>,
        window: Option<TimeRange>,
    ) -> Result<DiscoveredMetrics> {
        self.discovery.discover(service, environment, window).await
    }

    /// Per-operation metrics for a service over the window
    pub async fn get_operations(
        &self,
        service: &str,
        environment: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<OperationMetrics>> {
        self.operations
            .get_operations(service, environment, range)
            .await
    }

    /// Evaluate a raw metrics query, cached by the requested window
    pub async fn query_metrics(&self, query: &str, range: TimeRange) -> Result<Vec<MetricSeries>> {
        let key = cache_key(
            "query_metrics",
            &json!({ "query": query, "window_ms": range.span_ms() }),
        );
        if let Some(hit) = self.result_cache.get(&key) {
            debug!(query, "metrics query cache hit");
            return Ok(serde_json::from_value(hit)?);
        }

        let series = self
            .time_series
            .query_metrics(query, range.from_ms, range.to_ms)
            .await?;
        self.result_cache
            .insert(key, serde_json::to_value(&series)?, ttl_for_range(&range));
        Ok(series)
    }

    /// Search recent spans of a service, cached by the requested window
    ///
    /// `extra` is appended to the query verbatim; sanitizing free text is
    /// the caller's responsibility.
    pub async fn list_spans(
        &self,
        service: &str,
        environment: Option<&str>,
        extra: Option<&str>,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>> {
        validate_service(service)?;

        let mut builder = QueryBuilder::new().service(service);
        if let Some(env) = environment {
            builder = builder.environment(env);
        }
        if let Some(extra) = extra {
            builder = builder.raw(extra);
        }
        let query = builder.build();

        let key = cache_key(
            "list_spans",
            &json!({ "query": query, "window_ms": range.span_ms(), "limit": limit }),
        );
        if let Some(hit) = self.result_cache.get(&key) {
            debug!(query, "span search cache hit");
            return Ok(serde_json::from_value(hit)?);
        }

        let spans = self
            .span_search
            .list_spans(&query, range.from_ms, range.to_ms, SPAN_SORT, limit)
            .await?;
        self.result_cache
            .insert(key, serde_json::to_value(&spans)?, ttl_for_range(&range));
        Ok(spans)
    }
}
