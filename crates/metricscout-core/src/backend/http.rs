//! HTTP implementation of the backend collaborator traits
//!
//! Speaks a Datadog-style API: v1 metric queries and name search, v2 span
//! aggregation and span search. Every request is routed through the retry
//! wrapper.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    with_retry, MetricCatalogClient, MetricSeries, SpanAggregationClient, SpanBucket,
    SpanSearchClient, TimeSeriesClient,
};
use crate::config::{BackendConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::query::{Compute, GroupBy};

/// HTTP client for the telemetry backend
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    series: Vec<RawSeries>,
}

#[derive(Deserialize)]
struct RawSeries {
    #[serde(default)]
    scope: String,
    #[serde(default)]
    pointlist: Vec<(f64, f64)>,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    metrics: Vec<String>,
}

#[derive(Deserialize)]
struct AggregateResponse {
    data: AggregateData,
}

#[derive(Deserialize)]
struct AggregateData {
    #[serde(default)]
    buckets: Vec<RawBucket>,
}

#[derive(Deserialize)]
struct RawBucket {
    #[serde(default)]
    by: HashMap<String, String>,
    #[serde(default)]
    computes: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct SpanSearchResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

impl HttpBackend {
    /// Create a backend client from configuration
    pub fn new(config: BackendConfig, retry: RetryConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::config("backend base_url is empty"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("DD-API-KEY", &self.config.api_key)
            .header("DD-APPLICATION-KEY", &self.config.app_key)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("DD-API-KEY", &self.config.api_key)
            .header("DD-APPLICATION-KEY", &self.config.app_key)
    }

    fn span_filter(query: &str, from_ms: i64, to_ms: i64) -> serde_json::Value {
        json!({
            "query": query,
            "from": from_ms.to_string(),
            "to": to_ms.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl TimeSeriesClient for HttpBackend {
    async fn query_metrics(
        &self,
        query: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<MetricSeries>> {
        debug!(query, from_ms, to_ms, "querying metric time series");

        let response: QueryResponse = with_retry("query_metrics", &self.retry, || async {
            let resp = self
                .get("/api/v1/query")
                .query(&[
                    ("query", query.to_string()),
                    ("from", (from_ms / 1000).to_string()),
                    ("to", (to_ms / 1000).to_string()),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<QueryResponse>().await?)
        })
        .await?;

        Ok(response
            .series
            .into_iter()
            .map(|s| MetricSeries {
                scope: s.scope,
                // the wire carries point timestamps in milliseconds
                points: s
                    .pointlist
                    .into_iter()
                    .map(|(ts_ms, v)| (ts_ms / 1000.0, v))
                    .collect(),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl MetricCatalogClient for HttpBackend {
    async fn list_metrics(&self, pattern: &str) -> Result<Vec<String>> {
        debug!(pattern, "searching metric catalog");

        let response: SearchResponse = with_retry("list_metrics", &self.retry, || async {
            let resp = self
                .get("/api/v1/search")
                .query(&[("q", format!("metrics:{pattern}"))])
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<SearchResponse>().await?)
        })
        .await?;

        Ok(response.results.metrics)
    }
}

#[async_trait::async_trait]
impl SpanAggregationClient for HttpBackend {
    async fn aggregate_spans(
        &self,
        query: &str,
        from_ms: i64,
        to_ms: i64,
        computes: &[Compute],
        group_by: Option<&GroupBy>,
    ) -> Result<Vec<SpanBucket>> {
        debug!(query, from_ms, to_ms, "aggregating spans");

        let compute_json: Vec<_> = computes
            .iter()
            .map(|c| {
                json!({
                    "aggregation": c.aggregation,
                    "metric": c.metric,
                    "type": "total",
                })
            })
            .collect();

        let group_by_json: Vec<_> = group_by
            .iter()
            .map(|g| {
                json!({
                    "facet": g.facet,
                    "limit": g.limit,
                    "sort": {
                        "aggregation": g.sort.aggregation,
                        "order": match g.sort.order {
                            crate::query::SortOrder::Asc => "asc",
                            crate::query::SortOrder::Desc => "desc",
                        },
                    },
                })
            })
            .collect();

        let body = json!({
            "data": {
                "attributes": {
                    "filter": Self::span_filter(query, from_ms, to_ms),
                    "compute": compute_json,
                    "group_by": group_by_json,
                },
                "type": "aggregate_request",
            }
        });

        let response: AggregateResponse = with_retry("aggregate_spans", &self.retry, || async {
            let resp = self
                .post("/api/v2/spans/analytics/aggregate")
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<AggregateResponse>().await?)
        })
        .await?;

        Ok(response
            .data
            .buckets
            .into_iter()
            .map(|b| SpanBucket {
                by: b.by,
                computes: b.computes,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl SpanSearchClient for HttpBackend {
    async fn list_spans(
        &self,
        query: &str,
        from_ms: i64,
        to_ms: i64,
        sort: &str,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>> {
        debug!(query, from_ms, to_ms, sort, limit, "searching spans");

        let body = json!({
            "data": {
                "attributes": {
                    "filter": Self::span_filter(query, from_ms, to_ms),
                    "sort": sort,
                    "page": { "limit": limit },
                },
                "type": "search_request",
            }
        });

        let response: SpanSearchResponse = with_retry("list_spans", &self.retry, || async {
            let resp = self
                .post("/api/v2/spans/events/search")
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<SpanSearchResponse>().await?)
        })
        .await?;

        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend(base_url: String) -> HttpBackend {
        HttpBackend::new(
            BackendConfig {
                base_url,
                api_key: "test-api-key".to_string(),
                app_key: "test-app-key".to_string(),
                timeout_seconds: 5,
            },
            RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn query_metrics_parses_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", "avg:trace.servlet.request.duration{service:checkout}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "series": [{
                    "scope": "service:checkout",
                    "pointlist": [[1700000000000.0, 42.5]],
                }]
            })))
            .mount(&server)
            .await;

        let backend = backend(server.uri());
        let series = backend
            .query_metrics(
                "avg:trace.servlet.request.duration{service:checkout}",
                0,
                3_600_000,
            )
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].scope, "service:checkout");
        assert_eq!(series[0].points, vec![(1_700_000_000.0, 42.5)]);
    }

    #[tokio::test]
    async fn list_metrics_parses_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": { "metrics": ["trace.servlet.request.hits", "jvm.heap_memory"] }
            })))
            .mount(&server)
            .await;

        let backend = backend(server.uri());
        let names = backend.list_metrics("trace.*").await.unwrap();
        assert_eq!(names, vec!["trace.servlet.request.hits", "jvm.heap_memory"]);
    }

    #[tokio::test]
    async fn aggregate_spans_parses_buckets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/spans/analytics/aggregate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "buckets": [{
                        "by": { "resource_name": "GET /cart" },
                        "computes": { "c0": 1000.0, "c1": 20.0 },
                    }]
                }
            })))
            .mount(&server)
            .await;

        let backend = backend(server.uri());
        let spec = crate::query::AggregationSpec::standard_by_resource();
        let buckets = backend
            .aggregate_spans(
                "service:checkout",
                0,
                3_600_000,
                &spec.computes,
                spec.group_by.as_ref(),
            )
            .await
            .unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].by["resource_name"], "GET /cart");
        assert_eq!(buckets[0].computes["c0"], 1000.0);
    }

    #[tokio::test]
    async fn server_error_surfaces_as_transient_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = backend(server.uri());
        let err = backend
            .query_metrics("avg:whatever{service:x}", 0, 1000)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransientBackend { attempts: 1, .. }));
    }
}
