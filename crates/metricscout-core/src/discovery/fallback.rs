//! Global metric-name search, used when the pattern catalog misses

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::MetricCatalogClient;
use crate::error::Result;
use crate::models::TimeRange;

use super::prober::CandidateProber;

/// Wildcard pattern covering the generic telemetry namespace
const SEARCH_NAMESPACE: &str = "trace.*";

/// Keywords a candidate name must contain to be worth probing
const CANDIDATE_KEYWORDS: &[&str] = &[
    "duration", "hits", "errors", "latency", "requests", "count",
];

/// Fallback discovery via the backend's metric-name catalog
///
/// Strictly slower than the pattern catalog; only reached when no known
/// pattern returned data.
pub struct FallbackSearch {
    catalog: Arc<dyn MetricCatalogClient>,
    candidate_cap: usize,
}

impl FallbackSearch {
    /// Create a fallback search with a cap on how many filtered candidates
    /// get probed
    pub fn new(catalog: Arc<dyn MetricCatalogClient>, candidate_cap: usize) -> Self {
        Self {
            catalog,
            candidate_cap,
        }
    }

    /// Search the global namespace and probe the plausible names
    pub async fn search(
        &self,
        prober: &CandidateProber,
        service: &str,
        environment: Option<&str>,
        window: TimeRange,
    ) -> Result<Vec<String>> {
        info!(service, "pattern catalog missed, falling back to global metric search");

        let names = self.catalog.list_metrics(SEARCH_NAMESPACE).await?;
        let mut candidates: Vec<String> = names
            .into_iter()
            .filter(|name| CANDIDATE_KEYWORDS.iter().any(|k| name.contains(k)))
            .collect();
        candidates.truncate(self.candidate_cap);

        debug!(
            service,
            candidates = candidates.len(),
            "probing fallback candidates"
        );
        Ok(prober.probe(&candidates, service, environment, window).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    fn window() -> TimeRange {
        TimeRange {
            from_ms: 0,
            to_ms: 3_600_000,
        }
    }

    #[tokio::test]
    async fn filters_by_keyword_and_probes() {
        let backend = Arc::new(MockBackend::new());
        backend.with_metric_names(&[
            "trace.custom.handler.duration",
            "trace.custom.handler.hits",
            "trace.jvm.heap_memory",
            "trace.custom.gc.pause",
        ]);
        backend.with_series(
            "trace.custom.handler.duration",
            MockBackend::single_point("service:checkout", 5.0),
        );

        let prober = CandidateProber::new(Arc::clone(&backend) as _, 4);
        let search = FallbackSearch::new(Arc::clone(&backend) as _, 50);
        let working = search
            .search(&prober, "checkout", None, window())
            .await
            .unwrap();

        assert_eq!(working, vec!["trace.custom.handler.duration".to_string()]);
        // the non-keyword names were never probed
        let queries = backend.metric_queries.lock();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| !q.contains("heap_memory")));
    }

    #[tokio::test]
    async fn caps_candidate_list_before_probing() {
        let backend = Arc::new(MockBackend::new());
        let many: Vec<String> = (0..80).map(|i| format!("trace.svc{i}.request.count")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        backend.with_metric_names(&refs);

        let prober = CandidateProber::new(Arc::clone(&backend) as _, 4);
        let search = FallbackSearch::new(Arc::clone(&backend) as _, 50);
        search.search(&prober, "checkout", None, window()).await.unwrap();

        assert_eq!(backend.metric_queries.lock().len(), 50);
    }

    #[tokio::test]
    async fn empty_catalog_yields_empty_result() {
        let backend = Arc::new(MockBackend::new());
        backend.with_metric_names(&[]);

        let prober = CandidateProber::new(Arc::clone(&backend) as _, 4);
        let search = FallbackSearch::new(Arc::clone(&backend) as _, 50);
        let working = search
            .search(&prober, "unknown-svc", None, window())
            .await
            .unwrap();

        assert!(working.is_empty());
    }
}
