//! The discovery pipeline

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::backend::{MetricCatalogClient, TimeSeriesClient};
use crate::cache::TtlCache;
use crate::config::{CacheConfig, ProbeConfig};
use crate::error::{Error, Result};
use crate::models::{DiscoveredMetrics, TimeRange};

use super::catalog::{catalog_candidates, categorize_roles, group_by_base};
use super::fallback::FallbackSearch;
use super::prober::CandidateProber;

static SERVICE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// Reject malformed service names before any backend call
pub(crate) fn validate_service(service: &str) -> Result<()> {
    if SERVICE_NAME.is_match(service) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "service name '{service}' must contain only alphanumerics, dashes and underscores"
        )))
    }
}

/// Discovers which metric names carry data for a service
///
/// Results are cached per (service, environment); only successful
/// discoveries are cached unless a negative TTL is configured.
pub struct DiscoveryEngine {
    prober: CandidateProber,
    fallback: FallbackSearch,
    cache: Arc<TtlCache<String, Option<DiscoveredMetrics>>>,
    cache_config: CacheConfig,
    default_window_seconds: i64,
}

impl DiscoveryEngine {
    /// Wire up the pipeline from its collaborators and configuration
    pub fn new(
        time_series: Arc<dyn TimeSeriesClient>,
        catalog: Arc<dyn MetricCatalogClient>,
        probe_config: &ProbeConfig,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            prober: CandidateProber::new(time_series, probe_config.concurrency),
            fallback: FallbackSearch::new(catalog, probe_config.fallback_candidate_cap),
            cache: Arc::new(TtlCache::new(cache_config.discovery_capacity)),
            default_window_seconds: probe_config.default_window_seconds,
            cache_config,
        }
    }

    /// The discovery cache, for sharing with the sweep task
    pub fn cache(&self) -> Arc<TtlCache<String, Option<DiscoveredMetrics>>> {
        Arc::clone(&self.cache)
    }

    /// Discover working metrics for a service
    ///
    /// Probes the static pattern catalog first, then the global fallback
    /// search. Returns `NotInstrumented` when neither finds a metric with
    /// data.
    pub async fn discover(
        &self,
        service: &str,
        environment: Option<&str>,
        window: Option<TimeRange>,
    ) -> Result<DiscoveredMetrics> {
        validate_service(service)?;

        let cache_key = format!("{service}:{}", environment.unwrap_or("default"));
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(service, "discovery cache hit");
            return match cached {
                Some(discovered) => Ok(discovered),
                None => Err(Error::not_instrumented(service)),
            };
        }

        let window = window.unwrap_or_else(|| TimeRange::last_seconds(self.default_window_seconds));

        let candidates = catalog_candidates();
        let mut working = self
            .prober
            .probe(&candidates, service, environment, window)
            .await;

        if working.is_empty() {
            working = self
                .fallback
                .search(&self.prober, service, environment, window)
                .await?;
        }

        if working.is_empty() {
            if let Some(ttl) = self.cache_config.negative_ttl_seconds {
                self.cache
                    .insert(cache_key, None, Duration::from_secs(ttl));
            }
            return Err(Error::not_instrumented(service));
        }

        let discovered = classify(&working);
        info!(
            service,
            metrics = discovered.all_metrics.len(),
            primary_roles = discovered.primary.len(),
            alternates = discovered.alternates.len(),
            "metric discovery complete"
        );

        self.cache.insert(
            cache_key,
            Some(discovered.clone()),
            Duration::from_secs(self.cache_config.discovery_ttl_seconds),
        );
        Ok(discovered)
    }
}

/// Group working metrics, pick the primary server-side group, and
/// categorize everything into roles
fn classify(working: &[String]) -> DiscoveredMetrics {
    let groups = group_by_base(working);

    // primary is the server-side group with the most discovered members;
    // ties keep the earliest-seen group
    let mut primary_index: Option<usize> = None;
    for (index, group) in groups.iter().enumerate() {
        if !group.is_server_side {
            continue;
        }
        if primary_index.map_or(true, |p| group.len() > groups[p].len()) {
            primary_index = Some(index);
        }
    }

    let mut primary = BTreeMap::new();
    let mut alternates = BTreeMap::new();
    for (index, group) in groups.iter().enumerate() {
        let roles = categorize_roles(&group.metrics);
        if Some(index) == primary_index {
            primary = roles;
        } else if !roles.is_empty() {
            alternates.insert(group.base_pattern.clone(), roles);
        }
    }

    DiscoveredMetrics {
        primary,
        alternates,
        all_metrics: working.to_vec(),
    }
}
