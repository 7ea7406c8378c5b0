//! Concurrent candidate probing

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, trace};

use crate::backend::TimeSeriesClient;
use crate::models::TimeRange;

/// Probes candidate metric names for actual data
///
/// Fan-out is bounded so a large candidate list cannot burst-load the
/// backend; fan-in joins every candidate before returning. A failed probe
/// counts as "no data" for that candidate and never fails the batch.
pub struct CandidateProber {
    time_series: Arc<dyn TimeSeriesClient>,
    concurrency: usize,
}

impl CandidateProber {
    /// Create a prober over a time-series client with the given fan-out bound
    pub fn new(time_series: Arc<dyn TimeSeriesClient>, concurrency: usize) -> Self {
        Self {
            time_series,
            concurrency: concurrency.max(1),
        }
    }

    /// Return the subset of `candidates` that produced at least one data
    /// point in the window, in candidate order
    pub async fn probe(
        &self,
        candidates: &[String],
        service: &str,
        environment: Option<&str>,
        window: TimeRange,
    ) -> Vec<String> {
        let scope = match environment {
            Some(env) => format!("service:{service},env:{env}"),
            None => format!("service:{service}"),
        };

        let mut outcomes: Vec<(usize, String, bool)> = stream::iter(
            candidates.iter().cloned().enumerate(),
        )
        .map(|(index, candidate)| {
            let query = format!("avg:{candidate}{{{scope}}}");
            let client = Arc::clone(&self.time_series);
            async move {
                let has_data = match client
                    .query_metrics(&query, window.from_ms, window.to_ms)
                    .await
                {
                    Ok(series) => series.iter().any(|s| !s.points.is_empty()),
                    Err(e) => {
                        // a failed probe is "no data", not a batch failure
                        trace!(candidate = %candidate, "probe failed: {}", e);
                        false
                    }
                };
                (index, candidate, has_data)
            }
        })
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        outcomes.sort_by_key(|(index, _, _)| *index);
        let working: Vec<String> = outcomes
            .into_iter()
            .filter(|(_, _, has_data)| *has_data)
            .map(|(_, candidate, _)| candidate)
            .collect();

        debug!(
            service,
            probed = candidates.len(),
            working = working.len(),
            "candidate probe complete"
        );
        working
    }
}
