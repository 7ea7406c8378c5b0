//! Known metric-name patterns and classification heuristics

use std::collections::BTreeMap;

use crate::models::{MetricPatternGroup, MetricRole};

/// Base patterns emitted by instrumentation frameworks we know about
///
/// Servlet containers, reactive servers, web frameworks, RPC, GraphQL and
/// messaging, plus the common client-side (outbound) libraries.
const FRAMEWORK_BASES: &[&str] = &[
    // server-side request handling
    "trace.servlet.request",
    "trace.web.request",
    "trace.netty.request",
    "trace.express.request",
    "trace.flask.request",
    "trace.django.request",
    "trace.rack.request",
    "trace.aspnet.request",
    "trace.grpc.server",
    "trace.graphql.execute",
    "trace.kafka.consume",
    // client-side (outbound) traffic
    "trace.http.request",
    "trace.grpc.client",
    "trace.kafka.produce",
];

/// Suffixes probed for every framework base
const PROBE_SUFFIXES: &[&str] = &["duration", "hits", "errors"];

/// Suffixes assigning the latency role, in priority order
const LATENCY_SUFFIXES: &[&str] = &[".duration", ".latency", ".response_time", ".time"];

/// Suffixes assigning the throughput role, in priority order
const THROUGHPUT_SUFFIXES: &[&str] = &[".hits", ".requests", ".request_count", ".count", ".calls"];

/// Suffixes assigning the errors role, in priority order
const ERROR_SUFFIXES: &[&str] = &[".errors", ".exceptions", ".failures", ".error_count"];

/// Markers identifying client-side (outbound) traffic patterns
///
/// These take precedence over server markers: a pattern carrying any client
/// marker is never classified server-side.
const CLIENT_MARKERS: &[&str] = &[
    ".client",
    ".outbound",
    "http.request",
    "okhttp",
    "httpclient",
    "urllib",
    "kafka.produce",
];

/// Markers identifying server-side (incoming) traffic patterns
const SERVER_MARKERS: &[&str] = &[
    ".server",
    "servlet",
    "web.request",
    "netty",
    "express",
    "flask",
    "django",
    "rack",
    "aspnet",
    "graphql",
    "kafka.consume",
];

/// Full candidate metric names from the static catalog
pub fn catalog_candidates() -> Vec<String> {
    FRAMEWORK_BASES
        .iter()
        .flat_map(|base| PROBE_SUFFIXES.iter().map(move |s| format!("{base}.{s}")))
        .collect()
}

/// Assign a semantic role from the metric-name suffix
///
/// The first matching suffix in the fixed priority order wins; names
/// matching nothing get no role.
pub fn classify_role(metric: &str) -> Option<MetricRole> {
    let tables = [
        (MetricRole::Latency, LATENCY_SUFFIXES),
        (MetricRole::Throughput, THROUGHPUT_SUFFIXES),
        (MetricRole::Errors, ERROR_SUFFIXES),
    ];
    for (role, suffixes) in tables {
        if suffixes.iter().any(|s| metric.ends_with(s)) {
            return Some(role);
        }
    }
    None
}

/// Whether a base pattern measures the service's own (incoming) traffic
///
/// Client markers override server markers; patterns matching neither
/// default to not-server-side, which keeps ambiguous patterns out of
/// primary metric selection.
pub fn is_server_side(base_pattern: &str) -> bool {
    if CLIENT_MARKERS.iter().any(|m| base_pattern.contains(m)) {
        return false;
    }
    SERVER_MARKERS.iter().any(|m| base_pattern.contains(m))
}

/// Group discovered metric names by their base pattern
///
/// The base is everything before the last `.` segment; every metric lands
/// in exactly one group, in first-seen order.
pub fn group_by_base(metrics: &[String]) -> Vec<MetricPatternGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for metric in metrics {
        let base = metric
            .rsplit_once('.')
            .map_or(metric.as_str(), |(base, _)| base)
            .to_string();
        if !members.contains_key(&base) {
            order.push(base.clone());
        }
        members.entry(base).or_default().push(metric.clone());
    }

    order
        .into_iter()
        .map(|base| {
            let is_server = is_server_side(&base);
            MetricPatternGroup {
                metrics: members.remove(&base).unwrap_or_default(),
                is_server_side: is_server,
                base_pattern: base,
            }
        })
        .collect()
}

/// Map each role to the first group member carrying it
pub fn categorize_roles(metrics: &[String]) -> BTreeMap<MetricRole, String> {
    let mut roles = BTreeMap::new();
    for metric in metrics {
        if let Some(role) = classify_role(metric) {
            roles.entry(role).or_insert_with(|| metric.clone());
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("trace.servlet.request.duration", Some(MetricRole::Latency))]
    #[case("http.server.latency", Some(MetricRole::Latency))]
    #[case("app.handler.response_time", Some(MetricRole::Latency))]
    #[case("app.handler.time", Some(MetricRole::Latency))]
    #[case("trace.servlet.request.hits", Some(MetricRole::Throughput))]
    #[case("http.server.requests", Some(MetricRole::Throughput))]
    #[case("app.handler.request_count", Some(MetricRole::Throughput))]
    #[case("app.handler.count", Some(MetricRole::Throughput))]
    #[case("db.pool.calls", Some(MetricRole::Throughput))]
    #[case("trace.servlet.request.errors", Some(MetricRole::Errors))]
    #[case("app.handler.exceptions", Some(MetricRole::Errors))]
    #[case("app.handler.failures", Some(MetricRole::Errors))]
    #[case("jvm.heap_memory", None)]
    fn role_from_suffix(#[case] metric: &str, #[case] expected: Option<MetricRole>) {
        assert_eq!(classify_role(metric), expected);
    }

    #[test]
    fn client_markers_override_server_markers() {
        // carries both a server marker (servlet) and a client marker
        assert!(!is_server_side("trace.servlet.client"));
        assert!(!is_server_side("trace.grpc.client"));
        assert!(!is_server_side("trace.http.request"));
        assert!(!is_server_side("trace.netty.outbound"));
    }

    #[test]
    fn server_markers_classify_server_side() {
        assert!(is_server_side("trace.servlet.request"));
        assert!(is_server_side("trace.grpc.server"));
        assert!(is_server_side("trace.kafka.consume"));
    }

    #[test]
    fn unmatched_patterns_default_to_not_server_side() {
        assert!(!is_server_side("custom.app.request"));
        assert!(!is_server_side("jvm.gc"));
    }

    #[test]
    fn grouping_assigns_each_metric_once() {
        let metrics = vec![
            "trace.servlet.request.duration".to_string(),
            "trace.servlet.request.hits".to_string(),
            "trace.http.request.duration".to_string(),
        ];
        let groups = group_by_base(&metrics);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].base_pattern, "trace.servlet.request");
        assert_eq!(groups[0].metrics.len(), 2);
        assert!(groups[0].is_server_side);
        assert_eq!(groups[1].base_pattern, "trace.http.request");
        assert!(!groups[1].is_server_side);

        let total: usize = groups.iter().map(MetricPatternGroup::len).sum();
        assert_eq!(total, metrics.len());
    }

    #[test]
    fn catalog_covers_every_framework_and_suffix() {
        let candidates = catalog_candidates();
        assert_eq!(candidates.len(), FRAMEWORK_BASES.len() * PROBE_SUFFIXES.len());
        assert!(candidates.contains(&"trace.servlet.request.duration".to_string()));
        assert!(candidates.contains(&"trace.grpc.client.errors".to_string()));
    }

    #[test]
    fn categorize_takes_first_metric_per_role() {
        let metrics = vec![
            "trace.servlet.request.duration".to_string(),
            "trace.servlet.request.time".to_string(),
            "trace.servlet.request.hits".to_string(),
        ];
        let roles = categorize_roles(&metrics);
        assert_eq!(roles[&MetricRole::Latency], "trace.servlet.request.duration");
        assert_eq!(roles[&MetricRole::Throughput], "trace.servlet.request.hits");
        assert!(!roles.contains_key(&MetricRole::Errors));
    }
}
