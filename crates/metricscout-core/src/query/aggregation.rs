//! Span aggregation descriptors
//!
//! The backend evaluates an ordered list of compute descriptors and returns
//! the results positionally (`c0`, `c1`, ...). Query construction and result
//! parsing therefore share one [`AggregationSpec`], and buckets are read back
//! through the [`AggregationResultReader`] so the two cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::backend::SpanBucket;

/// One statistical computation over a span set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compute {
    /// Aggregation function, e.g. `count`, `pc50`, `pc95`
    pub aggregation: String,

    /// Source attribute for the aggregation, if it needs one
    pub metric: Option<String>,
}

impl Compute {
    /// Compute with no source attribute (e.g. a plain `count`)
    pub fn new(aggregation: &str) -> Self {
        Self {
            aggregation: aggregation.to_string(),
            metric: None,
        }
    }

    /// Compute over a source attribute
    pub fn over(aggregation: &str, metric: &str) -> Self {
        Self {
            aggregation: aggregation.to_string(),
            metric: Some(metric.to_string()),
        }
    }
}

/// Sort direction for group-by buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// How to order returned buckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Aggregation the ordering is computed from
    pub aggregation: String,
    /// Direction
    pub order: SortOrder,
}

/// Bucketing descriptor for an aggregation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Tag / facet to bucket by
    pub facet: String,
    /// Maximum buckets returned
    pub limit: usize,
    /// Bucket ordering
    pub sort: SortSpec,
}

/// An ordered compute list plus optional bucketing
///
/// Compute positions are significant: position `i` comes back from the
/// backend under the key `c{i}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    /// Ordered computes
    pub computes: Vec<Compute>,
    /// Optional bucketing
    pub group_by: Option<GroupBy>,
}

impl AggregationSpec {
    /// The standard request-health spec: count, error count, then p50/p95/p99
    /// of span duration, in that fixed order
    pub fn standard() -> Self {
        Self {
            computes: vec![
                Compute::new("count"),
                Compute::over("count", "@error"),
                Compute::over("pc50", "@duration"),
                Compute::over("pc95", "@duration"),
                Compute::over("pc99", "@duration"),
            ],
            group_by: None,
        }
    }

    /// Standard spec bucketed by resource name, highest traffic first
    pub fn standard_by_resource() -> Self {
        Self {
            group_by: Some(GroupBy {
                facet: "resource_name".to_string(),
                limit: 100,
                sort: SortSpec {
                    aggregation: "count".to_string(),
                    order: SortOrder::Desc,
                },
            }),
            ..Self::standard()
        }
    }

    /// Standard spec bucketed by downstream peer service
    pub fn standard_by_peer_service() -> Self {
        Self {
            group_by: Some(GroupBy {
                facet: "@peer.service".to_string(),
                limit: 25,
                sort: SortSpec {
                    aggregation: "count".to_string(),
                    order: SortOrder::Desc,
                },
            }),
            ..Self::standard()
        }
    }

    /// Error-count spec bucketed by error type, most frequent first
    pub fn errors_by_type() -> Self {
        Self {
            computes: vec![Compute::new("count")],
            group_by: Some(GroupBy {
                facet: "@error.type".to_string(),
                limit: 25,
                sort: SortSpec {
                    aggregation: "count".to_string(),
                    order: SortOrder::Desc,
                },
            }),
        }
    }

    /// Positional key (`c{i}`) of the first compute matching the arguments
    pub fn position_of(&self, aggregation: &str, metric: Option<&str>) -> Option<String> {
        self.computes
            .iter()
            .position(|c| c.aggregation == aggregation && c.metric.as_deref() == metric)
            .map(|i| format!("c{i}"))
    }
}

/// Reads positional compute values out of result buckets using the spec the
/// request was built from
#[derive(Debug, Clone, Copy)]
pub struct AggregationResultReader<'a> {
    spec: &'a AggregationSpec,
}

impl<'a> AggregationResultReader<'a> {
    /// Bind a reader to the spec used for the request
    pub fn new(spec: &'a AggregationSpec) -> Self {
        Self { spec }
    }

    /// Value of the given compute in a bucket, if present
    pub fn value(&self, bucket: &SpanBucket, aggregation: &str, metric: Option<&str>) -> Option<f64> {
        let key = self.spec.position_of(aggregation, metric)?;
        bucket.computes.get(&key).copied()
    }

    /// Plain span count
    pub fn count(&self, bucket: &SpanBucket) -> f64 {
        self.value(bucket, "count", None).unwrap_or(0.0)
    }

    /// Error span count
    pub fn error_count(&self, bucket: &SpanBucket) -> f64 {
        self.value(bucket, "count", Some("@error")).unwrap_or(0.0)
    }

    /// Duration percentile in nanoseconds (`pc50`, `pc95`, `pc99`)
    pub fn duration_percentile(&self, bucket: &SpanBucket, percentile: &str) -> f64 {
        self.value(bucket, percentile, Some("@duration"))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn bucket(values: &[(&str, f64)]) -> SpanBucket {
        SpanBucket {
            by: HashMap::new(),
            computes: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn standard_spec_positions_are_fixed() {
        let spec = AggregationSpec::standard();
        assert_eq!(spec.position_of("count", None).unwrap(), "c0");
        assert_eq!(spec.position_of("count", Some("@error")).unwrap(), "c1");
        assert_eq!(spec.position_of("pc50", Some("@duration")).unwrap(), "c2");
        assert_eq!(spec.position_of("pc95", Some("@duration")).unwrap(), "c3");
        assert_eq!(spec.position_of("pc99", Some("@duration")).unwrap(), "c4");
    }

    #[test]
    fn reader_maps_positions_to_named_fields() {
        let spec = AggregationSpec::standard_by_resource();
        let reader = AggregationResultReader::new(&spec);
        let bucket = bucket(&[
            ("c0", 1000.0),
            ("c1", 20.0),
            ("c2", 50_000_000.0),
            ("c3", 120_000_000.0),
            ("c4", 200_000_000.0),
        ]);

        assert_eq!(reader.count(&bucket), 1000.0);
        assert_eq!(reader.error_count(&bucket), 20.0);
        assert_eq!(reader.duration_percentile(&bucket, "pc95"), 120_000_000.0);
    }

    #[test]
    fn reader_defaults_missing_values_to_zero() {
        let spec = AggregationSpec::errors_by_type();
        let reader = AggregationResultReader::new(&spec);
        let bucket = bucket(&[("c0", 3.0)]);

        assert_eq!(reader.count(&bucket), 3.0);
        // errors_by_type has no percentile computes at all
        assert_eq!(reader.duration_percentile(&bucket, "pc95"), 0.0);
    }

    #[test]
    fn resource_group_by_limits_and_sorts() {
        let spec = AggregationSpec::standard_by_resource();
        let group_by = spec.group_by.unwrap();
        assert_eq!(group_by.facet, "resource_name");
        assert_eq!(group_by.limit, 100);
        assert_eq!(group_by.sort.aggregation, "count");
        assert_eq!(group_by.sort.order, SortOrder::Desc);
    }
}
