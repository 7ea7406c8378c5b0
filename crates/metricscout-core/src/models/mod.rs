//! Data models

mod discovery;
mod operations;
mod time;

pub use discovery::{DiscoveredMetrics, MetricPatternGroup, MetricRole};
pub use operations::OperationMetrics;
pub use time::TimeRange;
