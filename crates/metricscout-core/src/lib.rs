//! # MetricScout
//!
//! Adaptive metric discovery and query construction for telemetry backends.
//!
//! Given a service instrumented by an unknown framework, MetricScout probes
//! which metric names actually carry data, classifies them into semantic
//! roles (latency, throughput, errors) and traffic direction, builds backend
//! queries from typed filter primitives, and answers per-operation health
//! questions through a hybrid pre-aggregated / span-aggregation strategy.
//!
//! ## Architecture
//!
//! - **Discovery**: pattern catalog, concurrent probing, fallback search
//! - **Query**: search-query builder and span-aggregation descriptors
//! - **Operations**: hybrid orchestration into one normalized shape
//! - **Cache**: TTL caches tuned to query recency
//! - **Backend**: collaborator traits with an HTTP implementation and
//!   uniform retry
//!
//! ## Quick Start
//!
//! ```bash
//! # Which metrics does this service actually emit?
//! metricscout discover checkout --env prod
//!
//! # Per-operation latency, traffic and errors
//! metricscout operations checkout --range 1h
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod models;
pub mod operations;
pub mod query;

pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::discovery::DiscoveryEngine;
    pub use crate::engine::Engine;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::operations::OperationsOrchestrator;
    pub use crate::query::{AggregationSpec, QueryBuilder};
}
