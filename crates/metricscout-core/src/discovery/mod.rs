//! Adaptive metric discovery
//!
//! Figures out which metric names actually carry data for a service
//! instrumented by an unknown framework: probe the known-pattern catalog,
//! fall back to a global name search, then group and classify whatever
//! responded.

mod catalog;
mod engine;
mod fallback;
mod prober;

pub use catalog::{
    catalog_candidates, categorize_roles, classify_role, group_by_base, is_server_side,
};
pub use engine::DiscoveryEngine;
pub(crate) use engine::validate_service;
pub use fallback::FallbackSearch;
pub use prober::CandidateProber;
