//! Backend query construction
//!
//! Pure, stateless building blocks: a clause-based search-query builder and
//! the aggregation descriptors used for span-aggregation requests.

mod aggregation;
mod builder;

pub use aggregation::{
    AggregationResultReader, AggregationSpec, Compute, GroupBy, SortOrder, SortSpec,
};
pub use builder::QueryBuilder;
