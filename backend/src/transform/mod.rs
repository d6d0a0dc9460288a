//! In-memory transformations over a loaded dataset.
//!
//! - [`query`] - filter, group/aggregate, sort and derive columns over row objects
//! - [`stats`] - per-column statistics and distinct values

pub mod query;
pub mod stats;

pub use query::{
    add_derived_column, aggregate_rows, filter_rows, sort_rows, AggregateConfig, AggregateOp,
    Aggregation, Filter, FilterOperator, SortDirection,
};
pub use stats::{column_stats, unique_values, ColumnStats};
