//! Aggregation-where filters over relationships.
//!
//! `operators` holds the comparator table shared with the shape builder,
//! `predicate` parses input values into a typed tree, and `compiler` lowers
//! that tree into a counting subquery.

pub mod compiler;
pub mod operators;
pub mod predicate;

pub use compiler::{compile_aggregate, AggregatePattern, CompiledAggregate};
pub use operators::{
    comparators_for, parse_comparator, AggregateComparator, AggregateComparison,
    AggregateFunction,
};
pub use predicate::{parse_aggregate_where, AggregatePredicate, AggregateScope, AggregateTarget};
