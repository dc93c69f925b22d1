//! Algebra evaluation.
//!
//! - [`pattern`] and [`triple_pattern`]: what a pattern matches and binds
//! - [`solution`] and [`multiset`]: bindings and collections of them
//! - [`matcher`]: access-path selection and triple matching
//! - [`context`]: per-query state, timing and the evaluation seam
//! - [`algebra`]: operators and their default evaluation
//! - [`accumulator`]: aggregates
//! - [`processor`]: runs whole queries

pub mod accumulator;
pub mod algebra;
pub mod context;
mod error;
pub mod matcher;
pub mod multiset;
pub mod pattern;
pub mod processor;
pub mod solution;
pub mod triple_pattern;

pub use accumulator::{Accumulator, Aggregate, AggregateFunction, CountAccumulator};
pub use algebra::{Algebra, AlgebraProcessor, Bgp};
pub use context::EvaluationContext;
pub use error::QueryError;
pub use matcher::AccessPath;
pub use multiset::{Multiset, VariableValues};
pub use pattern::{ConstructContext, MatchScope, PatternEvaluationContext, PatternItem};
pub use processor::{Query, QueryProcessor, QueryResult};
pub use solution::{Solution, TEMPORARY_VARIABLE_PREFIX};
pub use triple_pattern::{Position, TripleIndexType, TriplePattern};
