// Life of a query:
// 1. A caller builds an algebra tree (parsing is someone else's job)
// 2. The query processor creates a fresh evaluation context and starts the clock
// 3. Operators evaluate top-down through the context:
//     - Triple patterns pick an index from their fixed and bound positions
//     - Matches become solutions and are joined into the running result
//     - Aggregates fold solutions through accumulators
//    Every loop checks the timeout
// 4. Temporary variables are trimmed and the solutions returned
//
// System components:
//  - Triple store (access interface + in-memory implementation)
//  - Pattern matcher / index selector
//  - Evaluation context and algebra operators
//  - Expressions, function catalog and accumulators

pub mod config;
mod e2e_tests;
pub mod expression;
pub mod query;
pub mod store;
#[cfg(test)]
mod testing;
pub mod time;
pub mod types;

pub use config::{ConfigError, QueryOptions};
pub use query::{
    Algebra, EvaluationContext, Multiset, PatternItem, Query, QueryError, QueryProcessor,
    QueryResult, Solution, TriplePattern,
};
pub use store::{MemoryStore, TripleStore};
pub use types::{Term, Triple};
