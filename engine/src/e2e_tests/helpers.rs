//! Common helpers for end-to-end tests.

use std::cell::Cell;

use crate::config::QueryOptions;
use crate::query::{Algebra, PatternItem, Query, QueryProcessor, QueryResult, TriplePattern};
use crate::store::MemoryStore;
use crate::testing::init_tracing;
use crate::time::Clock;

pub use crate::testing::{iri, store_of, triple};

/// Shorthand for a variable pattern item.
#[must_use]
pub fn var(name: &str) -> PatternItem {
    PatternItem::var(name)
}

/// Shorthand for a fixed pattern item over an example IRI.
#[must_use]
pub fn fixed(name: &str) -> PatternItem {
    PatternItem::fixed(iri(name))
}

/// A BGP of the given patterns.
#[must_use]
pub fn bgp(patterns: Vec<TriplePattern>) -> Algebra {
    Algebra::bgp(patterns)
}

/// Run an algebra tree with the given options.
pub fn run_with(store: &MemoryStore, algebra: Algebra, options: QueryOptions) -> QueryResult {
    init_tracing();
    let processor = QueryProcessor::new(store, options);
    #[allow(clippy::expect_used)]
    processor
        .execute(&Query::new(algebra))
        .expect("query should succeed")
}

/// Run an algebra tree with default options.
pub fn run(store: &MemoryStore, algebra: Algebra) -> QueryResult {
    run_with(store, algebra, QueryOptions::default())
}

/// A clock that advances by a fixed step every time it is read.
///
/// Lets timeout tests abort a query part-way through without threads.
#[derive(Debug)]
pub struct TickingClock {
    now_ms: Cell<u64>,
    step_ms: u64,
}

impl TickingClock {
    #[must_use]
    pub const fn new(step_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(0),
            step_ms,
        }
    }
}

impl Clock for TickingClock {
    fn now_ms(&self) -> u64 {
        let now = self.now_ms.get();
        self.now_ms.set(now + self.step_ms);
        now
    }
}
