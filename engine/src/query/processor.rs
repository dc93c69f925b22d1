//! The top-level query processor.
//!
//! # Life of a query
//!
//! 1. [`QueryProcessor::execute`] builds a fresh [`EvaluationContext`] over
//!    the store, attaching the function catalog, the optional algebra
//!    processor and the clock.
//! 2. `start_execution` fixes the effective timeout from the processor's
//!    ceiling and the query's own request, and starts the timer.
//! 3. The algebra tree is evaluated top-down through the context.
//! 4. The timer is stopped, temporary variables are trimmed, and the
//!    solutions are returned with the elapsed time.
//!
//! The context is dropped at the end of `execute`, taking its side-channel
//! state with it, so no two queries ever share function state.

use std::collections::HashSet;

use super::algebra::{Algebra, AlgebraProcessor};
use super::context::EvaluationContext;
use super::error::QueryError;
use super::multiset::Multiset;
use super::pattern::ConstructContext;
use super::triple_pattern::TriplePattern;
use crate::config::QueryOptions;
use crate::expression::FunctionRegistry;
use crate::store::TripleStore;
use crate::time::Clock;
use crate::types::Triple;

/// A query: an algebra tree plus its own timeout request.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::disallowed_methods)] // Clone needed so queries can be re-run
pub struct Query {
    pub algebra: Algebra,
    /// Zero or less means "no preference"; the processor ceiling applies.
    pub timeout_ms: i64,
}

impl Query {
    #[must_use]
    pub const fn new(algebra: Algebra) -> Self {
        Self {
            algebra,
            timeout_ms: 0,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl From<Algebra> for Query {
    fn from(algebra: Algebra) -> Self {
        Self::new(algebra)
    }
}

/// The outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::disallowed_methods)] // Clone needed by callers that cache results
pub struct QueryResult {
    /// Variables visible in the results, in first-mention order.
    pub variables: Vec<String>,
    pub solutions: Multiset,
    pub elapsed_ms: u64,
}

impl QueryResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

/// Runs queries against a triple store.
pub struct QueryProcessor<'a> {
    store: &'a dyn TripleStore,
    options: QueryOptions,
    functions: FunctionRegistry,
    processor: Option<&'a dyn AlgebraProcessor>,
    clock: Option<&'a dyn Clock>,
}

impl<'a> QueryProcessor<'a> {
    /// A processor with the built-in function catalog.
    #[must_use]
    pub fn new(store: &'a dyn TripleStore, options: QueryOptions) -> Self {
        Self {
            store,
            options,
            functions: FunctionRegistry::with_builtins(),
            processor: None,
            clock: None,
        }
    }

    #[must_use]
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    #[must_use]
    pub fn with_algebra_processor(mut self, processor: &'a dyn AlgebraProcessor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Time queries with this clock instead of a fresh monotonic one.
    #[must_use]
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// A fresh context for one query.
    #[must_use]
    pub fn context(&self, query_timeout_ms: i64) -> EvaluationContext<'_> {
        let mut context = EvaluationContext::new(self.store, self.options.clone())
            .with_functions(&self.functions)
            .with_query_timeout(query_timeout_ms);
        if let Some(processor) = self.processor {
            context = context.with_processor(processor);
        }
        if let Some(clock) = self.clock {
            context = context.with_clock(clock);
        }
        context
    }

    /// Run a query to completion.
    pub fn execute(&self, query: &Query) -> Result<QueryResult, QueryError> {
        let mut context = self.context(query.timeout_ms);
        context.start_execution(self.options.timeout_ms);
        tracing::info!(timeout_ms = context.timeout_ms(), "starting query");

        let result = context.evaluate(&query.algebra);
        context.end_execution();
        let elapsed_ms = context.elapsed_ms();

        let mut solutions = match result {
            Ok(solutions) => solutions,
            Err(e) => {
                tracing::warn!(error = %e, timeout = e.is_timeout(), elapsed_ms, "query failed");
                return Err(e);
            }
        };
        if self.options.trim_temporary_variables {
            solutions.trim_temporary_variables();
        }
        tracing::info!(solutions = solutions.len(), elapsed_ms, "query finished");

        Ok(QueryResult {
            variables: query.algebra.variables(),
            solutions,
            elapsed_ms,
        })
    }

    /// Materialise a CONSTRUCT template once per solution.
    ///
    /// Duplicate triples are dropped, first occurrence kept. An unbound
    /// template variable fails the whole construction.
    pub fn construct(
        &self,
        template: &[TriplePattern],
        solutions: &Multiset,
    ) -> Result<Vec<Triple>, QueryError> {
        let mut seen = HashSet::new();
        let mut triples = Vec::new();
        for (scope, solution) in solutions.iter().enumerate() {
            let mut context = ConstructContext::new(solution, scope);
            for pattern in template {
                let triple = pattern.construct(&mut context)?;
                if seen.insert(triple.clone()) {
                    triples.push(triple);
                }
            }
        }
        Ok(triples)
    }
}

impl std::fmt::Debug for QueryProcessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("options", &self.options)
            .field("functions", &self.functions)
            .field("has_processor", &self.processor.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PatternItem, Solution};
    use crate::testing::{SimulatedClock, iri, store_of, triple};

    #[test]
    fn test_execute_reports_variables_and_solutions() {
        let store = store_of(&[("a", "p", "b"), ("c", "p", "d")]);
        let processor = QueryProcessor::new(&store, QueryOptions::default());
        let query = Query::new(Algebra::bgp(vec![TriplePattern::new(
            PatternItem::var("s"),
            iri("p"),
            PatternItem::var("o"),
        )]));
        let result = processor.execute(&query).unwrap();
        assert_eq!(result.variables, vec!["s", "o"]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_execute_trims_temporary_variables() {
        let store = store_of(&[("a", "p", "b")]);
        let options = QueryOptions::default().with_trim_temporary_variables(true);
        let processor = QueryProcessor::new(&store, options);
        let query = Query::new(Algebra::bgp(vec![TriplePattern::new(
            PatternItem::blank("x"),
            iri("p"),
            PatternItem::var("o"),
        )]));
        let result = processor.execute(&query).unwrap();
        assert_eq!(result.len(), 1);
        let row = &result.solutions.solutions()[0];
        assert!(!row.contains_variable("_:x"));
        assert!(row.is_bound("o"));
    }

    #[test]
    fn test_execute_measures_with_injected_clock() {
        let store = store_of(&[("a", "p", "b")]);
        let clock = SimulatedClock::new(0);
        let processor = QueryProcessor::new(&store, QueryOptions::default()).with_clock(&clock);
        let result = processor
            .execute(&Query::new(Algebra::empty_bgp()))
            .unwrap();
        assert_eq!(result.elapsed_ms, 0);
        assert!(result.solutions.is_identity());
    }

    #[test]
    fn test_construct() {
        let store = store_of(&[]);
        let processor = QueryProcessor::new(&store, QueryOptions::default());
        let template = vec![TriplePattern::new(
            PatternItem::var("s"),
            iri("p"),
            PatternItem::var("o"),
        )];
        let solutions: Multiset = vec![
            Solution::new().with("s", iri("a")).with("o", iri("b")),
            Solution::new().with("s", iri("a")).with("o", iri("b")),
        ]
        .into();
        assert_eq!(
            processor.construct(&template, &solutions),
            Ok(vec![triple("a", "p", "b")])
        );

        let partial: Multiset = vec![Solution::new().with("s", iri("a"))].into();
        assert_eq!(
            processor.construct(&template, &partial),
            Err(QueryError::UnboundVariable("o".to_owned()))
        );
    }
}
