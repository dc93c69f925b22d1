//! Per-query evaluation state.
//!
//! An [`EvaluationContext`] is created for one query execution and thrown
//! away afterwards. It carries:
//! - the dataset being queried
//! - the input multiset operators are seeded with, and the output slot the
//!   matcher writes to
//! - the execution timer and effective timeout
//! - a side channel of per-query state for stateful functions
//! - the optional algebra processor and function catalog
//!
//! # Timeouts
//!
//! Timeouts are cooperative: [`EvaluationContext::check_timeout`] is called at
//! every operator boundary and inside every loop over candidate triples or
//! solutions. A failed check stops the timer; the context must not be used to
//! evaluate anything else afterwards.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::algebra::{Algebra, AlgebraProcessor};
use super::error::QueryError;
use super::matcher;
use super::multiset::Multiset;
use super::triple_pattern::TriplePattern;
use crate::config::QueryOptions;
use crate::expression::{Function, FunctionRegistry};
use crate::store::TripleStore;
use crate::time::{Clock, ExecutionTimer, MonotonicClock};
use crate::types::TermComparer;

/// Pick the effective timeout from the query's own request and the
/// processor-level ceiling. Zero or less means "no limit" on either side.
#[must_use]
pub const fn calculate_timeout(query_timeout_ms: i64, max_timeout_ms: i64) -> i64 {
    if query_timeout_ms > 0 && (max_timeout_ms <= 0 || query_timeout_ms <= max_timeout_ms) {
        query_timeout_ms
    } else {
        max_timeout_ms
    }
}

/// State threaded through the evaluation of one query.
pub struct EvaluationContext<'a> {
    dataset: &'a dyn TripleStore,
    options: QueryOptions,
    comparer: TermComparer,
    functions: Option<&'a FunctionRegistry>,
    processor: Option<&'a dyn AlgebraProcessor>,
    timer: ExecutionTimer<'a>,
    query_timeout_ms: i64,
    timeout_ms: Cell<i64>,
    input: Multiset,
    output: Multiset,
    state: RefCell<HashMap<String, Box<dyn Any>>>,
}

impl<'a> EvaluationContext<'a> {
    /// A context over a dataset, timed by the monotonic clock.
    #[must_use]
    pub fn new(dataset: &'a dyn TripleStore, options: QueryOptions) -> Self {
        Self {
            dataset,
            options,
            comparer: TermComparer,
            functions: None,
            processor: None,
            timer: ExecutionTimer::new(Box::new(MonotonicClock::new())),
            query_timeout_ms: 0,
            timeout_ms: Cell::new(0),
            input: Multiset::identity(),
            output: Multiset::identity(),
            state: RefCell::new(HashMap::new()),
        }
    }

    /// Time the query with a different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.timer = ExecutionTimer::new(Box::new(clock));
        self
    }

    /// The query's own timeout request. Zero or less means none.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout_ms: i64) -> Self {
        self.query_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Route every [`Self::evaluate`] call through a processor.
    #[must_use]
    pub fn with_processor(mut self, processor: &'a dyn AlgebraProcessor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Seed evaluation with an input other than the identity multiset.
    #[must_use]
    pub fn with_input(mut self, input: Multiset) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub const fn dataset(&self) -> &'a dyn TripleStore {
        self.dataset
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    #[must_use]
    pub const fn comparer(&self) -> TermComparer {
        self.comparer
    }

    #[must_use]
    pub const fn trim_temporary_variables(&self) -> bool {
        self.options.trim_temporary_variables
    }

    /// Look up a function in the catalog, if one is attached.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&'a dyn Function> {
        self.functions.and_then(|functions| functions.get(name))
    }

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------

    /// Fix the effective timeout against `max_timeout_ms` and start the timer.
    pub fn start_execution(&self, max_timeout_ms: i64) {
        self.timeout_ms
            .set(calculate_timeout(self.query_timeout_ms, max_timeout_ms));
        self.timer.start();
    }

    /// Stop the timer.
    pub fn end_execution(&self) {
        self.timer.stop();
    }

    /// The effective timeout. Zero or less means none.
    #[must_use]
    pub fn timeout_ms(&self) -> i64 {
        self.timeout_ms.get()
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed_ms()
    }

    /// Fail if a timeout is set and has been exceeded. Stops the timer when
    /// failing.
    pub fn check_timeout(&self) -> Result<(), QueryError> {
        let timeout_ms = self.timeout_ms.get();
        let Ok(limit) = u64::try_from(timeout_ms) else {
            return Ok(());
        };
        if limit == 0 {
            return Ok(());
        }
        let elapsed_ms = self.timer.elapsed_ms();
        if elapsed_ms > limit {
            self.timer.stop();
            tracing::warn!(timeout_ms, elapsed_ms, "query aborted by timeout");
            return Err(QueryError::Timeout {
                timeout_ms,
                elapsed_ms,
            });
        }
        Ok(())
    }

    /// Milliseconds left before the timeout, never less than 1 while a
    /// timeout is set. Zero when there is no timeout.
    #[must_use]
    pub fn remaining_timeout(&self) -> u64 {
        match u64::try_from(self.timeout_ms.get()) {
            Ok(0) | Err(_) => 0,
            Ok(limit) => limit.saturating_sub(self.timer.elapsed_ms()).max(1),
        }
    }

    // ---------------------------------------------------------------------
    // Multisets
    // ---------------------------------------------------------------------

    #[must_use]
    pub const fn input(&self) -> &Multiset {
        &self.input
    }

    pub fn set_input(&mut self, input: Multiset) {
        self.input = input;
    }

    /// Swap in a new input, returning the old one.
    pub fn replace_input(&mut self, input: Multiset) -> Multiset {
        std::mem::replace(&mut self.input, input)
    }

    #[must_use]
    pub const fn output(&self) -> &Multiset {
        &self.output
    }

    /// Take the output, leaving the identity multiset in its place.
    pub fn take_output(&mut self) -> Multiset {
        std::mem::replace(&mut self.output, Multiset::identity())
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Evaluate an algebra node through the processor if one is attached,
    /// otherwise through the node's own evaluation.
    pub fn evaluate(&mut self, algebra: &Algebra) -> Result<Multiset, QueryError> {
        self.check_timeout()?;
        match self.processor {
            Some(processor) => processor.process_algebra(algebra, self),
            None => algebra.evaluate(self),
        }
    }

    /// Evaluate a node against the identity input, restoring the current
    /// input afterwards.
    pub fn evaluate_standalone(&mut self, algebra: &Algebra) -> Result<Multiset, QueryError> {
        let saved = self.replace_input(Multiset::identity());
        let result = self.evaluate(algebra);
        self.input = saved;
        result
    }

    /// Match a triple pattern against the dataset and the current input,
    /// writing the matches to the output slot.
    ///
    /// A fully fixed pattern yields the identity multiset if the triple is
    /// present and the null multiset if not.
    pub fn evaluate_triple_pattern(&mut self, pattern: &TriplePattern) -> Result<(), QueryError> {
        self.check_timeout()?;
        let output = matcher::match_pattern(self, pattern)?;
        self.output = output;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Side channel
    // ---------------------------------------------------------------------

    /// A copy of the state stored under `key`, if present with type `T`.
    #[must_use]
    pub fn state<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.state
            .borrow()
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn set_state<T: Any>(&self, key: impl Into<String>, value: T) {
        self.state.borrow_mut().insert(key.into(), Box::new(value));
    }

    /// Run `f` on the state under `key`, creating it with `T::default()` if
    /// absent or of another type.
    ///
    /// `f` must not touch the side channel itself.
    pub fn update_state<T: Any + Default, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = self.state.borrow_mut();
        let slot = state
            .entry(key.to_owned())
            .or_insert_with(|| Box::new(T::default()));
        if !slot.is::<T>() {
            *slot = Box::new(T::default());
        }
        match slot.downcast_mut::<T>() {
            Some(value) => f(value),
            None => f(&mut T::default()),
        }
    }

    /// Remove the state under `key`. Returns whether anything was stored.
    pub fn remove_state(&self, key: &str) -> bool {
        self.state.borrow_mut().remove(key).is_some()
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("options", &self.options)
            .field("timer", &self.timer)
            .field("timeout_ms", &self.timeout_ms.get())
            .field("input", &self.input.len())
            .field("output", &self.output.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::SimulatedClock;

    #[test]
    fn test_calculate_timeout() {
        // Query value wins when positive and within the ceiling.
        assert_eq!(calculate_timeout(100, 1000), 100);
        // Ceiling wins when the query asks for more.
        assert_eq!(calculate_timeout(5000, 1000), 1000);
        // No ceiling: the query value stands.
        assert_eq!(calculate_timeout(5000, 0), 5000);
        // No query value: the ceiling stands.
        assert_eq!(calculate_timeout(0, 1000), 1000);
        assert_eq!(calculate_timeout(-1, 0), 0);
    }

    #[test]
    fn test_check_timeout_stops_timer() {
        let store = MemoryStore::new();
        let clock = SimulatedClock::new(0);
        let ctx = EvaluationContext::new(&store, QueryOptions::default()).with_clock(&clock);
        ctx.start_execution(100);

        clock.advance(100);
        assert_eq!(ctx.check_timeout(), Ok(()));

        clock.advance(1);
        assert_eq!(
            ctx.check_timeout(),
            Err(QueryError::Timeout {
                timeout_ms: 100,
                elapsed_ms: 101
            })
        );
        clock.advance(50);
        assert_eq!(ctx.elapsed_ms(), 101);
    }

    #[test]
    fn test_no_timeout_never_fails() {
        let store = MemoryStore::new();
        let clock = SimulatedClock::new(0);
        let ctx = EvaluationContext::new(&store, QueryOptions::default()).with_clock(&clock);
        ctx.start_execution(0);
        clock.advance(1_000_000);
        assert_eq!(ctx.check_timeout(), Ok(()));
        assert_eq!(ctx.remaining_timeout(), 0);
    }

    #[test]
    fn test_side_channel() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        assert_eq!(ctx.state::<u32>("missing"), None);

        ctx.set_state("flag", true);
        assert_eq!(ctx.state::<bool>("flag"), Some(true));
        // Wrong type reads as absent.
        assert_eq!(ctx.state::<u32>("flag"), None);

        let n = ctx.update_state("counter", |n: &mut u32| {
            *n += 1;
            *n
        });
        assert_eq!(n, 1);
        assert_eq!(ctx.state::<u32>("counter"), Some(1));

        assert!(ctx.remove_state("counter"));
        assert!(!ctx.remove_state("counter"));
    }

    #[test]
    fn test_evaluate_standalone_restores_input() {
        let store = MemoryStore::new();
        let seeded = Multiset::from(vec![
            crate::query::Solution::new().with("x", crate::types::Term::integer(1)),
        ]);
        let mut ctx =
            EvaluationContext::new(&store, QueryOptions::default()).with_input(seeded.clone());
        ctx.start_execution(0);
        let result = ctx.evaluate_standalone(&Algebra::empty_bgp()).unwrap();
        assert!(result.is_identity());
        assert_eq!(ctx.input(), &seeded);
    }
}
