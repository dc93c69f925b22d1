//! Execution budgets are measured against an injectable clock.

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{TickingClock, bgp, iri, var};
use crate::query::{
    EvaluationContext, Multiset, Query, QueryError, QueryProcessor, Solution, TriplePattern,
};
use crate::store::MemoryStore;
use crate::testing::SimulatedClock;
use crate::types::{Term, Triple};

#[test]
fn test_remaining_timeout_counts_down_and_pins_at_one() {
    let store = MemoryStore::new();
    let clock = SimulatedClock::new(0);
    let context = EvaluationContext::new(&store, QueryOptions::default()).with_clock(&clock);
    context.start_execution(1000);
    assert_eq!(context.remaining_timeout(), 1000);

    clock.advance(500);
    assert_eq!(context.remaining_timeout(), 500);

    let mut previous = context.remaining_timeout();
    for _ in 0..10 {
        clock.advance(60);
        let remaining = context.remaining_timeout();
        assert!(remaining < previous || remaining == 1);
        assert!(remaining >= 1);
        previous = remaining;
    }

    clock.advance(5000);
    assert_eq!(context.remaining_timeout(), 1);
}

#[test]
fn test_no_timeout_reports_zero() {
    let store = MemoryStore::new();
    let clock = SimulatedClock::new(0);
    let context = EvaluationContext::new(&store, QueryOptions::default()).with_clock(&clock);
    context.start_execution(0);
    for _ in 0..3 {
        clock.advance(400);
        assert_eq!(context.remaining_timeout(), 0);
    }
}

#[test]
fn test_query_timeout_below_ceiling_wins() {
    let store = MemoryStore::new();
    let clock = SimulatedClock::new(0);
    let context = EvaluationContext::new(&store, QueryOptions::default())
        .with_clock(&clock)
        .with_query_timeout(200);
    context.start_execution(1000);
    assert_eq!(context.timeout_ms(), 200);
    clock.advance(150);
    assert_eq!(context.remaining_timeout(), 50);
}

#[test]
fn test_runaway_scan_is_aborted() {
    let store: MemoryStore = (0..500)
        .map(|i| Triple::new(iri(&format!("s{i}")), iri("p"), Term::integer(i)))
        .collect();
    // Every clock read moves time forward by 1ms, so each per-candidate check
    // costs time and a full scan overruns a 50ms budget.
    let clock = TickingClock::new(1);
    let options = QueryOptions::default().with_timeout_ms(50);
    let processor = QueryProcessor::new(&store, options).with_clock(&clock);

    let query = Query::new(bgp(vec![TriplePattern::new(var("s"), var("p"), var("o"))]));
    let error = processor.execute(&query).unwrap_err();
    assert!(error.is_timeout());
    assert!(matches!(error, QueryError::Timeout { timeout_ms: 50, .. }));
}

#[test]
fn test_query_without_budget_runs_to_completion() {
    let store: MemoryStore = (0..500)
        .map(|i| Triple::new(iri(&format!("s{i}")), iri("p"), Term::integer(i)))
        .collect();
    let clock = TickingClock::new(1);
    let options = QueryOptions::default().with_timeout_ms(0);
    let processor = QueryProcessor::new(&store, options).with_clock(&clock);

    let query = Query::new(bgp(vec![TriplePattern::new(var("s"), var("p"), var("o"))]));
    let result = processor.execute(&query).unwrap();
    assert_eq!(result.len(), 500);
}

#[test]
fn test_lookups_without_candidates_still_check_the_budget() {
    // Every subject is bound, but nothing in the store has predicate q, so
    // each lookup comes back empty.
    let store: MemoryStore = [Triple::new(iri("s0"), iri("p"), iri("o"))]
        .into_iter()
        .collect();
    let input: Multiset = (0..500)
        .map(|i| Solution::new().with("s", iri(&format!("s{i}"))))
        .collect();
    let pattern = TriplePattern::new(var("s"), iri("q"), var("o"));

    let mut context = EvaluationContext::new(&store, QueryOptions::default())
        .with_clock(TickingClock::new(1))
        .with_input(input.clone());
    context.start_execution(100);
    let result = context.evaluate_triple_pattern(&pattern);
    assert!(matches!(result, Err(QueryError::Timeout { .. })));

    let mut unlimited = EvaluationContext::new(&store, QueryOptions::default())
        .with_clock(TickingClock::new(1))
        .with_input(input);
    unlimited.start_execution(0);
    unlimited.evaluate_triple_pattern(&pattern).unwrap();
    assert!(unlimited.output().is_empty());
}
