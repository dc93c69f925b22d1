//! A fully fixed pattern is a single containment test.

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{bgp, fixed, run, store_of};
use crate::query::{EvaluationContext, TriplePattern};

#[test]
fn test_present_triple_gives_identity() {
    let store = store_of(&[("a", "b", "c")]);
    let mut context = EvaluationContext::new(&store, QueryOptions::default());
    context.start_execution(0);

    let pattern = TriplePattern::new(fixed("a"), fixed("b"), fixed("c"));
    context.evaluate_triple_pattern(&pattern).unwrap();
    assert!(context.output().is_identity());
    assert_eq!(context.output().len(), 1);
}

#[test]
fn test_absent_triple_gives_null() {
    let store = store_of(&[("a", "b", "c")]);
    let mut context = EvaluationContext::new(&store, QueryOptions::default());
    context.start_execution(0);

    let pattern = TriplePattern::new(fixed("a"), fixed("b"), fixed("d"));
    context.evaluate_triple_pattern(&pattern).unwrap();
    assert!(context.output().is_empty());
}

#[test]
fn test_fixed_pattern_in_a_query() {
    let store = store_of(&[("a", "b", "c")]);
    let hit = run(
        &store,
        bgp(vec![TriplePattern::new(fixed("a"), fixed("b"), fixed("c"))]),
    );
    assert_eq!(hit.len(), 1);
    assert!(hit.solutions.solutions()[0].is_empty());

    let miss = run(
        &store,
        bgp(vec![TriplePattern::new(fixed("a"), fixed("b"), fixed("d"))]),
    );
    assert!(miss.is_empty());
}
