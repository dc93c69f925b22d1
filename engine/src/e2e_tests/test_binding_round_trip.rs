//! Values bound earlier in a query constrain later matches.

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{bgp, fixed, iri, run_with, var};
use crate::expression::Expression;
use crate::query::{Algebra, EvaluationContext, Multiset, Solution, TriplePattern};
use crate::store::MemoryStore;
use crate::types::{Term, Triple};

fn numbered_store() -> MemoryStore {
    [
        Triple::new(iri("a"), iri("p"), Term::integer(1)),
        Triple::new(iri("a"), iri("p"), Term::integer(2)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_bound_object_only_matches_its_value() {
    let store = numbered_store();
    let input: Multiset = vec![Solution::new().with("o", Term::integer(1))].into();
    let options = QueryOptions::default().with_rigorous_evaluation(true);
    let mut context = EvaluationContext::new(&store, options).with_input(input);
    context.start_execution(0);

    let pattern = TriplePattern::new(fixed("a"), fixed("p"), var("o"));
    context.evaluate_triple_pattern(&pattern).unwrap();
    let output = context.take_output();
    assert_eq!(output.len(), 1);
    assert_eq!(output.solutions()[0].get("o"), Some(&Term::integer(1)));
}

#[test]
fn test_rigorous_check_applies_inside_nested_patterns() {
    // Nested slots never narrow the index lookup, so only acceptance can
    // enforce the bound value here.
    let quoted = |n: i64| Term::triple(Triple::new(iri("a"), iri("p"), Term::integer(n)));
    let store: MemoryStore = [
        Triple::new(iri("a"), iri("says"), quoted(1)),
        Triple::new(iri("a"), iri("says"), quoted(2)),
    ]
    .into_iter()
    .collect();
    let input: Multiset = vec![Solution::new().with("o", Term::integer(1))].into();
    let pattern = TriplePattern::new(
        var("x"),
        fixed("says"),
        TriplePattern::new(fixed("a"), fixed("p"), var("o")),
    );

    let strict = QueryOptions::default().with_rigorous_evaluation(true);
    let mut context = EvaluationContext::new(&store, strict).with_input(input.clone());
    context.start_execution(0);
    context.evaluate_triple_pattern(&pattern).unwrap();
    let output = context.take_output();
    assert_eq!(output.len(), 1);
    assert_eq!(output.solutions()[0].get("o"), Some(&Term::integer(1)));

    // Without rigorous evaluation both candidates come back; the join with
    // the input removes the wrong one later.
    let mut context = EvaluationContext::new(&store, QueryOptions::default()).with_input(input);
    context.start_execution(0);
    context.evaluate_triple_pattern(&pattern).unwrap();
    assert_eq!(context.output().len(), 2);
}

#[test]
fn test_join_seeds_the_second_pattern() {
    let store = numbered_store();
    let seeded = Algebra::empty_bgp().extend("o", Expression::constant(Term::integer(1)));
    let algebra = Algebra::join(
        seeded,
        bgp(vec![TriplePattern::new(var("s"), fixed("p"), var("o"))]),
    );
    let options = QueryOptions::default().with_rigorous_evaluation(true);
    let result = run_with(&store, algebra, options);
    assert_eq!(result.len(), 1);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.get("s"), Some(&iri("a")));
    assert_eq!(row.get("o"), Some(&Term::integer(1)));
}

#[test]
fn test_item_rigour_only_adds_checking() {
    let quoted = |n: i64| Term::triple(Triple::new(iri("a"), iri("p"), Term::integer(n)));
    let store: MemoryStore = [
        Triple::new(iri("a"), iri("says"), quoted(1)),
        Triple::new(iri("a"), iri("says"), quoted(2)),
    ]
    .into_iter()
    .collect();
    let input: Multiset = vec![Solution::new().with("o", Term::integer(1))].into();
    let matches = |options: QueryOptions, rigorous_item: bool| {
        let pattern = TriplePattern::new(
            var("x"),
            fixed("says"),
            TriplePattern::new(fixed("a"), fixed("p"), var("o").rigorous(rigorous_item)),
        );
        let mut context = EvaluationContext::new(&store, options).with_input(input.clone());
        context.start_execution(0);
        context.evaluate_triple_pattern(&pattern).unwrap();
        context.output().len()
    };

    let strict = QueryOptions::default().with_rigorous_evaluation(true);
    assert_eq!(matches(strict, false), 1);
    assert_eq!(matches(QueryOptions::default(), true), 1);
    assert_eq!(matches(QueryOptions::default(), false), 2);
}

#[test]
fn test_rigorous_repeated_slot_filters_without_query_rigour() {
    let store: MemoryStore = [
        Triple::new(iri("a"), iri("p"), iri("a")),
        Triple::new(iri("a"), iri("p"), iri("b")),
    ]
    .into_iter()
    .collect();
    let pattern = TriplePattern::new(var("x").rigorous(true), fixed("p"), var("x"));
    let result = run_with(&store, bgp(vec![pattern]), QueryOptions::default());
    assert_eq!(result.len(), 1);
    assert_eq!(result.solutions.solutions()[0].get("x"), Some(&iri("a")));
}
