//! Aggregates treat failing inputs as absent values.

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{bgp, fixed, iri, run, var};
use crate::expression::Expression;
use crate::query::{
    Accumulator, Aggregate, CountAccumulator, EvaluationContext, Solution, TriplePattern,
};
use crate::store::MemoryStore;
use crate::types::{Term, Triple};

fn ten_over_x() -> Expression {
    Expression::divide(Expression::constant(Term::integer(10)), Expression::var("x"))
}

#[test]
fn test_count_feeds_failures_as_no_value() {
    let store = MemoryStore::new();
    let context = EvaluationContext::new(&store, QueryOptions::default());
    let mut count = CountAccumulator::new(ten_over_x());

    for x in [2, 0, 5] {
        count.accumulate(&Solution::new().with("x", Term::integer(x)), &context);
    }
    assert_eq!(count.fed(), 3);
    assert_eq!(count.counted(), 2);
    assert_eq!(count.accumulated_result(), Some(Term::integer(2)));
}

#[test]
fn test_group_by_survives_division_by_zero() {
    let store: MemoryStore = [2, 0, 5]
        .into_iter()
        .enumerate()
        .map(|(i, x)| Triple::new(iri(&format!("item{i}")), iri("value"), Term::integer(x)))
        .collect();
    let algebra = bgp(vec![TriplePattern::new(var("item"), fixed("value"), var("x"))])
        .group_by(
            &[],
            vec![
                ("n".to_owned(), Aggregate::count(ten_over_x())),
                ("total".to_owned(), Aggregate::sum(ten_over_x())),
                ("all".to_owned(), Aggregate::count_all()),
            ],
        );
    let result = run(&store, algebra);
    assert_eq!(result.len(), 1);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.get("n"), Some(&Term::integer(2)));
    assert_eq!(row.get("total"), Some(&Term::double(7.0)));
    assert_eq!(row.get("all"), Some(&Term::integer(3)));
}

#[test]
fn test_identical_aggregates_share_an_accumulator() {
    let store: MemoryStore = [1, 2, 2]
        .into_iter()
        .enumerate()
        .map(|(i, x)| Triple::new(iri(&format!("item{i}")), iri("value"), Term::integer(x)))
        .collect();
    let distinct = Aggregate::count(Expression::var("x")).distinct();
    let algebra = bgp(vec![TriplePattern::new(var("item"), fixed("value"), var("x"))])
        .group_by(
            &[],
            vec![
                ("a".to_owned(), distinct.clone()),
                ("b".to_owned(), distinct),
            ],
        );
    let result = run(&store, algebra);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.get("a"), Some(&Term::integer(2)));
    assert_eq!(row.get("a"), row.get("b"));
}
