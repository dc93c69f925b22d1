//! Patterns over quoted triples.

use crate::e2e_tests::helpers::{bgp, fixed, iri, run, var};
use crate::query::TriplePattern;
use crate::store::MemoryStore;
use crate::types::{Term, Triple};

fn quoted_store() -> MemoryStore {
    let quoted = Term::triple(Triple::new(iri("a"), iri("b"), iri("c")));
    [
        Triple::new(iri("s"), iri("p"), quoted),
        Triple::new(iri("s"), iri("p"), iri("plain")),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_fully_fixed_nested_pattern_matches_without_bindings() {
    let pattern = TriplePattern::new(
        fixed("s"),
        fixed("p"),
        TriplePattern::new(fixed("a"), fixed("b"), fixed("c")),
    );
    let result = run(&quoted_store(), bgp(vec![pattern]));
    assert_eq!(result.len(), 1);
    assert!(result.solutions.solutions()[0].is_empty());
}

#[test]
fn test_nested_variable_binds_the_component() {
    let pattern = TriplePattern::new(
        fixed("s"),
        fixed("p"),
        TriplePattern::new(var("x"), fixed("b"), fixed("c")),
    );
    let result = run(&quoted_store(), bgp(vec![pattern]));
    assert_eq!(result.len(), 1);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.len(), 1);
    assert_eq!(row.get("x"), Some(&iri("a")));
}

#[test]
fn test_nested_pattern_rejects_other_triples_and_plain_terms() {
    let pattern = TriplePattern::new(
        fixed("s"),
        fixed("p"),
        TriplePattern::new(fixed("a"), fixed("b"), fixed("d")),
    );
    assert!(run(&quoted_store(), bgp(vec![pattern])).is_empty());
}

#[test]
fn test_nested_variables_join_with_outer_patterns() {
    let mut store = quoted_store();
    store.insert(Triple::new(iri("a"), iri("label"), iri("alpha")));
    let algebra = bgp(vec![
        TriplePattern::new(
            var("who"),
            fixed("p"),
            TriplePattern::new(var("x"), var("y"), fixed("c")),
        ),
        TriplePattern::new(var("x"), fixed("label"), var("label")),
    ]);
    let result = run(&store, algebra);
    assert_eq!(result.len(), 1);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.get("who"), Some(&iri("s")));
    assert_eq!(row.get("y"), Some(&iri("b")));
    assert_eq!(row.get("label"), Some(&iri("alpha")));
}
