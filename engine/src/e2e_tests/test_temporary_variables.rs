//! Blank-node placeholders bind scratch slots that never reach the caller.

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{bgp, fixed, iri, run, run_with, store_of, var};
use crate::query::{PatternItem, Solution, TriplePattern};
use crate::types::Term;

fn knows_names() -> Vec<TriplePattern> {
    vec![
        TriplePattern::new(var("person"), fixed("knows"), PatternItem::blank("friend")),
        TriplePattern::new(PatternItem::blank("friend"), fixed("name"), var("name")),
    ]
}

#[test]
fn test_placeholder_joins_but_is_trimmed() {
    let store = store_of(&[
        ("alice", "knows", "bob"),
        ("bob", "name", "bobby"),
        ("carol", "knows", "dave"),
    ]);
    let result = run(&store, bgp(knows_names()));
    assert_eq!(result.len(), 1);
    let row = &result.solutions.solutions()[0];
    assert_eq!(row.get("person"), Some(&iri("alice")));
    assert_eq!(row.get("name"), Some(&iri("bobby")));
    assert!(!row.contains_variable("_:friend"));
    assert_eq!(result.variables, vec!["person", "name"]);
}

#[test]
fn test_trimming_can_be_disabled() {
    let store = store_of(&[("alice", "knows", "bob"), ("bob", "name", "bobby")]);
    let options = QueryOptions::default().with_trim_temporary_variables(false);
    let result = run_with(&store, bgp(knows_names()), options);
    assert_eq!(result.len(), 1);
    assert_eq!(
        result.solutions.solutions()[0].get("_:friend"),
        Some(&iri("bob"))
    );
}

#[test]
fn test_trimming_keeps_ordinary_bindings() {
    let mut solution = Solution::new()
        .with("x", Term::integer(1))
        .with("_:b", Term::integer(2));
    solution.add("unbound", None);
    solution.trim_temporary_variables();
    assert!(solution.is_bound("x"));
    assert!(solution.contains_variable("unbound"));
    assert!(!solution.contains_variable("_:b"));
}
