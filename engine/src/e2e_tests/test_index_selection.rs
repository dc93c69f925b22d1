//! Index selection must never change what a pattern matches.
//!
//! For every mix of fixed, bound and free positions, matching through the
//! selected access path and joining with the input gives the same solutions
//! as a naive nested loop over a full scan.

use std::borrow::Cow;
use std::collections::HashSet;
use std::convert::Infallible;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::iri;
use crate::query::matcher::{lookup_tuples, lookups, select_access_path};
use crate::query::{
    AccessPath, EvaluationContext, Multiset, PatternItem, Position, Solution, TripleIndexType,
    TriplePattern,
};
use crate::store::{MemoryStore, TripleStore};
use crate::testing::init_tracing;
use crate::types::{Term, Triple};

/// Every candidate the access path fetches, across all of its lookups.
fn candidates(
    store: &MemoryStore,
    pattern: &TriplePattern,
    path: &AccessPath,
    input: &Multiset,
) -> HashSet<Triple> {
    let tuples = lookup_tuples(path, input, || Ok::<(), Infallible>(())).unwrap();
    lookups(store, pattern, path, tuples)
        .flatten()
        .map(Cow::into_owned)
        .collect()
}

const SUBJECTS: usize = 5;
const PREDICATES: usize = 3;
const OBJECTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Fixed,
    Bound,
    Free,
}

impl Kind {
    const ALL: [Self; 3] = [Self::Fixed, Self::Bound, Self::Free];
}

fn random_term(rng: &mut StdRng, position: Position) -> Term {
    match position {
        Position::Subject => iri(&format!("s{}", rng.random_range(0..SUBJECTS))),
        Position::Predicate => iri(&format!("p{}", rng.random_range(0..PREDICATES))),
        Position::Object => iri(&format!("o{}", rng.random_range(0..OBJECTS))),
    }
}

fn random_store(rng: &mut StdRng) -> MemoryStore {
    let count = rng.random_range(10..40);
    (0..count)
        .map(|_| {
            Triple::new(
                random_term(rng, Position::Subject),
                random_term(rng, Position::Predicate),
                random_term(rng, Position::Object),
            )
        })
        .collect()
}

const fn slot_name(position: Position) -> &'static str {
    match position {
        Position::Subject => "s",
        Position::Predicate => "p",
        Position::Object => "o",
    }
}

/// Build a pattern and a matching input for one combination of kinds.
fn random_case(rng: &mut StdRng, kinds: [Kind; 3]) -> (TriplePattern, Multiset) {
    let [subject, predicate, object] = Position::ALL.map(|position| {
        match kinds[position as usize] {
            Kind::Fixed => PatternItem::fixed(random_term(rng, position)),
            Kind::Bound | Kind::Free => PatternItem::var(slot_name(position)),
        }
    });
    let pattern = TriplePattern::new(subject, predicate, object);

    let bound: Vec<Position> = Position::ALL
        .into_iter()
        .filter(|p| kinds[*p as usize] == Kind::Bound)
        .collect();
    if bound.is_empty() {
        return (pattern, Multiset::identity());
    }
    let rows = rng.random_range(1..5);
    let input = (0..rows)
        .map(|_| {
            let mut row = Solution::new().with("extra", Term::integer(rng.random_range(0..3)));
            for position in &bound {
                row.bind(slot_name(*position), random_term(rng, *position));
            }
            row
        })
        .collect();
    (pattern, input)
}

fn naive(store: &MemoryStore, pattern: &TriplePattern, input: &Multiset) -> Vec<Solution> {
    let mut out = Vec::new();
    for row in input {
        for triple in store.triples() {
            let fixed_ok = Position::ALL.into_iter().all(|p| {
                pattern
                    .item(p)
                    .fixed_term()
                    .is_none_or(|term| term == p.of(triple))
            });
            if !fixed_ok {
                continue;
            }
            let result = pattern.create_result(triple);
            if row.is_compatible(&result) {
                out.push(row.merge(&result));
            }
        }
    }
    out.sort();
    out
}

fn evaluated(store: &MemoryStore, pattern: &TriplePattern, input: &Multiset) -> Vec<Solution> {
    let mut context =
        EvaluationContext::new(store, QueryOptions::default()).with_input(input.clone());
    context.start_execution(0);
    context.evaluate_triple_pattern(pattern).unwrap();
    let matched = context.take_output();
    let mut out = input
        .join(&matched, || context.check_timeout())
        .unwrap()
        .into_solutions();
    out.sort();
    out
}

#[test]
fn test_every_combination_matches_the_naive_scan() {
    init_tracing();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let store = random_store(&mut rng);
        for subject in Kind::ALL {
            for predicate in Kind::ALL {
                for object in Kind::ALL {
                    let kinds = [subject, predicate, object];
                    let (pattern, input) = random_case(&mut rng, kinds);
                    assert_eq!(
                        evaluated(&store, &pattern, &input),
                        naive(&store, &pattern, &input),
                        "seed {seed}, kinds {kinds:?}, pattern {pattern}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_unbound_candidates_equal_the_filtered_scan() {
    let mut rng = StdRng::seed_from_u64(7);
    let store = random_store(&mut rng);
    for code in 0..8usize {
        let kinds = [code & 1, code & 2, code & 4].map(|bit| {
            if bit == 0 { Kind::Free } else { Kind::Fixed }
        });
        let (pattern, input) = random_case(&mut rng, kinds);
        let path = select_access_path(&pattern, &input);
        let candidates = candidates(&store, &pattern, &path, &input);
        let expected: HashSet<Triple> = store
            .triples()
            .filter(|t| {
                Position::ALL.into_iter().all(|p| {
                    pattern
                        .item(p)
                        .fixed_term()
                        .is_none_or(|term| term == p.of(t))
                })
            })
            .cloned()
            .collect();
        assert_eq!(candidates, expected, "pattern {pattern}");
    }
}

#[test]
fn test_each_classification_picks_its_index() {
    let store = MemoryStore::new();
    let f = |name: &str| PatternItem::fixed(iri(name));
    let v = PatternItem::var;
    let cases = [
        (TriplePattern::new(f("s"), v("p"), v("o")), TripleIndexType::Subject),
        (TriplePattern::new(f("s"), f("p"), v("o")), TripleIndexType::SubjectPredicate),
        (TriplePattern::new(f("s"), v("p"), f("o")), TripleIndexType::SubjectObject),
        (TriplePattern::new(v("s"), f("p"), v("o")), TripleIndexType::Predicate),
        (TriplePattern::new(v("s"), f("p"), f("o")), TripleIndexType::PredicateObject),
        (TriplePattern::new(v("s"), v("p"), f("o")), TripleIndexType::Object),
        (TriplePattern::new(v("s"), v("p"), v("o")), TripleIndexType::None),
    ];
    for (pattern, index) in cases {
        assert_eq!(
            select_access_path(&pattern, &Multiset::identity()),
            AccessPath::Scan(index)
        );
        // Nothing in the store, nothing out.
        assert!(
            candidates(&store, &pattern, &AccessPath::Scan(index), &Multiset::identity()).is_empty()
        );
    }
    let all_fixed = TriplePattern::new(f("s"), f("p"), f("o"));
    assert_eq!(
        select_access_path(&all_fixed, &Multiset::identity()),
        AccessPath::Contains
    );
}
