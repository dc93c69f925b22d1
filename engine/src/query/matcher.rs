//! Triple pattern matching and access-path selection.
//!
//! A pattern's positions are either fixed (a term in the pattern), bound (a
//! variable or blank slot bound in every input solution) or free. Fixed and
//! bound positions together are the "known" positions, and the access path
//! is chosen from them:
//!
//! | known positions            | access path                                   |
//! |----------------------------|-----------------------------------------------|
//! | all three fixed            | one containment test                          |
//! | fixed only                 | the index over the fixed positions, or a scan |
//! | one or two, some bound     | that index, once per distinct bound tuple     |
//! | all three, some bound      | build each triple and test containment        |
//!
//! A slot counts as bound only if every input solution binds it. If any row
//! leaves it open, narrowing by the other rows' values would lose matches
//! for that row.

use std::borrow::Cow;

use super::context::EvaluationContext;
use super::error::QueryError;
use super::multiset::Multiset;
use super::pattern::MatchScope;
use super::triple_pattern::{Position, TripleIndexType, TriplePattern};
use crate::store::{TripleIter, TripleStore};
use crate::types::{Term, Triple};

/// How candidate triples for a pattern are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// Fully fixed pattern: a single containment test.
    Contains,
    /// Use the index over the fixed positions. `TripleIndexType::None` is a
    /// full scan.
    Scan(TripleIndexType),
    /// Use the index over the known positions once per distinct tuple of
    /// bound values.
    BoundLookup {
        index: TripleIndexType,
        bound: Vec<(Position, String)>,
    },
    /// Every position is known: build each candidate and test containment.
    ConstructAndVerify { bound: Vec<(Position, String)> },
}

/// Pick the cheapest access path for a pattern given the input solutions.
#[must_use]
pub fn select_access_path(pattern: &TriplePattern, input: &Multiset) -> AccessPath {
    if pattern.has_no_variables() {
        return AccessPath::Contains;
    }
    let bound: Vec<(Position, String)> = Position::ALL
        .into_iter()
        .filter_map(|position| {
            let name = pattern.item(position).binding_variable()?;
            input
                .is_bound_everywhere(name)
                .then(|| (position, name.to_owned()))
        })
        .collect();
    if bound.is_empty() {
        return AccessPath::Scan(pattern.index_type());
    }

    let known = |position: Position| {
        pattern.item(position).is_fixed() || bound.iter().any(|(p, _)| *p == position)
    };
    let index = TripleIndexType::from_known(
        known(Position::Subject),
        known(Position::Predicate),
        known(Position::Object),
    );
    if index == TripleIndexType::NoVariables {
        AccessPath::ConstructAndVerify { bound }
    } else {
        AccessPath::BoundLookup { index, bound }
    }
}

/// Key terms for a lookup, one per position.
type Key = [Option<Term>; 3];

fn fixed_key(pattern: &TriplePattern) -> Key {
    Position::ALL.map(|position| pattern.item(position).fixed_term().cloned())
}

fn fill_key(template: &Key, bound: &[(Position, String)], values: Vec<Term>) -> Key {
    let mut key = template.clone();
    for ((position, _), value) in bound.iter().zip(values) {
        key[*position as usize] = Some(value);
    }
    key
}

/// Fetch the triples matching the known positions of a key from the
/// narrowest index available.
fn lookup<'a>(store: &'a dyn TripleStore, key: &Key) -> TripleIter<'a> {
    match key {
        [None, None, None] => store.triples(),
        [Some(s), None, None] => store.triples_with_subject(s),
        [None, Some(p), None] => store.triples_with_predicate(p),
        [None, None, Some(o)] => store.triples_with_object(o),
        [Some(s), Some(p), None] => store.triples_with_subject_predicate(s, p),
        [Some(s), None, Some(o)] => store.triples_with_subject_object(s, o),
        [None, Some(p), Some(o)] => store.triples_with_predicate_object(p, o),
        [Some(s), Some(p), Some(o)] => {
            let triple = Triple::new(s.clone(), p.clone(), o.clone());
            if store.contains_triple(&triple) {
                Box::new(store.triples_with_subject_predicate(s, p).filter(move |t| **t == triple))
            } else {
                Box::new(std::iter::empty())
            }
        }
    }
}

fn verify<'a>(store: &'a dyn TripleStore, key: Key) -> Option<Cow<'a, Triple>> {
    let [Some(s), Some(p), Some(o)] = key else {
        return None;
    };
    let triple = Triple::new(s, p, o);
    store.contains_triple(&triple).then_some(Cow::Owned(triple))
}

/// Candidate triples from one lookup.
pub type Candidates<'a> = Box<dyn Iterator<Item = Cow<'a, Triple>> + 'a>;

impl AccessPath {
    /// The positions filled from input bindings, with their slot names.
    #[must_use]
    pub fn bound(&self) -> &[(Position, String)] {
        match self {
            Self::Contains | Self::Scan(_) => &[],
            Self::BoundLookup { bound, .. } | Self::ConstructAndVerify { bound } => bound,
        }
    }
}

/// The tuples of bound values `path` looks up, one per lookup.
///
/// Paths without bound positions perform a single lookup with an empty
/// tuple. `checkpoint` runs once per input solution.
pub fn lookup_tuples<E>(
    path: &AccessPath,
    input: &Multiset,
    checkpoint: impl FnMut() -> Result<(), E>,
) -> Result<Vec<Vec<Term>>, E> {
    let bound = path.bound();
    if bound.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    let names: Vec<&str> = bound.iter().map(|(_, name)| name.as_str()).collect();
    input.distinct_tuples(&names, checkpoint)
}

/// One lazy candidate stream per lookup tuple.
///
/// Candidates satisfy the pattern's fixed positions and agree with their
/// tuple on the bound positions. They still need to pass
/// [`TriplePattern::accepts`].
pub fn lookups<'a>(
    store: &'a dyn TripleStore,
    pattern: &TriplePattern,
    path: &AccessPath,
    tuples: Vec<Vec<Term>>,
) -> Box<dyn Iterator<Item = Candidates<'a>> + 'a> {
    let template = fixed_key(pattern);
    let bound = path.bound().to_vec();
    let verify_only = matches!(
        path,
        AccessPath::Contains | AccessPath::ConstructAndVerify { .. }
    );
    Box::new(tuples.into_iter().map(move |values| -> Candidates<'a> {
        let key = fill_key(&template, &bound, values);
        if verify_only {
            Box::new(verify(store, key).into_iter())
        } else {
            Box::new(lookup(store, &key).map(Cow::Borrowed))
        }
    }))
}

/// Match a pattern against the context's dataset and input.
///
/// Returns only the solutions produced by the pattern itself; joining them
/// with the input is the caller's job.
pub fn match_pattern(
    context: &EvaluationContext<'_>,
    pattern: &TriplePattern,
) -> Result<Multiset, QueryError> {
    let input = context.input();
    let path = select_access_path(pattern, input);
    tracing::debug!(%pattern, ?path, "selected access path");
    let tuples = lookup_tuples(&path, input, || context.check_timeout())?;

    if path == AccessPath::Contains {
        let found = lookups(context.dataset(), pattern, &path, tuples)
            .flatten()
            .next()
            .is_some();
        return Ok(if found {
            Multiset::identity()
        } else {
            Multiset::null()
        });
    }

    let scope = MatchScope::for_pattern(pattern, input, context.options().rigorous_evaluation);
    let mut output = Multiset::new();
    for candidates in lookups(context.dataset(), pattern, &path, tuples) {
        context.check_timeout()?;
        for candidate in candidates {
            context.check_timeout()?;
            if pattern.accepts(&scope, &candidate) {
                output.add(pattern.create_result(&candidate));
            }
        }
    }
    tracing::debug!(%pattern, solutions = output.len(), "matched triple pattern");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::query::{PatternItem, Solution};
    use crate::testing::{iri, store_of, triple};

    fn candidates(
        store: &dyn TripleStore,
        pattern: &TriplePattern,
        path: &AccessPath,
        input: &Multiset,
    ) -> Vec<Triple> {
        let tuples = lookup_tuples(path, input, || Ok::<(), Infallible>(())).unwrap();
        lookups(store, pattern, path, tuples)
            .flatten()
            .map(Cow::into_owned)
            .collect()
    }

    fn var(name: &str) -> PatternItem {
        PatternItem::var(name)
    }

    fn bound(pairs: &[(&str, &str)]) -> Multiset {
        pairs
            .iter()
            .map(|(name, value)| Solution::new().with(*name, iri(value)))
            .collect()
    }

    #[test]
    fn test_path_without_bindings_uses_fixed_index() {
        let pattern = TriplePattern::new(iri("a"), var("p"), var("o"));
        assert_eq!(
            select_access_path(&pattern, &Multiset::identity()),
            AccessPath::Scan(TripleIndexType::Subject)
        );
        let pattern = TriplePattern::new(var("s"), var("p"), var("o"));
        assert_eq!(
            select_access_path(&pattern, &Multiset::identity()),
            AccessPath::Scan(TripleIndexType::None)
        );
    }

    #[test]
    fn test_one_bound_position_adds_an_index_key() {
        let pattern = TriplePattern::new(var("s"), iri("p"), var("o"));
        let path = select_access_path(&pattern, &bound(&[("s", "a"), ("s", "b")]));
        assert_eq!(
            path,
            AccessPath::BoundLookup {
                index: TripleIndexType::SubjectPredicate,
                bound: vec![(Position::Subject, "s".to_owned())],
            }
        );
    }

    #[test]
    fn test_fully_known_pattern_constructs_and_verifies() {
        let pattern = TriplePattern::new(var("s"), iri("p"), var("o"));
        let input: Multiset = vec![
            Solution::new().with("s", iri("a")).with("o", iri("b")),
        ]
        .into();
        assert!(matches!(
            select_access_path(&pattern, &input),
            AccessPath::ConstructAndVerify { .. }
        ));
    }

    #[test]
    fn test_partially_bound_slot_is_not_used() {
        let mut open = Solution::new();
        open.add("s", None);
        let input: Multiset = vec![Solution::new().with("s", iri("a")), open].into();
        let pattern = TriplePattern::new(var("s"), iri("p"), var("o"));
        assert_eq!(
            select_access_path(&pattern, &input),
            AccessPath::Scan(TripleIndexType::Predicate)
        );
    }

    #[test]
    fn test_bound_lookup_fetches_each_distinct_value_once() {
        let store = store_of(&[("a", "p", "x"), ("b", "p", "y"), ("c", "p", "z")]);
        let pattern = TriplePattern::new(var("s"), iri("p"), var("o"));
        let input = bound(&[("s", "a"), ("s", "b"), ("s", "a")]);
        let path = select_access_path(&pattern, &input);
        let found = candidates(&store, &pattern, &path, &input);
        assert_eq!(found, vec![triple("a", "p", "x"), triple("b", "p", "y")]);
    }

    #[test]
    fn test_construct_and_verify_skips_missing_triples() {
        let store = store_of(&[("a", "p", "b")]);
        let pattern = TriplePattern::new(var("s"), iri("p"), var("o"));
        let input: Multiset = vec![
            Solution::new().with("s", iri("a")).with("o", iri("b")),
            Solution::new().with("s", iri("a")).with("o", iri("c")),
        ]
        .into();
        let path = select_access_path(&pattern, &input);
        let found = candidates(&store, &pattern, &path, &input);
        assert_eq!(found, vec![triple("a", "p", "b")]);
    }
}
