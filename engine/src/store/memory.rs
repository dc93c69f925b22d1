//! Indexed in-memory triple store.
//!
//! Triples live in a slot vector and indexes hold slot ids. Removing a triple
//! empties its slot, drops its id from every index (pruning empty entries) and
//! puts the slot on a free list for the next insert.
//!
//! # Indexes
//!
//! - `subject`, `predicate`, `object` -> slot ids
//! - `(subject, predicate)`, `(subject, object)`, `(predicate, object)` -> slot ids
//! - exact triple -> slot id (containment and idempotent insert)

use std::collections::HashMap;

use super::{TripleIter, TripleStore};
use crate::types::{Term, Triple};

type SingleIndex = HashMap<Term, Vec<usize>>;
type PairIndex = HashMap<Term, HashMap<Term, Vec<usize>>>;

/// An in-memory triple store with one index per access path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Vec<Option<Triple>>,
    free: Vec<usize>,
    lookup: HashMap<Triple, usize>,
    by_subject: SingleIndex,
    by_predicate: SingleIndex,
    by_object: SingleIndex,
    by_subject_predicate: PairIndex,
    by_subject_object: PairIndex,
    by_predicate_object: PairIndex,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Insert a triple. Returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.lookup.contains_key(&triple) {
            return false;
        }
        let id = self.free.pop().unwrap_or(self.slots.len());

        push_single(&mut self.by_subject, &triple.subject, id);
        push_single(&mut self.by_predicate, &triple.predicate, id);
        push_single(&mut self.by_object, &triple.object, id);
        push_pair(
            &mut self.by_subject_predicate,
            &triple.subject,
            &triple.predicate,
            id,
        );
        push_pair(
            &mut self.by_subject_object,
            &triple.subject,
            &triple.object,
            id,
        );
        push_pair(
            &mut self.by_predicate_object,
            &triple.predicate,
            &triple.object,
            id,
        );

        self.lookup.insert(triple.clone(), id);
        if id == self.slots.len() {
            self.slots.push(Some(triple));
        } else {
            self.slots[id] = Some(triple);
        }
        true
    }

    /// Remove a triple. Returns `false` if it was not present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let Some(id) = self.lookup.remove(triple) else {
            return false;
        };
        self.slots[id] = None;
        self.free.push(id);

        remove_single(&mut self.by_subject, &triple.subject, id);
        remove_single(&mut self.by_predicate, &triple.predicate, id);
        remove_single(&mut self.by_object, &triple.object, id);
        remove_pair(
            &mut self.by_subject_predicate,
            &triple.subject,
            &triple.predicate,
            id,
        );
        remove_pair(
            &mut self.by_subject_object,
            &triple.subject,
            &triple.object,
            id,
        );
        remove_pair(
            &mut self.by_predicate_object,
            &triple.predicate,
            &triple.object,
            id,
        );
        true
    }

    fn resolve<'a>(&'a self, ids: Option<&'a Vec<usize>>) -> TripleIter<'a> {
        match ids {
            Some(ids) => Box::new(
                ids.iter()
                    .filter_map(|&id| self.slots.get(id).and_then(Option::as_ref)),
            ),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl FromIterator<Triple> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = Self::new();
        for triple in iter {
            store.insert(triple);
        }
        store
    }
}

fn push_single(index: &mut SingleIndex, key: &Term, id: usize) {
    index.entry(key.clone()).or_default().push(id);
}

fn push_pair(index: &mut PairIndex, first: &Term, second: &Term, id: usize) {
    index
        .entry(first.clone())
        .or_default()
        .entry(second.clone())
        .or_default()
        .push(id);
}

fn remove_id(ids: &mut Vec<usize>, id: usize) {
    if let Some(index) = ids.iter().position(|&other| other == id) {
        ids.swap_remove(index);
    }
}

fn remove_single(index: &mut SingleIndex, key: &Term, id: usize) {
    if let Some(ids) = index.get_mut(key) {
        remove_id(ids, id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

fn remove_pair(index: &mut PairIndex, first: &Term, second: &Term, id: usize) {
    let Some(inner) = index.get_mut(first) else {
        return;
    };
    if let Some(ids) = inner.get_mut(second) {
        remove_id(ids, id);
        if ids.is_empty() {
            inner.remove(second);
        }
    }
    if inner.is_empty() {
        index.remove(first);
    }
}

fn get_pair<'a>(index: &'a PairIndex, first: &Term, second: &Term) -> Option<&'a Vec<usize>> {
    index.get(first).and_then(|inner| inner.get(second))
}

impl TripleStore for MemoryStore {
    fn contains_triple(&self, triple: &Triple) -> bool {
        self.lookup.contains_key(triple)
    }

    fn triples(&self) -> TripleIter<'_> {
        Box::new(self.slots.iter().filter_map(Option::as_ref))
    }

    fn triples_with_subject<'a>(&'a self, subject: &Term) -> TripleIter<'a> {
        self.resolve(self.by_subject.get(subject))
    }

    fn triples_with_predicate<'a>(&'a self, predicate: &Term) -> TripleIter<'a> {
        self.resolve(self.by_predicate.get(predicate))
    }

    fn triples_with_object<'a>(&'a self, object: &Term) -> TripleIter<'a> {
        self.resolve(self.by_object.get(object))
    }

    fn triples_with_subject_predicate<'a>(
        &'a self,
        subject: &Term,
        predicate: &Term,
    ) -> TripleIter<'a> {
        self.resolve(get_pair(&self.by_subject_predicate, subject, predicate))
    }

    fn triples_with_subject_object<'a>(
        &'a self,
        subject: &Term,
        object: &Term,
    ) -> TripleIter<'a> {
        self.resolve(get_pair(&self.by_subject_object, subject, object))
    }

    fn triples_with_predicate_object<'a>(
        &'a self,
        predicate: &Term,
        object: &Term,
    ) -> TripleIter<'a> {
        self.resolve(get_pair(&self.by_predicate_object, predicate, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    fn sample() -> MemoryStore {
        [
            t("alice", "knows", "bob"),
            t("alice", "knows", "carol"),
            t("bob", "knows", "carol"),
            t("alice", "likes", "bob"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut store = MemoryStore::new();
        assert!(store.insert(t("a", "b", "c")));
        assert!(!store.insert(t("a", "b", "c")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_single_key_indexes() {
        let store = sample();
        assert_eq!(store.triples_with_subject(&Term::iri("alice")).count(), 3);
        assert_eq!(store.triples_with_predicate(&Term::iri("knows")).count(), 3);
        assert_eq!(store.triples_with_object(&Term::iri("carol")).count(), 2);
        assert_eq!(store.triples_with_subject(&Term::iri("nobody")).count(), 0);
    }

    #[test]
    fn test_pair_indexes() {
        let store = sample();
        assert_eq!(
            store
                .triples_with_subject_predicate(&Term::iri("alice"), &Term::iri("knows"))
                .count(),
            2
        );
        assert_eq!(
            store
                .triples_with_subject_object(&Term::iri("alice"), &Term::iri("bob"))
                .count(),
            2
        );
        assert_eq!(
            store
                .triples_with_predicate_object(&Term::iri("knows"), &Term::iri("carol"))
                .count(),
            2
        );
    }

    #[test]
    fn test_remove_leaves_no_trace_in_indexes() {
        let mut store = sample();
        assert!(store.remove(&t("alice", "knows", "bob")));
        assert!(!store.remove(&t("alice", "knows", "bob")));
        assert!(!store.contains_triple(&t("alice", "knows", "bob")));
        assert_eq!(store.len(), 3);
        assert_eq!(store.triples().count(), 3);
        assert_eq!(store.triples_with_subject(&Term::iri("alice")).count(), 2);

        // Re-inserting yields the triple exactly once.
        store.insert(t("alice", "knows", "bob"));
        assert_eq!(
            store
                .triples_with_subject_predicate(&Term::iri("alice"), &Term::iri("knows"))
                .count(),
            2
        );
    }

    #[test]
    fn test_insert_remove_cycles_reuse_storage() {
        let mut store = MemoryStore::new();
        store.insert(t("kept", "p", "o"));
        for i in 0..1000 {
            let churn = Triple::new(Term::iri("s"), Term::iri("p"), Term::integer(i));
            assert!(store.insert(churn.clone()));
            assert!(store.remove(&churn));
        }
        assert_eq!(store.slots.len(), 2);
        assert_eq!(store.len(), 1);
        assert!(!store.by_subject.contains_key(&Term::iri("s")));
        assert_eq!(store.by_object.len(), 1);
        assert_eq!(store.by_predicate[&Term::iri("p")], vec![0]);
        assert!(!store.by_subject_predicate.contains_key(&Term::iri("s")));
        assert_eq!(store.by_predicate_object[&Term::iri("p")].len(), 1);
        assert_eq!(store.triples().count(), 1);
    }

    #[test]
    fn test_retrieval_is_restartable() {
        let store = sample();
        let first: Vec<_> = store.triples_with_subject(&Term::iri("alice")).collect();
        let second: Vec<_> = store.triples_with_subject(&Term::iri("alice")).collect();
        assert_eq!(first, second);
    }
}
