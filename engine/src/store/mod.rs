//! Triple access for the evaluator.
//!
//! The evaluator consumes storage only through [`TripleStore`]: an exact
//! containment test, one retrieval per non-empty combination of fixed
//! positions, and a full scan. Retrievals are lazy and restartable (calling
//! the method again yields a fresh iterator over the same triples).
//!
//! [`MemoryStore`] is the indexed in-memory implementation.

mod memory;

pub use memory::MemoryStore;

use crate::types::{Term, Triple};

/// A lazy sequence of triples borrowed from a store.
pub type TripleIter<'a> = Box<dyn Iterator<Item = &'a Triple> + 'a>;

/// Read-only access to a collection of triples.
///
/// Implementations must never yield the same stored triple twice from a
/// single retrieval. No ordering is guaranteed.
pub trait TripleStore {
    /// Check whether the exact triple is present.
    fn contains_triple(&self, triple: &Triple) -> bool;

    /// All triples.
    fn triples(&self) -> TripleIter<'_>;

    /// Triples with the given subject.
    fn triples_with_subject<'a>(&'a self, subject: &Term) -> TripleIter<'a>;

    /// Triples with the given predicate.
    fn triples_with_predicate<'a>(&'a self, predicate: &Term) -> TripleIter<'a>;

    /// Triples with the given object.
    fn triples_with_object<'a>(&'a self, object: &Term) -> TripleIter<'a>;

    /// Triples with the given subject and predicate.
    fn triples_with_subject_predicate<'a>(
        &'a self,
        subject: &Term,
        predicate: &Term,
    ) -> TripleIter<'a>;

    /// Triples with the given subject and object.
    fn triples_with_subject_object<'a>(&'a self, subject: &Term, object: &Term)
    -> TripleIter<'a>;

    /// Triples with the given predicate and object.
    fn triples_with_predicate_object<'a>(
        &'a self,
        predicate: &Term,
        object: &Term,
    ) -> TripleIter<'a>;
}
