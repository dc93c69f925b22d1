//! Ground triples.

use std::fmt;

use super::term::Term;

/// A complete fact: (subject, predicate, object).
///
/// Equality is component-wise. The derived ordering compares subject first,
/// then predicate, then object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::disallowed_methods)] // Clone needed for owned candidates in the matcher
pub struct Triple {
    /// The subject.
    pub subject: Term,
    /// The predicate.
    pub predicate: Term,
    /// The object.
    pub object: Term,
}

impl Triple {
    /// Create a new triple.
    #[must_use]
    pub const fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_equality_is_component_wise() {
        let a = Triple::new(Term::iri("a"), Term::iri("b"), Term::integer(1));
        let b = Triple::new(Term::iri("a"), Term::iri("b"), Term::integer(1));
        let c = Triple::new(Term::iri("a"), Term::iri("b"), Term::integer(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let t = Triple::new(Term::iri("http://a"), Term::iri("http://b"), Term::literal("c"));
        assert_eq!(t.to_string(), "<http://a> <http://b> \"c\"");
    }
}
