//! Triple patterns and their index classification.

use std::fmt;

use super::error::QueryError;
use super::pattern::{ConstructContext, PatternEvaluationContext, PatternItem};
use super::solution::Solution;
use crate::types::{Term, Triple};

/// A position within a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub const ALL: [Self; 3] = [Self::Subject, Self::Predicate, Self::Object];

    /// The term at this position of a triple.
    #[must_use]
    pub const fn of(self, triple: &Triple) -> &Term {
        match self {
            Self::Subject => &triple.subject,
            Self::Predicate => &triple.predicate,
            Self::Object => &triple.object,
        }
    }
}

/// Which positions of a pattern can be used as index keys.
///
/// Computed from the fixed positions alone when a pattern is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripleIndexType {
    Subject,
    SubjectPredicate,
    SubjectObject,
    Predicate,
    PredicateObject,
    Object,
    /// All three positions fixed.
    NoVariables,
    /// No position fixed.
    None,
}

impl TripleIndexType {
    /// Classify a set of known positions.
    #[must_use]
    pub const fn from_known(subject: bool, predicate: bool, object: bool) -> Self {
        match (subject, predicate, object) {
            (true, false, false) => Self::Subject,
            (true, true, false) => Self::SubjectPredicate,
            (true, false, true) => Self::SubjectObject,
            (false, true, false) => Self::Predicate,
            (false, true, true) => Self::PredicateObject,
            (false, false, true) => Self::Object,
            (true, true, true) => Self::NoVariables,
            (false, false, false) => Self::None,
        }
    }
}

/// A triple template of three pattern items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed so patterns can be reused across queries
pub struct TriplePattern {
    subject: PatternItem,
    predicate: PatternItem,
    object: PatternItem,
    index_type: TripleIndexType,
}

impl TriplePattern {
    /// Build a pattern, classifying it and marking slots that occur in more
    /// than one position as repeated.
    #[must_use]
    pub fn new(
        subject: impl Into<PatternItem>,
        predicate: impl Into<PatternItem>,
        object: impl Into<PatternItem>,
    ) -> Self {
        let mut items = [subject.into(), predicate.into(), object.into()];

        let names: Vec<Option<String>> = items
            .iter()
            .map(|item| item.binding_variable().map(str::to_owned))
            .collect();
        for (i, item) in items.iter_mut().enumerate() {
            if let Some(name) = &names[i]
                && names
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.as_ref() == Some(name))
            {
                item.mark_repeated();
            }
        }

        let index_type = TripleIndexType::from_known(
            items[0].is_fixed(),
            items[1].is_fixed(),
            items[2].is_fixed(),
        );
        let [subject, predicate, object] = items;
        Self {
            subject,
            predicate,
            object,
            index_type,
        }
    }

    #[must_use]
    pub const fn subject(&self) -> &PatternItem {
        &self.subject
    }

    #[must_use]
    pub const fn predicate(&self) -> &PatternItem {
        &self.predicate
    }

    #[must_use]
    pub const fn object(&self) -> &PatternItem {
        &self.object
    }

    #[must_use]
    pub const fn item(&self, position: Position) -> &PatternItem {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    #[must_use]
    pub const fn index_type(&self) -> TripleIndexType {
        self.index_type
    }

    /// True when every position is fixed.
    #[must_use]
    pub const fn has_no_variables(&self) -> bool {
        matches!(self.index_type, TripleIndexType::NoVariables)
    }

    /// Distinct slot names bound by the pattern, in position order,
    /// including those inside nested patterns.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for position in Position::ALL {
            for name in self.item(position).variables() {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        out
    }

    /// Whether any item, nested ones included, asks for rigorous checking
    /// on its own.
    #[must_use]
    pub fn has_rigorous_items(&self) -> bool {
        Position::ALL
            .into_iter()
            .any(|position| self.item(position).requests_rigour())
    }

    /// Whether a triple matches the pattern.
    ///
    /// With rigorous evaluation on, for the query or for a repeated slot
    /// itself, a slot occurring more than once must carry the same value
    /// everywhere. Otherwise repeated slots are not cross-checked and the
    /// first occurrence wins in [`Self::create_result`].
    #[must_use]
    pub fn accepts(&self, context: &dyn PatternEvaluationContext, triple: &Triple) -> bool {
        if !self.accepts_components(context, triple) {
            return false;
        }
        let check_repeats = context.rigorous_evaluation()
            || Position::ALL.into_iter().any(|position| {
                let item = self.item(position);
                item.is_repeated() && item.requests_rigour()
            });
        if !check_repeats {
            return true;
        }
        let bindings = self.bindings(triple);
        bindings.iter().enumerate().all(|(i, (name, value))| {
            bindings[..i]
                .iter()
                .all(|(other, other_value)| other != name || other_value == value)
        })
    }

    pub(crate) fn accepts_components(
        &self,
        context: &dyn PatternEvaluationContext,
        triple: &Triple,
    ) -> bool {
        Position::ALL
            .into_iter()
            .all(|position| self.item(position).accepts(context, position.of(triple)))
    }

    fn bindings<'t>(&'t self, triple: &'t Triple) -> Vec<(&'t str, &'t Term)> {
        let mut out = Vec::new();
        self.collect_bindings(triple, &mut out);
        out
    }

    pub(crate) fn collect_bindings<'t>(
        &'t self,
        triple: &'t Triple,
        out: &mut Vec<(&'t str, &'t Term)>,
    ) {
        for position in Position::ALL {
            self.item(position)
                .collect_bindings(position.of(triple), out);
        }
    }

    /// The solution produced by matching a triple, binding every slot of the
    /// pattern (nested ones included).
    #[must_use]
    pub fn create_result(&self, triple: &Triple) -> Solution {
        let mut solution = Solution::new();
        for (name, value) in self.bindings(triple) {
            if !solution.contains_variable(name) {
                solution.bind(name, value.clone());
            }
        }
        solution
    }

    /// Materialise the pattern as a triple.
    ///
    /// Fails if a variable is unbound, or if the predicate does not come out
    /// as an IRI.
    pub fn construct(&self, context: &mut ConstructContext<'_>) -> Result<Triple, QueryError> {
        let subject = self.subject.construct(context)?;
        let predicate = self.predicate.construct(context)?;
        if !predicate.is_iri() {
            return Err(QueryError::Unsupported(format!(
                "cannot construct a triple with predicate {predicate}"
            )));
        }
        let object = self.object.construct(context)?;
        Ok(Triple::new(subject, predicate, object))
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{MatchScope, Multiset};

    fn scope(rigorous: bool) -> MatchScope {
        MatchScope::new(rigorous, &Multiset::identity(), &[])
    }

    fn iri(s: &str) -> Term {
        Term::iri(s)
    }

    #[test]
    fn test_classification_from_fixed_positions() {
        let v = || PatternItem::var("v");
        let f = |s: &str| PatternItem::fixed(iri(s));
        let cases = [
            (TriplePattern::new(f("s"), v(), PatternItem::var("o")), TripleIndexType::Subject),
            (TriplePattern::new(f("s"), f("p"), v()), TripleIndexType::SubjectPredicate),
            (TriplePattern::new(f("s"), v(), f("o")), TripleIndexType::SubjectObject),
            (TriplePattern::new(v(), f("p"), PatternItem::var("o")), TripleIndexType::Predicate),
            (TriplePattern::new(v(), f("p"), f("o")), TripleIndexType::PredicateObject),
            (TriplePattern::new(v(), PatternItem::var("p"), f("o")), TripleIndexType::Object),
            (TriplePattern::new(f("s"), f("p"), f("o")), TripleIndexType::NoVariables),
            (
                TriplePattern::new(v(), PatternItem::var("p"), PatternItem::var("o")),
                TripleIndexType::None,
            ),
        ];
        for (pattern, expected) in cases {
            assert_eq!(pattern.index_type(), expected, "{pattern}");
        }
    }

    #[test]
    fn test_nested_position_is_not_an_index_key() {
        let nested = TriplePattern::new(iri("a"), iri("b"), iri("c"));
        let pattern = TriplePattern::new(iri("s"), iri("p"), nested);
        assert_eq!(pattern.index_type(), TripleIndexType::SubjectPredicate);
    }

    #[test]
    fn test_repeated_variables_are_marked() {
        let pattern = TriplePattern::new(PatternItem::var("x"), iri("p"), PatternItem::var("x"));
        assert!(pattern.subject().is_repeated());
        assert!(pattern.object().is_repeated());
        assert!(!pattern.predicate().is_repeated());
        assert_eq!(pattern.variables(), vec!["x"]);
    }

    #[test]
    fn test_repeated_variables_checked_only_when_rigorous() {
        let pattern = TriplePattern::new(PatternItem::var("x"), iri("p"), PatternItem::var("x"));
        let loop_triple = Triple::new(iri("a"), iri("p"), iri("a"));
        let other = Triple::new(iri("a"), iri("p"), iri("b"));

        let lax = scope(false);
        let strict = scope(true);
        assert!(pattern.accepts(&lax, &loop_triple));
        assert!(pattern.accepts(&lax, &other));
        assert!(pattern.accepts(&strict, &loop_triple));
        assert!(!pattern.accepts(&strict, &other));

        // First occurrence wins.
        assert_eq!(pattern.create_result(&other).get("x"), Some(&iri("a")));
    }

    #[test]
    fn test_rigorous_repeated_slot_is_checked_without_query_rigour() {
        let pattern = TriplePattern::new(
            PatternItem::var("x").rigorous(true),
            iri("p"),
            PatternItem::var("x"),
        );
        assert!(pattern.has_rigorous_items());
        let lax = scope(false);
        assert!(pattern.accepts(&lax, &Triple::new(iri("a"), iri("p"), iri("a"))));
        assert!(!pattern.accepts(&lax, &Triple::new(iri("a"), iri("p"), iri("b"))));

        // A rigorous item that is not repeated leaves repeats unchecked.
        let pattern = TriplePattern::new(
            PatternItem::var("x"),
            PatternItem::var("y").rigorous(true),
            PatternItem::var("x"),
        );
        assert!(pattern.accepts(&lax, &Triple::new(iri("a"), iri("p"), iri("b"))));
    }

    #[test]
    fn test_nested_rigour_is_reported() {
        let nested = TriplePattern::new(PatternItem::var("a").rigorous(true), iri("b"), iri("c"));
        let pattern = TriplePattern::new(iri("s"), iri("p"), nested);
        assert!(pattern.has_rigorous_items());
        assert!(!TriplePattern::new(iri("s"), iri("p"), PatternItem::var("o")).has_rigorous_items());
    }

    #[test]
    fn test_create_result_binds_nested_children() {
        let nested = TriplePattern::new(PatternItem::var("a"), iri("b"), PatternItem::var("c"));
        let pattern = TriplePattern::new(PatternItem::var("s"), iri("p"), nested);
        let quoted = Triple::new(iri("x"), iri("b"), iri("y"));
        let triple = Triple::new(iri("s1"), iri("p"), Term::triple(quoted));

        assert!(pattern.accepts(&scope(false), &triple));
        let result = pattern.create_result(&triple);
        assert_eq!(result.get("s"), Some(&iri("s1")));
        assert_eq!(result.get("a"), Some(&iri("x")));
        assert_eq!(result.get("c"), Some(&iri("y")));
    }

    #[test]
    fn test_construct_rejects_non_iri_predicate() {
        let solution = Solution::new()
            .with("s", iri("a"))
            .with("p", Term::literal("not a predicate"));
        let pattern = TriplePattern::new(PatternItem::var("s"), PatternItem::var("p"), iri("o"));
        let mut context = ConstructContext::new(&solution, 0);
        assert!(matches!(
            pattern.construct(&mut context),
            Err(QueryError::Unsupported(_))
        ));
    }
}
