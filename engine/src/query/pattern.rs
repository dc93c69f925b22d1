//! Pattern items: the matchable units of a triple pattern.
//!
//! Each item can test a candidate term (`accepts`), materialise a term from a
//! solution (`construct`) and report the variable slot it binds.

use std::collections::HashMap;
use std::fmt;

use super::error::QueryError;
use super::multiset::{Multiset, VariableValues};
use super::solution::{Solution, TEMPORARY_VARIABLE_PREFIX};
use super::triple_pattern::TriplePattern;
use crate::expression::strip_variable_prefix;
use crate::types::Term;

/// What a pattern item needs to know about the evaluation in progress.
pub trait PatternEvaluationContext {
    /// Whether rigorous evaluation is switched on for the query.
    fn rigorous_evaluation(&self) -> bool;
    /// The values the input binds a slot to, or `None` if no input solution
    /// mentions the slot.
    fn input_values(&self, variable: &str) -> Option<&VariableValues>;
}

/// The input's value sets for one pattern match.
///
/// Built once before candidates are tested, so each rigorous check is a set
/// lookup rather than a pass over the input.
#[derive(Debug, Default)]
pub struct MatchScope {
    rigorous: bool,
    values: HashMap<String, VariableValues>,
}

impl MatchScope {
    /// Collect the input's values for the given slots.
    #[must_use]
    pub fn new(rigorous: bool, input: &Multiset, variables: &[&str]) -> Self {
        let values = variables
            .iter()
            .filter_map(|&name| Some((name.to_owned(), input.variable_values(name)?)))
            .collect();
        Self { rigorous, values }
    }

    /// The scope for matching `pattern`. Value sets are only collected when
    /// the query or one of the pattern's items asks for rigorous checking.
    #[must_use]
    pub fn for_pattern(pattern: &TriplePattern, input: &Multiset, rigorous: bool) -> Self {
        if rigorous || pattern.has_rigorous_items() {
            Self::new(rigorous, input, &pattern.variables())
        } else {
            Self::default()
        }
    }
}

impl PatternEvaluationContext for MatchScope {
    fn rigorous_evaluation(&self) -> bool {
        self.rigorous
    }

    fn input_values(&self, variable: &str) -> Option<&VariableValues> {
        self.values.get(variable)
    }
}

/// A variable slot shared by [`PatternItem::Variable`] and
/// [`PatternItem::BlankPlaceholder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed so patterns can be reused across queries
pub struct VariableSlot {
    name: String,
    /// Checked rigorously even when the query is not.
    rigorous: bool,
    /// Set when the same slot occurs more than once in one triple pattern.
    repeated: bool,
}

impl VariableSlot {
    const fn new(name: String) -> Self {
        Self {
            name,
            rigorous: false,
            repeated: false,
        }
    }

    /// The slot name, without any `?` prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_repeated(&self) -> bool {
        self.repeated
    }

    fn accepts(&self, context: &dyn PatternEvaluationContext, term: &Term) -> bool {
        if !(context.rigorous_evaluation() || self.rigorous) {
            return true;
        }
        // Nothing to check against when the input never mentions the slot.
        // Repeated occurrences within the pattern are checked by the pattern.
        context
            .input_values(&self.name)
            .is_none_or(|values| values.admits(term))
    }
}

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed so patterns can be reused across queries
pub enum PatternItem {
    /// Matches exactly one term.
    Fixed(Term),
    /// Matches any term, binding it to a named slot.
    Variable(VariableSlot),
    /// Like a variable, but the slot is temporary and trimmed from results.
    BlankPlaceholder(VariableSlot),
    /// Matches quoted triple terms component-wise.
    Nested(Box<TriplePattern>),
}

impl PatternItem {
    #[must_use]
    pub const fn fixed(term: Term) -> Self {
        Self::Fixed(term)
    }

    /// A variable. A leading `?` or `$` is stripped.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Variable(VariableSlot::new(strip_variable_prefix(name).to_owned()))
    }

    /// A blank-node placeholder. The slot is named `_:label`.
    #[must_use]
    pub fn blank(label: &str) -> Self {
        let label = label.strip_prefix(TEMPORARY_VARIABLE_PREFIX).unwrap_or(label);
        Self::BlankPlaceholder(VariableSlot::new(format!(
            "{TEMPORARY_VARIABLE_PREFIX}{label}"
        )))
    }

    #[must_use]
    pub fn nested(pattern: TriplePattern) -> Self {
        Self::Nested(Box::new(pattern))
    }

    /// Check this item rigorously even when the query has rigorous
    /// evaluation off. `false` leaves the query's setting in charge.
    ///
    /// Has no effect on fixed and nested items.
    #[must_use]
    pub fn rigorous(mut self, rigorous: bool) -> Self {
        if let Self::Variable(slot) | Self::BlankPlaceholder(slot) = &mut self {
            slot.rigorous = rigorous;
        }
        self
    }

    pub(crate) fn mark_repeated(&mut self) {
        if let Self::Variable(slot) | Self::BlankPlaceholder(slot) = self {
            slot.repeated = true;
        }
    }

    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    #[must_use]
    pub const fn is_repeated(&self) -> bool {
        match self {
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => slot.repeated,
            _ => false,
        }
    }

    /// Whether this item, or an item nested inside it, asks for rigorous
    /// checking on its own.
    #[must_use]
    pub fn requests_rigour(&self) -> bool {
        match self {
            Self::Fixed(_) => false,
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => slot.rigorous,
            Self::Nested(pattern) => pattern.has_rigorous_items(),
        }
    }

    /// The fixed term, if this item is fixed.
    #[must_use]
    pub const fn fixed_term(&self) -> Option<&Term> {
        match self {
            Self::Fixed(term) => Some(term),
            _ => None,
        }
    }

    /// The single slot name this item reports.
    ///
    /// A nested pattern can only report one name: the first variable among
    /// its children. Use [`Self::variables`] to see all of them.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Fixed(_) => None,
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => Some(slot.name()),
            Self::Nested(pattern) => pattern.variables().into_iter().next(),
        }
    }

    /// The slot whose value equals this item's matched term, if any.
    ///
    /// Unlike [`Self::variable_name`] this is `None` for nested patterns: a
    /// nested child is bound to a component of the matched term, not to the
    /// term itself.
    #[must_use]
    pub fn binding_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => Some(slot.name()),
            Self::Fixed(_) | Self::Nested(_) => None,
        }
    }

    /// Every slot name bound by this item, recursing into nested patterns.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Self::Fixed(_) => Vec::new(),
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => vec![slot.name()],
            Self::Nested(pattern) => pattern.variables(),
        }
    }

    /// Whether a candidate term can be matched by this item.
    #[must_use]
    pub fn accepts(&self, context: &dyn PatternEvaluationContext, term: &Term) -> bool {
        match self {
            Self::Fixed(fixed) => fixed == term,
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => slot.accepts(context, term),
            Self::Nested(pattern) => term
                .as_triple()
                .is_some_and(|triple| pattern.accepts_components(context, triple)),
        }
    }

    /// Push `(slot, value)` for every slot this item binds when matched
    /// against `term`.
    pub(crate) fn collect_bindings<'t>(&'t self, term: &'t Term, out: &mut Vec<(&'t str, &'t Term)>) {
        match self {
            Self::Fixed(_) => {}
            Self::Variable(slot) | Self::BlankPlaceholder(slot) => out.push((slot.name(), term)),
            Self::Nested(pattern) => {
                if let Some(triple) = term.as_triple() {
                    pattern.collect_bindings(triple, out);
                }
            }
        }
    }

    /// Build a term from the bindings of the construct context.
    ///
    /// Variables must be bound. Blank placeholders become fresh blank nodes
    /// that are stable within one solution.
    pub fn construct(&self, context: &mut ConstructContext<'_>) -> Result<Term, QueryError> {
        match self {
            Self::Fixed(term) => Ok(term.clone()),
            Self::Variable(slot) => context
                .solution()
                .get(slot.name())
                .cloned()
                .ok_or_else(|| QueryError::UnboundVariable(slot.name().to_owned())),
            Self::BlankPlaceholder(slot) => Ok(context.blank_node(slot.name())),
            Self::Nested(pattern) => Ok(Term::triple(pattern.construct(context)?)),
        }
    }
}

impl From<Term> for PatternItem {
    fn from(term: Term) -> Self {
        Self::Fixed(term)
    }
}

impl From<TriplePattern> for PatternItem {
    fn from(pattern: TriplePattern) -> Self {
        Self::nested(pattern)
    }
}

impl fmt::Display for PatternItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(term) => write!(f, "{term}"),
            Self::Variable(slot) => write!(f, "?{}", slot.name()),
            Self::BlankPlaceholder(slot) => write!(f, "{}", slot.name()),
            Self::Nested(pattern) => write!(f, "<< {pattern} >>"),
        }
    }
}

/// Per-solution state for materialising templates.
///
/// Blank placeholders map to one fresh blank node per (solution, label), so
/// the same placeholder used twice in a template yields the same node, and
/// two solutions never share a node.
#[derive(Debug)]
pub struct ConstructContext<'s> {
    solution: &'s Solution,
    scope: usize,
    blank_nodes: HashMap<String, Term>,
}

impl<'s> ConstructContext<'s> {
    /// `scope` must differ between solutions materialised into one output.
    #[must_use]
    pub fn new(solution: &'s Solution, scope: usize) -> Self {
        Self {
            solution,
            scope,
            blank_nodes: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn solution(&self) -> &'s Solution {
        self.solution
    }

    /// The blank node for a placeholder slot in this solution.
    pub fn blank_node(&mut self, slot: &str) -> Term {
        let label = slot.strip_prefix(TEMPORARY_VARIABLE_PREFIX).unwrap_or(slot);
        let scope = self.scope;
        self.blank_nodes
            .entry(label.to_owned())
            .or_insert_with(|| Term::blank(format!("{label}s{scope}")))
            .clone()
    }
}
