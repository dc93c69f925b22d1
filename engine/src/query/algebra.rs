//! Algebra operators and their default evaluation.
//!
//! Every node evaluates as "input joined with the node": the context's input
//! multiset seeds the evaluation, and the result already contains the input's
//! bindings. A basic graph pattern uses the seed to narrow its index lookups.
//! Operators whose semantics need their child's solutions in isolation
//! (filters, projections, grouping, slicing, the optional side of a left join)
//! evaluate that child against the identity input and join the result with
//! the seed afterwards.
//!
//! Children are always evaluated through [`EvaluationContext::evaluate`], so
//! an attached [`AlgebraProcessor`] sees every node of the tree.

use std::collections::HashMap;

use super::accumulator::{Accumulator, Aggregate};
use super::context::EvaluationContext;
use super::error::QueryError;
use super::multiset::Multiset;
use super::solution::{Solution, is_temporary_variable};
use super::triple_pattern::TriplePattern;
use crate::expression::Expression;
use crate::types::Term;

/// An alternative evaluation strategy for algebra nodes.
///
/// A processor attached to a context receives every node the context is
/// asked to evaluate. It may fall back to [`Algebra::evaluate`] for nodes it
/// does not handle itself.
pub trait AlgebraProcessor {
    fn process_algebra(
        &self,
        algebra: &Algebra,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Multiset, QueryError>;
}

/// A basic graph pattern: a conjunction of triple patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::disallowed_methods)] // Clone needed so query trees can be rewritten by processors
pub struct Bgp {
    patterns: Vec<TriplePattern>,
}

impl Bgp {
    #[must_use]
    pub const fn new(patterns: Vec<TriplePattern>) -> Self {
        Self { patterns }
    }

    #[must_use]
    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    /// Variables bound by the patterns, excluding temporary slots.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            for name in pattern.variables() {
                if !is_temporary_variable(name) && !out.iter().any(|v| v == name) {
                    out.push(name.to_owned());
                }
            }
        }
        out
    }

    /// Evaluate each pattern in turn, feeding the running result back in as
    /// the context's input so later patterns can narrow on earlier bindings.
    pub fn evaluate(&self, context: &mut EvaluationContext<'_>) -> Result<Multiset, QueryError> {
        let original = context.replace_input(Multiset::identity());
        let mut running = original.clone();
        let result = self.evaluate_patterns(context, &mut running);
        context.set_input(original);
        result?;

        if context.trim_temporary_variables() {
            running.trim_temporary_variables();
        }
        Ok(running)
    }

    fn evaluate_patterns(
        &self,
        context: &mut EvaluationContext<'_>,
        running: &mut Multiset,
    ) -> Result<(), QueryError> {
        for pattern in &self.patterns {
            if running.is_empty() {
                *running = Multiset::null();
                break;
            }
            context.set_input(std::mem::take(running));
            context.evaluate_triple_pattern(pattern)?;
            let matched = context.take_output();
            *running = context
                .input()
                .join(&matched, || context.check_timeout())?;
            context.check_timeout()?;
        }
        Ok(())
    }
}

/// A query algebra tree.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::disallowed_methods)] // Clone needed so query trees can be rewritten by processors
pub enum Algebra {
    Bgp(Bgp),
    Join(Box<Self>, Box<Self>),
    /// OPTIONAL, with the optional filter applied to merged solutions.
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        filter: Option<Expression>,
    },
    Union(Box<Self>, Box<Self>),
    Filter {
        inner: Box<Self>,
        expression: Expression,
    },
    /// BIND: add one variable computed from an expression.
    Extend {
        inner: Box<Self>,
        variable: String,
        expression: Expression,
    },
    Distinct(Box<Self>),
    Project {
        inner: Box<Self>,
        variables: Vec<String>,
    },
    /// OFFSET / LIMIT.
    Slice {
        inner: Box<Self>,
        offset: usize,
        limit: Option<usize>,
    },
    GroupBy {
        inner: Box<Self>,
        keys: Vec<String>,
        aggregates: Vec<(String, Aggregate)>,
    },
}

impl Algebra {
    #[must_use]
    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Self::Bgp(Bgp::new(patterns))
    }

    /// A BGP with no patterns. Evaluates to its input.
    #[must_use]
    pub fn empty_bgp() -> Self {
        Self::Bgp(Bgp::default())
    }

    #[must_use]
    pub fn join(left: Self, right: Self) -> Self {
        Self::Join(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn left_join(left: Self, right: Self, filter: Option<Expression>) -> Self {
        Self::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            filter,
        }
    }

    #[must_use]
    pub fn union(left: Self, right: Self) -> Self {
        Self::Union(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn filter(self, expression: Expression) -> Self {
        Self::Filter {
            inner: Box::new(self),
            expression,
        }
    }

    #[must_use]
    pub fn extend(self, variable: &str, expression: Expression) -> Self {
        Self::Extend {
            inner: Box::new(self),
            variable: crate::expression::strip_variable_prefix(variable).to_owned(),
            expression,
        }
    }

    #[must_use]
    pub fn distinct(self) -> Self {
        Self::Distinct(Box::new(self))
    }

    #[must_use]
    pub fn project(self, variables: &[&str]) -> Self {
        Self::Project {
            inner: Box::new(self),
            variables: variables
                .iter()
                .map(|v| crate::expression::strip_variable_prefix(v).to_owned())
                .collect(),
        }
    }

    #[must_use]
    pub fn slice(self, offset: usize, limit: Option<usize>) -> Self {
        Self::Slice {
            inner: Box::new(self),
            offset,
            limit,
        }
    }

    #[must_use]
    pub fn group_by(self, keys: &[&str], aggregates: Vec<(String, Aggregate)>) -> Self {
        Self::GroupBy {
            inner: Box::new(self),
            keys: keys
                .iter()
                .map(|k| crate::expression::strip_variable_prefix(k).to_owned())
                .collect(),
            aggregates,
        }
    }

    /// Variables visible in the node's results, in first-mention order.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        fn push_all(out: &mut Vec<String>, names: Vec<String>) {
            for name in names {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }

        match self {
            Self::Bgp(bgp) => bgp.variables(),
            Self::Join(l, r) | Self::Union(l, r) | Self::LeftJoin { left: l, right: r, .. } => {
                let mut out = l.variables();
                push_all(&mut out, r.variables());
                out
            }
            Self::Filter { inner, .. }
            | Self::Distinct(inner)
            | Self::Slice { inner, .. } => inner.variables(),
            Self::Extend {
                inner, variable, ..
            } => {
                let mut out = inner.variables();
                push_all(&mut out, vec![variable.clone()]);
                out
            }
            Self::Project { variables, .. } => variables.clone(),
            Self::GroupBy {
                keys, aggregates, ..
            } => {
                let mut out = keys.clone();
                push_all(&mut out, aggregates.iter().map(|(v, _)| v.clone()).collect());
                out
            }
        }
    }

    /// The node's own evaluation, used when no processor is attached.
    pub fn evaluate(&self, context: &mut EvaluationContext<'_>) -> Result<Multiset, QueryError> {
        match self {
            Self::Bgp(bgp) => bgp.evaluate(context),
            Self::Join(left, right) => {
                let left = context.evaluate(left)?;
                let original = context.replace_input(left);
                let result = context.evaluate(right);
                context.set_input(original);
                result
            }
            Self::Union(left, right) => {
                let left = context.evaluate(left)?;
                let right = context.evaluate(right)?;
                Ok(left.union(right))
            }
            Self::LeftJoin {
                left,
                right,
                filter,
            } => {
                let left = context.evaluate(left)?;
                let right = context.evaluate_standalone(right)?;
                let ctx = &*context;
                left.left_join(
                    &right,
                    |merged| {
                        filter
                            .as_ref()
                            .is_none_or(|f| f.evaluate_boolean(merged, ctx).unwrap_or(false))
                    },
                    || ctx.check_timeout(),
                )
            }
            Self::Filter { inner, expression } => {
                let inner = context.evaluate_standalone(inner)?;
                let mut kept = Vec::new();
                for solution in inner.iter() {
                    context.check_timeout()?;
                    // An expression error filters the solution out.
                    if expression
                        .evaluate_boolean(solution, context)
                        .unwrap_or(false)
                    {
                        kept.push(solution.clone());
                    }
                }
                seed(context, Multiset::from(kept))
            }
            Self::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = context.evaluate_standalone(inner)?;
                let mut extended = Vec::with_capacity(inner.len());
                for solution in inner.iter() {
                    context.check_timeout()?;
                    if solution.is_bound(variable) {
                        return Err(QueryError::Unsupported(format!(
                            "BIND would rebind ?{variable}"
                        )));
                    }
                    // An expression error leaves the variable unbound.
                    let value = expression.evaluate(solution, context).ok();
                    let mut solution = solution.clone();
                    solution.add(variable.as_str(), value);
                    extended.push(solution);
                }
                seed(context, Multiset::from(extended))
            }
            Self::Distinct(inner) => {
                let inner = context.evaluate_standalone(inner)?;
                seed(context, inner.distinct())
            }
            Self::Project { inner, variables } => {
                let inner = context.evaluate_standalone(inner)?;
                seed(context, inner.project(variables))
            }
            Self::Slice {
                inner,
                offset,
                limit,
            } => {
                let inner = context.evaluate_standalone(inner)?;
                seed(context, inner.slice(*offset, *limit))
            }
            Self::GroupBy {
                inner,
                keys,
                aggregates,
            } => {
                let inner = context.evaluate_standalone(inner)?;
                let grouped = group(context, &inner, keys, aggregates)?;
                seed(context, grouped)
            }
        }
    }
}

impl From<Bgp> for Algebra {
    fn from(bgp: Bgp) -> Self {
        Self::Bgp(bgp)
    }
}

/// Join a standalone result with the context's input.
fn seed(context: &EvaluationContext<'_>, result: Multiset) -> Result<Multiset, QueryError> {
    if context.input().is_identity() {
        return Ok(result);
    }
    context
        .input()
        .join(&result, || context.check_timeout())
}

/// Group solutions by key and run one set of accumulators per group.
///
/// Without keys there is always exactly one group, even over no solutions.
/// Identical aggregate requests share a single accumulator.
fn group(
    context: &EvaluationContext<'_>,
    input: &Multiset,
    keys: &[String],
    aggregates: &[(String, Aggregate)],
) -> Result<Multiset, QueryError> {
    let mut distinct_aggregates: Vec<&Aggregate> = Vec::new();
    let slots: Vec<usize> = aggregates
        .iter()
        .map(|(_, aggregate)| {
            distinct_aggregates
                .iter()
                .position(|a| *a == aggregate)
                .unwrap_or_else(|| {
                    distinct_aggregates.push(aggregate);
                    distinct_aggregates.len() - 1
                })
        })
        .collect();

    let new_group = || -> Vec<Box<dyn Accumulator>> {
        distinct_aggregates
            .iter()
            .map(|a| a.accumulator(context.comparer()))
            .collect()
    };

    let mut order: Vec<Vec<Option<Term>>> = Vec::new();
    let mut groups: HashMap<Vec<Option<Term>>, Vec<Box<dyn Accumulator>>> = HashMap::new();
    if keys.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), new_group());
    }

    for solution in input.iter() {
        context.check_timeout()?;
        let key: Vec<Option<Term>> = keys.iter().map(|k| solution.get(k).cloned()).collect();
        let accumulators = groups.entry(key).or_insert_with_key(|key| {
            order.push(key.clone());
            new_group()
        });
        for accumulator in accumulators {
            accumulator.accumulate(solution, context);
        }
    }

    let mut output = Vec::with_capacity(order.len());
    for key in order {
        let Some(accumulators) = groups.get(&key) else {
            continue;
        };
        let mut solution = Solution::new();
        for (name, value) in keys.iter().zip(key) {
            solution.add(name.as_str(), value);
        }
        for ((name, _), slot) in aggregates.iter().zip(&slots) {
            solution.add(name.as_str(), accumulators[*slot].accumulated_result());
        }
        output.push(solution);
    }
    Ok(Multiset::from(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryOptions;
    use crate::query::PatternItem;
    use crate::testing::{iri, store_of};

    fn var(name: &str) -> PatternItem {
        PatternItem::var(name)
    }

    fn run(store: &crate::store::MemoryStore, algebra: &Algebra) -> Multiset {
        let mut context = EvaluationContext::new(store, QueryOptions::default());
        context.start_execution(0);
        context.evaluate(algebra).unwrap()
    }

    #[test]
    fn test_bgp_joins_patterns() {
        let store = store_of(&[
            ("alice", "knows", "bob"),
            ("bob", "knows", "carol"),
            ("bob", "name", "bobby"),
        ]);
        let algebra = Algebra::bgp(vec![
            TriplePattern::new(var("a"), iri("knows"), var("b")),
            TriplePattern::new(var("b"), iri("knows"), var("c")),
        ]);
        let result = run(&store, &algebra);
        assert_eq!(result.len(), 1);
        let row = &result.solutions()[0];
        assert_eq!(row.get("a"), Some(&iri("alice")));
        assert_eq!(row.get("c"), Some(&iri("carol")));
    }

    #[test]
    fn test_bgp_stops_on_empty_intermediate_result() {
        let store = store_of(&[("a", "p", "b")]);
        let algebra = Algebra::bgp(vec![
            TriplePattern::new(var("x"), iri("missing"), var("y")),
            TriplePattern::new(var("x"), iri("p"), var("y")),
        ]);
        assert!(run(&store, &algebra).is_empty());
    }

    #[test]
    fn test_optional_keeps_unmatched_rows() {
        let store = store_of(&[
            ("alice", "type", "person"),
            ("bob", "type", "person"),
            ("alice", "email", "mail"),
        ]);
        let algebra = Algebra::left_join(
            Algebra::bgp(vec![TriplePattern::new(var("p"), iri("type"), iri("person"))]),
            Algebra::bgp(vec![TriplePattern::new(var("p"), iri("email"), var("e"))]),
            None,
        );
        let result = run(&store, &algebra);
        assert_eq!(result.len(), 2);
        let with_email = result.iter().filter(|s| s.is_bound("e")).count();
        assert_eq!(with_email, 1);
    }

    #[test]
    fn test_filter_and_extend() {
        let store: crate::store::MemoryStore = [
            crate::types::Triple::new(iri("a"), iri("age"), Term::integer(30)),
            crate::types::Triple::new(iri("b"), iri("age"), Term::integer(12)),
        ]
        .into_iter()
        .collect();
        let algebra = Algebra::bgp(vec![TriplePattern::new(var("p"), iri("age"), var("age"))])
            .filter(Expression::greater_than(
                Expression::var("age"),
                Expression::constant(Term::integer(18)),
            ))
            .extend(
                "next",
                Expression::add(Expression::var("age"), Expression::constant(Term::integer(1))),
            );
        let result = run(&store, &algebra);
        assert_eq!(result.len(), 1);
        assert_eq!(result.solutions()[0].get("next"), Some(&Term::integer(31)));
    }

    #[test]
    fn test_union_project_distinct_slice() {
        let store = store_of(&[("a", "p", "x"), ("a", "q", "x"), ("b", "p", "y")]);
        let left = Algebra::bgp(vec![TriplePattern::new(var("s"), iri("p"), var("o"))]);
        let right = Algebra::bgp(vec![TriplePattern::new(var("s"), iri("q"), var("o"))]);
        let union = Algebra::union(left, right);
        assert_eq!(run(&store, &union).len(), 3);

        let projected = union.clone().project(&["s"]).distinct();
        assert_eq!(run(&store, &projected).len(), 2);

        let sliced = union.slice(1, Some(1));
        assert_eq!(run(&store, &sliced).len(), 1);
    }

    #[test]
    fn test_group_by_counts_per_key() {
        let store = store_of(&[("a", "p", "x"), ("a", "p", "y"), ("b", "p", "z")]);
        let algebra = Algebra::bgp(vec![TriplePattern::new(var("s"), iri("p"), var("o"))])
            .group_by(
                &["s"],
                vec![("n".to_owned(), Aggregate::count(Expression::var("o")))],
            );
        let result = run(&store, &algebra);
        assert_eq!(result.len(), 2);
        let count_for = |s: &str| {
            result
                .iter()
                .find(|row| row.get("s") == Some(&iri(s)))
                .and_then(|row| row.get("n").cloned())
        };
        assert_eq!(count_for("a"), Some(Term::integer(2)));
        assert_eq!(count_for("b"), Some(Term::integer(1)));
    }

    #[test]
    fn test_group_without_keys_over_nothing_yields_one_row() {
        let store = store_of(&[]);
        let algebra = Algebra::bgp(vec![TriplePattern::new(var("s"), iri("p"), var("o"))])
            .group_by(&[], vec![("n".to_owned(), Aggregate::count_all())]);
        let result = run(&store, &algebra);
        assert_eq!(result.len(), 1);
        assert_eq!(result.solutions()[0].get("n"), Some(&Term::integer(0)));
    }

    #[test]
    fn test_variables() {
        let algebra = Algebra::bgp(vec![TriplePattern::new(
            var("s"),
            PatternItem::blank("b"),
            var("o"),
        )])
        .extend("x", Expression::var("o"));
        assert_eq!(algebra.variables(), vec!["s", "o", "x"]);
    }
}
