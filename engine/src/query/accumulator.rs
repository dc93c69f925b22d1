//! Incremental aggregation.
//!
//! An [`Accumulator`] is bound to one expression. Each solution fed to it is
//! evaluated against that expression and the value is folded into a running
//! result. Evaluation errors never escape: a failing solution is folded in as
//! "no value", and only the aggregate reflects the gap.

use std::collections::HashSet;

use super::context::EvaluationContext;
use super::solution::Solution;
use crate::expression::Expression;
use crate::types::{Numeric, Term, TermComparer};

/// A running aggregate over one expression.
pub trait Accumulator {
    /// The expression this accumulator evaluates per solution.
    fn expression(&self) -> &Expression;

    /// Fold one value (or its absence) into the running result.
    fn accumulate_value(&mut self, value: Option<Term>);

    /// The result so far. `None` means the aggregate has no value.
    fn accumulated_result(&self) -> Option<Term>;

    /// Evaluate the expression against a solution and fold the result in.
    fn accumulate(&mut self, solution: &Solution, context: &EvaluationContext<'_>) {
        let value = match self.expression().evaluate(solution, context) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::trace!(error = %e, "aggregate input treated as absent");
                None
            }
        };
        self.accumulate_value(value);
    }
}

/// Accumulators are equal when they wrap equal expressions.
impl PartialEq for dyn Accumulator + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.expression() == other.expression()
    }
}

/// COUNT.
#[derive(Debug)]
pub struct CountAccumulator {
    expression: Expression,
    fed: u64,
    counted: u64,
}

impl CountAccumulator {
    #[must_use]
    pub const fn new(expression: Expression) -> Self {
        Self {
            expression,
            fed: 0,
            counted: 0,
        }
    }

    /// Solutions fed so far, including those without a value.
    #[must_use]
    pub const fn fed(&self) -> u64 {
        self.fed
    }

    /// Solutions that contributed a value.
    #[must_use]
    pub const fn counted(&self) -> u64 {
        self.counted
    }
}

impl Accumulator for CountAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        self.fed += 1;
        if value.is_some() {
            self.counted += 1;
        }
    }

    fn accumulated_result(&self) -> Option<Term> {
        Some(Term::integer(i64::try_from(self.counted).unwrap_or(i64::MAX)))
    }
}

/// SUM. Absent values are skipped; a non-numeric value poisons the sum.
#[derive(Debug)]
pub struct SumAccumulator {
    expression: Expression,
    sum: Option<Numeric>,
}

impl SumAccumulator {
    #[must_use]
    pub const fn new(expression: Expression) -> Self {
        Self {
            expression,
            sum: Some(Numeric::Integer(0)),
        }
    }
}

impl Accumulator for SumAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        self.sum = self
            .sum
            .take()
            .and_then(|sum| Some(sum.add(value.as_numeric()?)));
    }

    fn accumulated_result(&self) -> Option<Term> {
        self.sum.map(Numeric::to_term)
    }
}

/// AVG. Zero over no values, like SUM otherwise.
#[derive(Debug)]
pub struct AvgAccumulator {
    expression: Expression,
    sum: Option<Numeric>,
    count: i64,
}

impl AvgAccumulator {
    #[must_use]
    pub const fn new(expression: Expression) -> Self {
        Self {
            expression,
            sum: Some(Numeric::Integer(0)),
            count: 0,
        }
    }
}

impl Accumulator for AvgAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        self.sum = self
            .sum
            .take()
            .and_then(|sum| Some(sum.add(value.as_numeric()?)));
        self.count = self.count.saturating_add(1);
    }

    fn accumulated_result(&self) -> Option<Term> {
        let sum = self.sum?;
        if self.count == 0 {
            return Some(Term::integer(0));
        }
        sum.divide(Numeric::Integer(self.count))
            .map(Numeric::to_term)
    }
}

/// MIN or MAX under the context's term comparer.
#[derive(Debug)]
pub struct ExtremumAccumulator {
    expression: Expression,
    comparer: TermComparer,
    keep_greater: bool,
    best: Option<Term>,
}

impl ExtremumAccumulator {
    #[must_use]
    pub const fn min(expression: Expression, comparer: TermComparer) -> Self {
        Self {
            expression,
            comparer,
            keep_greater: false,
            best: None,
        }
    }

    #[must_use]
    pub const fn max(expression: Expression, comparer: TermComparer) -> Self {
        Self {
            expression,
            comparer,
            keep_greater: true,
            best: None,
        }
    }
}

impl Accumulator for ExtremumAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        let replace = self.best.as_ref().is_none_or(|best| {
            let ordering = self.comparer.compare(&value, best);
            if self.keep_greater {
                ordering.is_gt()
            } else {
                ordering.is_lt()
            }
        });
        if replace {
            self.best = Some(value);
        }
    }

    fn accumulated_result(&self) -> Option<Term> {
        self.best.clone()
    }
}

/// SAMPLE: the first value seen.
#[derive(Debug)]
pub struct SampleAccumulator {
    expression: Expression,
    sample: Option<Term>,
}

impl SampleAccumulator {
    #[must_use]
    pub const fn new(expression: Expression) -> Self {
        Self {
            expression,
            sample: None,
        }
    }
}

impl Accumulator for SampleAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        if self.sample.is_none() {
            self.sample = value;
        }
    }

    fn accumulated_result(&self) -> Option<Term> {
        self.sample.clone()
    }
}

/// `GROUP_CONCAT`. Absent values are skipped; blank nodes and quoted
/// triples poison the result.
#[derive(Debug)]
pub struct GroupConcatAccumulator {
    expression: Expression,
    separator: String,
    parts: Option<Vec<String>>,
}

impl GroupConcatAccumulator {
    #[must_use]
    pub fn new(expression: Expression, separator: impl Into<String>) -> Self {
        Self {
            expression,
            separator: separator.into(),
            parts: Some(Vec::new()),
        }
    }
}

impl Accumulator for GroupConcatAccumulator {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        let part = match value {
            Term::Iri(iri) => Some(iri),
            Term::Literal(literal) => Some(literal.value),
            Term::BlankNode(_) | Term::Triple(_) => None,
        };
        self.parts = self
            .parts
            .take()
            .and_then(|mut parts| {
                parts.push(part?);
                Some(parts)
            });
    }

    fn accumulated_result(&self) -> Option<Term> {
        self.parts
            .as_ref()
            .map(|parts| Term::literal(parts.join(&self.separator)))
    }
}

/// Feeds each distinct value to the wrapped accumulator only once.
pub struct DistinctAccumulator {
    inner: Box<dyn Accumulator>,
    seen: HashSet<Option<Term>>,
}

impl DistinctAccumulator {
    #[must_use]
    pub fn new(inner: Box<dyn Accumulator>) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }
}

impl Accumulator for DistinctAccumulator {
    fn expression(&self) -> &Expression {
        self.inner.expression()
    }

    fn accumulate_value(&mut self, value: Option<Term>) {
        if self.seen.insert(value.clone()) {
            self.inner.accumulate_value(value);
        }
    }

    fn accumulated_result(&self) -> Option<Term> {
        self.inner.accumulated_result()
    }
}

impl std::fmt::Debug for DistinctAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistinctAccumulator")
            .field("expression", self.inner.expression())
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}

/// The aggregate functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed to rebuild aggregates per group
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
}

/// An aggregate request: a function over an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed to rebuild aggregates per group
pub struct Aggregate {
    pub function: AggregateFunction,
    pub expression: Expression,
    pub distinct: bool,
}

impl Aggregate {
    #[must_use]
    pub const fn new(function: AggregateFunction, expression: Expression) -> Self {
        Self {
            function,
            expression,
            distinct: false,
        }
    }

    #[must_use]
    pub const fn count(expression: Expression) -> Self {
        Self::new(AggregateFunction::Count, expression)
    }

    /// `COUNT(*)`: every solution counts.
    #[must_use]
    pub fn count_all() -> Self {
        Self::count(Expression::constant(Term::boolean(true)))
    }

    #[must_use]
    pub const fn sum(expression: Expression) -> Self {
        Self::new(AggregateFunction::Sum, expression)
    }

    #[must_use]
    pub const fn avg(expression: Expression) -> Self {
        Self::new(AggregateFunction::Avg, expression)
    }

    #[must_use]
    pub const fn min(expression: Expression) -> Self {
        Self::new(AggregateFunction::Min, expression)
    }

    #[must_use]
    pub const fn max(expression: Expression) -> Self {
        Self::new(AggregateFunction::Max, expression)
    }

    #[must_use]
    pub const fn sample(expression: Expression) -> Self {
        Self::new(AggregateFunction::Sample, expression)
    }

    #[must_use]
    pub fn group_concat(expression: Expression, separator: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::GroupConcat {
                separator: separator.into(),
            },
            expression,
        )
    }

    /// Only feed distinct values.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// A fresh accumulator for one group.
    #[must_use]
    pub fn accumulator(&self, comparer: TermComparer) -> Box<dyn Accumulator> {
        let expression = self.expression.clone();
        let accumulator: Box<dyn Accumulator> = match &self.function {
            AggregateFunction::Count => Box::new(CountAccumulator::new(expression)),
            AggregateFunction::Sum => Box::new(SumAccumulator::new(expression)),
            AggregateFunction::Avg => Box::new(AvgAccumulator::new(expression)),
            AggregateFunction::Min => Box::new(ExtremumAccumulator::min(expression, comparer)),
            AggregateFunction::Max => Box::new(ExtremumAccumulator::max(expression, comparer)),
            AggregateFunction::Sample => Box::new(SampleAccumulator::new(expression)),
            AggregateFunction::GroupConcat { separator } => {
                Box::new(GroupConcatAccumulator::new(expression, separator.as_str()))
            }
        };
        if self.distinct {
            Box::new(DistinctAccumulator::new(accumulator))
        } else {
            accumulator
        }
    }
}
