//! Scalar expressions.
//!
//! Expressions are a closed set of node variants with a single dispatch
//! operation, [`Expression::evaluate`]. Named functions are not part of this
//! enum: a [`Expression::Call`] is resolved by name against the
//! [`FunctionRegistry`] held by the evaluation context, so the function
//! catalog can grow without touching the evaluator.

mod functions;

pub use functions::{Function, FunctionRegistry};

use std::cmp::Ordering;

use crate::query::{EvaluationContext, Solution};
use crate::types::{Numeric, Term, TermComparer};

/// Errors raised by expression evaluation.
///
/// Callers treat these as "value absent" inside accumulators and propagate
/// them everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// A variable was dereferenced but has no value in the solution.
    UnboundVariable(String),
    /// An operand had the wrong type.
    TypeMismatch(String),
    /// Numeric division by zero.
    DivideByZero,
    /// No function with this name is registered.
    UnknownFunction(String),
    /// A function was called with the wrong number of arguments.
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundVariable(name) => write!(f, "variable ?{name} is unbound"),
            Self::TypeMismatch(message) => write!(f, "type mismatch: {message}"),
            Self::DivideByZero => write!(f, "division by zero"),
            Self::UnknownFunction(name) => write!(f, "unknown function: {name}"),
            Self::ArgumentCount {
                function,
                expected,
                actual,
            } => write!(
                f,
                "{function} expects {expected} argument(s), got {actual}"
            ),
        }
    }
}

impl std::error::Error for ExpressionError {}

/// A scalar expression.
///
/// Two expressions are equal iff they are structurally equal; accumulators
/// rely on this to recognise repeated aggregate requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::disallowed_methods)] // Clone needed to hand expressions to per-group accumulators
pub enum Expression {
    Constant(Term),
    Variable(String),
    /// `BOUND(?v)`.
    Bound(String),
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Equal(Box<Self>, Box<Self>),
    NotEqual(Box<Self>, Box<Self>),
    LessThan(Box<Self>, Box<Self>),
    LessThanOrEqual(Box<Self>, Box<Self>),
    GreaterThan(Box<Self>, Box<Self>),
    GreaterThanOrEqual(Box<Self>, Box<Self>),
    Add(Box<Self>, Box<Self>),
    Subtract(Box<Self>, Box<Self>),
    Multiply(Box<Self>, Box<Self>),
    Divide(Box<Self>, Box<Self>),
    /// A call into the function registry.
    Call {
        function: String,
        arguments: Vec<Self>,
    },
}

impl Expression {
    #[must_use]
    pub const fn constant(term: Term) -> Self {
        Self::Constant(term)
    }

    /// A variable reference. A leading `?` or `$` is stripped.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Variable(strip_variable_prefix(name).to_owned())
    }

    #[must_use]
    pub fn call(function: impl Into<String>, arguments: Vec<Self>) -> Self {
        Self::Call {
            function: function.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn equal(left: Self, right: Self) -> Self {
        Self::Equal(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn less_than(left: Self, right: Self) -> Self {
        Self::LessThan(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn greater_than(left: Self, right: Self) -> Self {
        Self::GreaterThan(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn add(left: Self, right: Self) -> Self {
        Self::Add(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn divide(left: Self, right: Self) -> Self {
        Self::Divide(Box::new(left), Box::new(right))
    }

    /// Evaluate against one solution.
    pub fn evaluate(
        &self,
        solution: &Solution,
        context: &EvaluationContext<'_>,
    ) -> Result<Term, ExpressionError> {
        match self {
            Self::Constant(term) => Ok(term.clone()),
            Self::Variable(name) => solution
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnboundVariable(name.clone())),
            Self::Bound(name) => Ok(Term::boolean(solution.get(name).is_some())),
            Self::Not(inner) => {
                let value = inner.evaluate_boolean(solution, context)?;
                Ok(Term::boolean(!value))
            }
            Self::And(left, right) => {
                // An error on one side is masked by `false` on the other.
                let l = left.evaluate_boolean(solution, context);
                let r = right.evaluate_boolean(solution, context);
                match (l, r) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(Term::boolean(false)),
                    (Ok(true), Ok(true)) => Ok(Term::boolean(true)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Self::Or(left, right) => {
                let l = left.evaluate_boolean(solution, context);
                let r = right.evaluate_boolean(solution, context);
                match (l, r) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(Term::boolean(true)),
                    (Ok(false), Ok(false)) => Ok(Term::boolean(false)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Self::Equal(left, right) => {
                let (l, r) = evaluate_pair(left, right, solution, context)?;
                Ok(Term::boolean(terms_equal(&l, &r)))
            }
            Self::NotEqual(left, right) => {
                let (l, r) = evaluate_pair(left, right, solution, context)?;
                Ok(Term::boolean(!terms_equal(&l, &r)))
            }
            Self::LessThan(left, right) => {
                compare(left, right, solution, context, Ordering::is_lt)
            }
            Self::LessThanOrEqual(left, right) => {
                compare(left, right, solution, context, Ordering::is_le)
            }
            Self::GreaterThan(left, right) => {
                compare(left, right, solution, context, Ordering::is_gt)
            }
            Self::GreaterThanOrEqual(left, right) => {
                compare(left, right, solution, context, Ordering::is_ge)
            }
            Self::Add(left, right) => {
                let (l, r) = numeric_pair(left, right, solution, context)?;
                Ok(l.add(r).to_term())
            }
            Self::Subtract(left, right) => {
                let (l, r) = numeric_pair(left, right, solution, context)?;
                Ok(l.subtract(r).to_term())
            }
            Self::Multiply(left, right) => {
                let (l, r) = numeric_pair(left, right, solution, context)?;
                Ok(l.multiply(r).to_term())
            }
            Self::Divide(left, right) => {
                let (l, r) = numeric_pair(left, right, solution, context)?;
                l.divide(r)
                    .map(Numeric::to_term)
                    .ok_or(ExpressionError::DivideByZero)
            }
            Self::Call {
                function,
                arguments,
            } => {
                let f = context
                    .function(function)
                    .ok_or_else(|| ExpressionError::UnknownFunction(function.clone()))?;
                let values = arguments
                    .iter()
                    .map(|argument| argument.evaluate(solution, context))
                    .collect::<Result<Vec<_>, _>>()?;
                f.call(&values, context)
            }
        }
    }

    /// Evaluate and reduce to an effective boolean value.
    pub fn evaluate_boolean(
        &self,
        solution: &Solution,
        context: &EvaluationContext<'_>,
    ) -> Result<bool, ExpressionError> {
        effective_boolean_value(&self.evaluate(solution, context)?)
    }
}

/// Strip a leading `?` or `$` from a variable name.
#[must_use]
pub fn strip_variable_prefix(name: &str) -> &str {
    name.strip_prefix('?')
        .or_else(|| name.strip_prefix('$'))
        .unwrap_or(name)
}

/// The effective boolean value of a term.
pub fn effective_boolean_value(term: &Term) -> Result<bool, ExpressionError> {
    if let Some(b) = term.as_boolean() {
        return Ok(b);
    }
    if let Some(n) = term.as_numeric() {
        let n = n.as_f64();
        return Ok(n != 0.0 && !n.is_nan());
    }
    match term.as_literal() {
        Some(literal) if literal.datatype == crate::types::term::XSD_STRING => {
            Ok(!literal.value.is_empty())
        }
        Some(literal) if literal.language.is_some() => Ok(!literal.value.is_empty()),
        _ => Err(ExpressionError::TypeMismatch(format!(
            "{term} has no effective boolean value"
        ))),
    }
}

fn terms_equal(a: &Term, b: &Term) -> bool {
    match (a.as_numeric(), b.as_numeric()) {
        (Some(_), Some(_)) => TermComparer.compare(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

fn evaluate_pair(
    left: &Expression,
    right: &Expression,
    solution: &Solution,
    context: &EvaluationContext<'_>,
) -> Result<(Term, Term), ExpressionError> {
    Ok((
        left.evaluate(solution, context)?,
        right.evaluate(solution, context)?,
    ))
}

fn numeric_pair(
    left: &Expression,
    right: &Expression,
    solution: &Solution,
    context: &EvaluationContext<'_>,
) -> Result<(Numeric, Numeric), ExpressionError> {
    let (l, r) = evaluate_pair(left, right, solution, context)?;
    match (l.as_numeric(), r.as_numeric()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExpressionError::TypeMismatch(format!(
            "cannot apply arithmetic to {l} and {r}"
        ))),
    }
}

fn compare(
    left: &Expression,
    right: &Expression,
    solution: &Solution,
    context: &EvaluationContext<'_>,
    accept: fn(Ordering) -> bool,
) -> Result<Term, ExpressionError> {
    let (l, r) = evaluate_pair(left, right, solution, context)?;
    let comparable = (l.as_numeric().is_some() && r.as_numeric().is_some())
        || (l.is_literal() && r.is_literal())
        || (l.is_iri() && r.is_iri());
    if !comparable {
        return Err(ExpressionError::TypeMismatch(format!(
            "cannot compare {l} with {r}"
        )));
    }
    Ok(Term::boolean(accept(context.comparer().compare(&l, &r))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryOptions;
    use crate::store::MemoryStore;

    fn solution() -> Solution {
        Solution::new()
            .with("n", Term::integer(4))
            .with("zero", Term::integer(0))
            .with("name", Term::literal("alice"))
    }

    #[test]
    fn test_variable_and_bound() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let s = solution();
        assert_eq!(Expression::var("?n").evaluate(&s, &ctx), Ok(Term::integer(4)));
        assert_eq!(
            Expression::var("missing").evaluate(&s, &ctx),
            Err(ExpressionError::UnboundVariable("missing".to_owned()))
        );
        assert_eq!(
            Expression::Bound("missing".to_owned()).evaluate(&s, &ctx),
            Ok(Term::boolean(false))
        );
    }

    #[test]
    fn test_arithmetic_and_divide_by_zero() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let s = solution();
        let sum = Expression::add(Expression::var("n"), Expression::constant(Term::integer(1)));
        assert_eq!(sum.evaluate(&s, &ctx), Ok(Term::integer(5)));

        let div = Expression::divide(Expression::var("n"), Expression::var("zero"));
        assert_eq!(div.evaluate(&s, &ctx), Err(ExpressionError::DivideByZero));

        let bad = Expression::add(Expression::var("n"), Expression::var("name"));
        assert!(matches!(
            bad.evaluate(&s, &ctx),
            Err(ExpressionError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_numeric_equality_crosses_datatypes() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let eq = Expression::equal(
            Expression::constant(Term::integer(2)),
            Expression::constant(Term::double(2.0)),
        );
        assert_eq!(eq.evaluate(&Solution::new(), &ctx), Ok(Term::boolean(true)));
    }

    #[test]
    fn test_and_masks_errors_with_false() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let s = solution();
        let failing = Expression::var("missing");
        let falsy = Expression::constant(Term::boolean(false));
        let and = Expression::And(Box::new(failing.clone()), Box::new(falsy));
        assert_eq!(and.evaluate(&s, &ctx), Ok(Term::boolean(false)));

        let truthy = Expression::constant(Term::boolean(true));
        let or = Expression::Or(Box::new(failing), Box::new(truthy));
        assert_eq!(or.evaluate(&s, &ctx), Ok(Term::boolean(true)));
    }

    #[test]
    fn test_comparison_rejects_mixed_kinds() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let lt = Expression::less_than(
            Expression::constant(Term::iri("http://a")),
            Expression::constant(Term::integer(1)),
        );
        assert!(lt.evaluate(&Solution::new(), &ctx).is_err());

        let lt = Expression::less_than(
            Expression::constant(Term::integer(9)),
            Expression::constant(Term::integer(10)),
        );
        assert_eq!(lt.evaluate(&Solution::new(), &ctx), Ok(Term::boolean(true)));
    }

    #[test]
    fn test_unknown_function() {
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        let call = Expression::call("NOPE", vec![]);
        assert_eq!(
            call.evaluate(&Solution::new(), &ctx),
            Err(ExpressionError::UnknownFunction("NOPE".to_owned()))
        );
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(effective_boolean_value(&Term::literal("")), Ok(false));
        assert_eq!(effective_boolean_value(&Term::literal("x")), Ok(true));
        assert_eq!(effective_boolean_value(&Term::integer(0)), Ok(false));
        assert!(effective_boolean_value(&Term::iri("http://a")).is_err());
    }
}
