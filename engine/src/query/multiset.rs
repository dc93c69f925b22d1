//! Ordered collections of solutions.
//!
//! Besides ordinary solution lists there are two sentinels: [`Multiset::Identity`]
//! (exactly one empty solution, the unit of join) and [`Multiset::Null`] (no
//! solutions, the zero of join). Operators keep the sentinels where they can
//! so that later stages can short-circuit on them.
//!
//! Operations that may loop over a large product take a `checkpoint` closure
//! which is called once per outer row. Evaluation passes the context's
//! timeout check here, so a runaway join is interrupted promptly.

use std::collections::{BTreeSet, HashSet};

use super::solution::Solution;
use crate::types::Term;

static EMPTY_SOLUTION: Solution = Solution::new();

/// The values one variable takes across a multiset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::disallowed_methods)] // Clone needed to share a match's value sets
pub struct VariableValues {
    values: HashSet<Term>,
    /// Some solution leaves the variable unbound.
    open: bool,
}

impl VariableValues {
    /// Whether a solution could carry `value` for the variable: either some
    /// solution binds it to `value`, or some solution leaves it open.
    #[must_use]
    pub fn admits(&self, value: &Term) -> bool {
        self.open || self.values.contains(value)
    }
}

/// An ordered collection of solutions. Duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::disallowed_methods)] // Clone needed to hand the input to sub-evaluations
pub enum Multiset {
    /// One empty solution.
    Identity,
    /// No solutions.
    Null,
    /// An explicit list of solutions.
    Solutions(Vec<Solution>),
}

impl Default for Multiset {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiset {
    /// An empty, growable multiset.
    #[must_use]
    pub const fn new() -> Self {
        Self::Solutions(Vec::new())
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self::Identity
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Null
    }

    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// True for the null sentinel and for any multiset without solutions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solutions().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.solutions().len()
    }

    #[must_use]
    pub fn solutions(&self) -> &[Solution] {
        match self {
            Self::Identity => std::slice::from_ref(&EMPTY_SOLUTION),
            Self::Null => &[],
            Self::Solutions(solutions) => solutions,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Solution> {
        self.solutions().iter()
    }

    #[must_use]
    pub fn into_solutions(self) -> Vec<Solution> {
        match self {
            Self::Identity => vec![Solution::new()],
            Self::Null => Vec::new(),
            Self::Solutions(solutions) => solutions,
        }
    }

    /// Append a solution. A sentinel becomes an explicit list first.
    pub fn add(&mut self, solution: Solution) {
        match self {
            Self::Solutions(solutions) => solutions.push(solution),
            Self::Identity => *self = Self::Solutions(vec![Solution::new(), solution]),
            Self::Null => *self = Self::Solutions(vec![solution]),
        }
    }

    /// Every variable named by at least one solution, sorted.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        self.iter().flat_map(Solution::variables).collect()
    }

    /// The values the solutions bind a variable to, or `None` if no solution
    /// mentions it.
    #[must_use]
    pub fn variable_values(&self, variable: &str) -> Option<VariableValues> {
        let mut values = VariableValues::default();
        let mut mentioned = false;
        for solution in self.iter() {
            mentioned |= solution.contains_variable(variable);
            match solution.get(variable) {
                Some(value) => {
                    values.values.insert(value.clone());
                }
                None => values.open = true,
            }
        }
        mentioned.then_some(values)
    }

    /// Whether every solution binds the variable to some value.
    ///
    /// False for a multiset without solutions.
    #[must_use]
    pub fn is_bound_everywhere(&self, variable: &str) -> bool {
        !self.is_empty() && self.iter().all(|s| s.is_bound(variable))
    }

    /// The distinct tuples of values bound to several variables at once, in
    /// first-seen order. Solutions leaving any of the variables unbound are
    /// skipped.
    pub fn distinct_tuples<S: AsRef<str>, E>(
        &self,
        variables: &[S],
        mut checkpoint: impl FnMut() -> Result<(), E>,
    ) -> Result<Vec<Vec<Term>>, E> {
        let mut seen = HashSet::new();
        let mut tuples = Vec::new();
        for solution in self.iter() {
            checkpoint()?;
            let tuple: Option<Vec<&Term>> = variables
                .iter()
                .map(|v| solution.get(v.as_ref()))
                .collect();
            if let Some(tuple) = tuple
                && seen.insert(tuple.clone())
            {
                tuples.push(tuple.into_iter().cloned().collect());
            }
        }
        Ok(tuples)
    }

    /// Inner join on compatible solutions.
    pub fn join<E>(
        &self,
        other: &Self,
        mut checkpoint: impl FnMut() -> Result<(), E>,
    ) -> Result<Self, E> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => return Ok(Self::Null),
            (Self::Identity, _) => return Ok(other.clone()),
            (_, Self::Identity) => return Ok(self.clone()),
            _ => {}
        }
        let mut joined = Vec::new();
        for left in self.iter() {
            checkpoint()?;
            joined.extend(
                other
                    .iter()
                    .filter(|right| left.is_compatible(right))
                    .map(|right| left.merge(right)),
            );
        }
        Ok(Self::from(joined))
    }

    /// Left outer join. A right solution extends a left one only if they are
    /// compatible and the merged solution passes `filter`; left solutions with
    /// no extension are kept as they are.
    pub fn left_join<E>(
        &self,
        other: &Self,
        mut filter: impl FnMut(&Solution) -> bool,
        mut checkpoint: impl FnMut() -> Result<(), E>,
    ) -> Result<Self, E> {
        if matches!(self, Self::Null) {
            return Ok(Self::Null);
        }
        let mut joined = Vec::new();
        for left in self.iter() {
            checkpoint()?;
            let before = joined.len();
            for right in other.iter() {
                if !left.is_compatible(right) {
                    continue;
                }
                let merged = left.merge(right);
                if filter(&merged) {
                    joined.push(merged);
                }
            }
            if joined.len() == before {
                joined.push(left.clone());
            }
        }
        Ok(Self::from(joined))
    }

    /// Bag union.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::Null, other) => other,
            (this, Self::Null) => this,
            (this, other) => {
                let mut solutions = this.into_solutions();
                solutions.extend(other.into_solutions());
                Self::Solutions(solutions)
            }
        }
    }

    /// Remove duplicate solutions, keeping the first occurrence.
    #[must_use]
    pub fn distinct(self) -> Self {
        match self {
            Self::Solutions(solutions) => {
                let mut seen = HashSet::new();
                let unique = solutions
                    .into_iter()
                    .filter(|s| seen.insert(s.clone()))
                    .collect();
                Self::Solutions(unique)
            }
            sentinel => sentinel,
        }
    }

    /// Keep only the named variables in every solution.
    #[must_use]
    pub fn project<S: AsRef<str>>(&self, variables: &[S]) -> Self {
        match self {
            Self::Solutions(solutions) => {
                Self::Solutions(solutions.iter().map(|s| s.project(variables)).collect())
            }
            sentinel => sentinel.clone(),
        }
    }

    /// Skip `offset` solutions, then keep at most `limit`.
    #[must_use]
    pub fn slice(self, offset: usize, limit: Option<usize>) -> Self {
        let solutions = self
            .into_solutions()
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect::<Vec<_>>();
        Self::from(solutions)
    }

    /// Drop temporary variables from every solution.
    pub fn trim_temporary_variables(&mut self) {
        if let Self::Solutions(solutions) = self {
            for solution in solutions {
                solution.trim_temporary_variables();
            }
        }
    }
}

impl From<Vec<Solution>> for Multiset {
    fn from(solutions: Vec<Solution>) -> Self {
        Self::Solutions(solutions)
    }
}

impl FromIterator<Solution> for Multiset {
    fn from_iter<I: IntoIterator<Item = Solution>>(iter: I) -> Self {
        Self::Solutions(iter.into_iter().collect())
    }
}

impl<'m> IntoIterator for &'m Multiset {
    type Item = &'m Solution;
    type IntoIter = std::slice::Iter<'m, Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
