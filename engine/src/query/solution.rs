//! A single solution: variable name to optional term.

use std::collections::BTreeMap;

use crate::types::Term;

/// Prefix marking a query-internal scratch variable.
///
/// Blank-node placeholders bind slots named `_:label`; these are stripped
/// before solutions leave the engine.
pub const TEMPORARY_VARIABLE_PREFIX: &str = "_:";

/// Whether a variable name denotes a temporary slot.
#[must_use]
pub fn is_temporary_variable(name: &str) -> bool {
    name.starts_with(TEMPORARY_VARIABLE_PREFIX)
}

/// One assignment of variables to terms.
///
/// A variable may be present but map to `None` ("unbound"), which is distinct
/// from the variable being absent altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::disallowed_methods)] // Clone needed to seed joins with input rows
pub struct Solution {
    bindings: BTreeMap<String, Option<Term>>,
}

impl Solution {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Set a variable, replacing any previous value.
    pub fn add(&mut self, variable: impl Into<String>, value: Option<Term>) {
        self.bindings.insert(variable.into(), value);
    }

    /// Bind a variable to a value.
    pub fn bind(&mut self, variable: impl Into<String>, value: Term) {
        self.add(variable, Some(value));
    }

    /// Builder form of [`Self::bind`].
    #[must_use]
    pub fn with(mut self, variable: impl Into<String>, value: Term) -> Self {
        self.bind(variable, value);
        self
    }

    /// The bound value of a variable, if any.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable).and_then(Option::as_ref)
    }

    /// Whether the variable is present, bound or not.
    #[must_use]
    pub fn contains_variable(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    /// Whether the variable is present and has a value.
    #[must_use]
    pub fn is_bound(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Term>)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn remove(&mut self, variable: &str) -> Option<Term> {
        self.bindings.remove(variable).flatten()
    }

    /// Two solutions are compatible if every variable bound in both has the
    /// same value.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.bindings.iter().all(|(name, value)| {
            match (value, large.bindings.get(name).and_then(Option::as_ref)) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        })
    }

    /// Merge two compatible solutions. Bound values win over unbound ones.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &other.bindings {
            match merged.bindings.get(name) {
                Some(Some(_)) => {}
                _ => {
                    merged.bindings.insert(name.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Keep only the named variables.
    #[must_use]
    pub fn project<S: AsRef<str>>(&self, variables: &[S]) -> Self {
        let mut projected = Self::new();
        for variable in variables {
            let variable = variable.as_ref();
            if let Some(value) = self.bindings.get(variable) {
                projected.add(variable, value.clone());
            }
        }
        projected
    }

    /// Drop every temporary (blank-placeholder) slot.
    pub fn trim_temporary_variables(&mut self) {
        self.bindings.retain(|name, _| !is_temporary_variable(name));
    }
}

impl<S: Into<String>> FromIterator<(S, Term)> for Solution {
    fn from_iter<I: IntoIterator<Item = (S, Term)>>(iter: I) -> Self {
        let mut solution = Self::new();
        for (name, value) in iter {
            solution.bind(name, value);
        }
        solution
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(value) => write!(f, "?{name} = {value}")?,
                None => write!(f, "?{name} = UNDEF")?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_differs_from_absent() {
        let mut s = Solution::new();
        s.add("x", None);
        assert!(s.contains_variable("x"));
        assert!(!s.is_bound("x"));
        assert!(!s.contains_variable("y"));
        assert_eq!(s.get("x"), None);
    }

    #[test]
    fn test_compatibility() {
        let a = Solution::new().with("x", Term::integer(1));
        let b = Solution::new()
            .with("x", Term::integer(1))
            .with("y", Term::integer(2));
        let c = Solution::new().with("x", Term::integer(3));
        let mut unbound = Solution::new();
        unbound.add("x", None);

        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
        assert!(unbound.is_compatible(&c));
        assert!(Solution::new().is_compatible(&c));
    }

    #[test]
    fn test_merge_prefers_bound_values() {
        let mut left = Solution::new();
        left.add("x", None);
        let right = Solution::new()
            .with("x", Term::integer(1))
            .with("y", Term::integer(2));
        let merged = left.merge(&right);
        assert_eq!(merged.get("x"), Some(&Term::integer(1)));
        assert_eq!(merged.get("y"), Some(&Term::integer(2)));
    }

    #[test]
    fn test_trim_temporary_variables() {
        let mut s = Solution::new()
            .with("x", Term::integer(1))
            .with("_:b0", Term::integer(2));
        s.trim_temporary_variables();
        assert_eq!(s.variables().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_project_and_display() {
        let s = Solution::new()
            .with("x", Term::integer(1))
            .with("y", Term::literal("a"));
        let p = s.project(&["y", "z"]);
        assert_eq!(p.len(), 1);
        assert_eq!(
            p.to_string(),
            "{?y = \"a\"}"
        );
    }
}
