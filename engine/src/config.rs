//! Query evaluation options.
//!
//! Options can be built in code or loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `ENGINE_QUERY_TIMEOUT_MS`: Timeout ceiling in milliseconds; zero or less means none (default: `180000`)
//! - `ENGINE_RIGOROUS_EVALUATION`: Check bound values and repeated variables while matching (default: `false`)
//! - `ENGINE_TRIM_TEMPORARY_VARIABLES`: Strip blank-node slots from results (default: `true`)

/// Options shared by every query a processor runs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::disallowed_methods)] // Clone needed to give each query context its own copy
pub struct QueryOptions {
    /// Ceiling on query execution time. Zero or less means no ceiling.
    pub timeout_ms: i64,
    /// Whether variables are checked against values already bound in the
    /// input, and repeated variables against each other.
    pub rigorous_evaluation: bool,
    /// Whether temporary (blank-node) slots are removed from results.
    pub trim_temporary_variables: bool,
}

/// Error returned when loading options fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            rigorous_evaluation: false,
            trim_temporary_variables: true,
        }
    }
}

impl QueryOptions {
    /// Default timeout ceiling: three minutes.
    pub const DEFAULT_TIMEOUT_MS: i64 = 180_000;

    pub const TIMEOUT_VAR: &'static str = "ENGINE_QUERY_TIMEOUT_MS";
    pub const RIGOROUS_VAR: &'static str = "ENGINE_RIGOROUS_EVALUATION";
    pub const TRIM_VAR: &'static str = "ENGINE_TRIM_TEMPORARY_VARIABLES";

    /// Load options from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load options through an arbitrary variable lookup. Unset variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            timeout_ms: load(&lookup, Self::TIMEOUT_VAR, defaults.timeout_ms, |v| {
                v.parse::<i64>().ok()
            })?,
            rigorous_evaluation: load(
                &lookup,
                Self::RIGOROUS_VAR,
                defaults.rigorous_evaluation,
                parse_bool,
            )?,
            trim_temporary_variables: load(
                &lookup,
                Self::TRIM_VAR,
                defaults.trim_temporary_variables,
                parse_bool,
            )?,
        })
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_rigorous_evaluation(mut self, rigorous: bool) -> Self {
        self.rigorous_evaluation = rigorous;
        self
    }

    #[must_use]
    pub const fn with_trim_temporary_variables(mut self, trim: bool) -> Self {
        self.trim_temporary_variables = trim;
        self
    }
}

fn load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => parse(value.trim()).ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_owned(),
            message: format!("'{value}' could not be parsed"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let options = QueryOptions::default();
        assert_eq!(options.timeout_ms, 180_000);
        assert!(!options.rigorous_evaluation);
        assert!(options.trim_temporary_variables);
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        assert_eq!(
            QueryOptions::from_lookup(lookup(&[])),
            Ok(QueryOptions::default())
        );
    }

    #[test]
    fn test_variables_override_defaults() {
        let options = QueryOptions::from_lookup(lookup(&[
            ("ENGINE_QUERY_TIMEOUT_MS", "0"),
            ("ENGINE_RIGOROUS_EVALUATION", "TRUE"),
            ("ENGINE_TRIM_TEMPORARY_VARIABLES", "off"),
        ]))
        .unwrap();
        assert_eq!(options.timeout_ms, 0);
        assert!(options.rigorous_evaluation);
        assert!(!options.trim_temporary_variables);
    }

    #[test]
    fn test_invalid_value() {
        let error = QueryOptions::from_lookup(lookup(&[("ENGINE_QUERY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for ENGINE_QUERY_TIMEOUT_MS: 'soon' could not be parsed"
        );
    }
}
