//! Errors raised while evaluating a query.
//!
//! Expression errors never surface here: operators downgrade them per
//! solution (a failed filter drops the solution, a failed aggregate input
//! counts as no value).

/// Errors that abort evaluation of the current operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The execution budget was exhausted. The context's timer has been
    /// stopped; the context must not be used for further evaluation.
    Timeout {
        /// The effective timeout that was exceeded.
        timeout_ms: i64,
        /// Elapsed time when the check failed.
        elapsed_ms: u64,
    },
    /// A term was requested for a variable with no bound value.
    UnboundVariable(String),
    /// A construct the evaluator cannot handle.
    Unsupported(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout {
                timeout_ms,
                elapsed_ms,
            } => write!(
                f,
                "query execution time exceeded the timeout of {timeout_ms}ms, query aborted after {elapsed_ms}ms"
            ),
            Self::UnboundVariable(name) => {
                write!(f, "unable to construct a value for ?{name}: variable is unbound")
            }
            Self::Unsupported(message) => write!(f, "unsupported: {message}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl QueryError {
    /// Whether this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = QueryError::Timeout {
            timeout_ms: 100,
            elapsed_ms: 150,
        };
        assert_eq!(
            error.to_string(),
            "query execution time exceeded the timeout of 100ms, query aborted after 150ms"
        );
        assert!(error.is_timeout());
    }

    #[test]
    fn test_other_errors_are_not_timeouts() {
        let error = QueryError::UnboundVariable("x".to_owned());
        assert_eq!(
            error.to_string(),
            "unable to construct a value for ?x: variable is unbound"
        );
        assert!(!error.is_timeout());
    }
}
