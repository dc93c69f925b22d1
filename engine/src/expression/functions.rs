//! The function catalog.
//!
//! Functions are looked up by case-insensitive name at evaluation time. The
//! evaluator only knows the [`Function`] contract, so new functions are added
//! by registering them, never by extending [`super::Expression`].

use std::collections::HashMap;

use super::ExpressionError;
use crate::query::EvaluationContext;
use crate::types::Term;

/// A named scalar function.
pub trait Function {
    fn call(
        &self,
        arguments: &[Term],
        context: &EvaluationContext<'_>,
    ) -> Result<Term, ExpressionError>;
}

impl<F> Function for F
where
    F: Fn(&[Term], &EvaluationContext<'_>) -> Result<Term, ExpressionError>,
{
    fn call(
        &self,
        arguments: &[Term],
        context: &EvaluationContext<'_>,
    ) -> Result<Term, ExpressionError> {
        self(arguments, context)
    }
}

/// Maps function names to implementations.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn Function>>,
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in string and term functions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("STR", str_fn);
        registry.register("STRLEN", strlen);
        registry.register("UCASE", ucase);
        registry.register("LCASE", lcase);
        registry.register("CONCAT", concat);
        registry.register("ISIRI", is_iri);
        registry.register("ISURI", is_iri);
        registry.register("ISBLANK", is_blank);
        registry.register("ISLITERAL", is_literal);
        registry.register("BNODE", bnode);
        registry
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, function: impl Function + 'static) {
        self.functions
            .insert(name.to_ascii_uppercase(), Box::new(function));
    }

    /// Look up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions
            .get(&name.to_ascii_uppercase())
            .map(Box::as_ref)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

const BNODE_COUNTER_KEY: &str = "BNODE.counter";
const BNODE_LABELS_KEY: &str = "BNODE.labels";

fn expect_arity(
    function: &str,
    arguments: &[Term],
    expected: usize,
) -> Result<(), ExpressionError> {
    if arguments.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::ArgumentCount {
            function: function.to_owned(),
            expected,
            actual: arguments.len(),
        })
    }
}

/// Lexical form of an IRI or literal.
fn lexical_form<'t>(function: &str, term: &'t Term) -> Result<&'t str, ExpressionError> {
    match term {
        Term::Iri(iri) => Ok(iri),
        Term::Literal(literal) => Ok(&literal.value),
        _ => Err(ExpressionError::TypeMismatch(format!(
            "{function} is not defined for {term}"
        ))),
    }
}

/// Rebuild a string literal keeping the language tag of `like`.
fn string_like(value: String, like: &Term) -> Term {
    match like.as_literal().and_then(|l| l.language.as_deref()) {
        Some(language) => Term::lang_literal(value, language),
        None => Term::literal(value),
    }
}

fn string_argument<'t>(function: &str, term: &'t Term) -> Result<&'t str, ExpressionError> {
    match term.as_literal() {
        Some(literal)
            if literal.language.is_some()
                || literal.datatype == crate::types::term::XSD_STRING =>
        {
            Ok(&literal.value)
        }
        _ => Err(ExpressionError::TypeMismatch(format!(
            "{function} expects a string literal, got {term}"
        ))),
    }
}

fn str_fn(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("STR", arguments, 1)?;
    Ok(Term::literal(lexical_form("STR", &arguments[0])?))
}

fn strlen(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("STRLEN", arguments, 1)?;
    let value = string_argument("STRLEN", &arguments[0])?;
    let length = i64::try_from(value.chars().count()).unwrap_or(i64::MAX);
    Ok(Term::integer(length))
}

fn ucase(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("UCASE", arguments, 1)?;
    let value = string_argument("UCASE", &arguments[0])?;
    Ok(string_like(value.to_uppercase(), &arguments[0]))
}

fn lcase(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("LCASE", arguments, 1)?;
    let value = string_argument("LCASE", &arguments[0])?;
    Ok(string_like(value.to_lowercase(), &arguments[0]))
}

fn concat(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    let mut out = String::new();
    let mut language: Option<&str> = None;
    for (i, argument) in arguments.iter().enumerate() {
        out.push_str(string_argument("CONCAT", argument)?);
        let tag = argument.as_literal().and_then(|l| l.language.as_deref());
        // The result keeps a language tag only if every argument shares it.
        language = if i == 0 {
            tag
        } else if language == tag {
            language
        } else {
            None
        };
    }
    Ok(match language {
        Some(language) => Term::lang_literal(out, language),
        None => Term::literal(out),
    })
}

fn is_iri(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("ISIRI", arguments, 1)?;
    Ok(Term::boolean(arguments[0].is_iri()))
}

fn is_blank(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("ISBLANK", arguments, 1)?;
    Ok(Term::boolean(arguments[0].is_blank_node()))
}

fn is_literal(arguments: &[Term], _: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    expect_arity("ISLITERAL", arguments, 1)?;
    Ok(Term::boolean(arguments[0].is_literal()))
}

/// `BNODE()` mints a fresh blank node per call. `BNODE(label)` returns the
/// same blank node for the same label within one query.
///
/// Both forms keep their state in the context's side channel, so two queries
/// never share labels.
fn bnode(arguments: &[Term], context: &EvaluationContext<'_>) -> Result<Term, ExpressionError> {
    let fresh = || {
        let n = context.update_state(BNODE_COUNTER_KEY, |counter: &mut u64| {
            *counter += 1;
            *counter
        });
        format!("bnode{n}")
    };
    match arguments {
        [] => Ok(Term::blank(fresh())),
        [label] => {
            let label = string_argument("BNODE", label)?.to_owned();
            let existing = context.update_state(
                BNODE_LABELS_KEY,
                |labels: &mut HashMap<String, String>| labels.get(&label).cloned(),
            );
            if let Some(existing) = existing {
                return Ok(Term::blank(existing));
            }
            let minted = fresh();
            context.update_state(
                BNODE_LABELS_KEY,
                |labels: &mut HashMap<String, String>| {
                    labels.insert(label, minted.clone());
                },
            );
            Ok(Term::blank(minted))
        }
        _ => Err(ExpressionError::ArgumentCount {
            function: "BNODE".to_owned(),
            expected: 1,
            actual: arguments.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryOptions;
    use crate::store::MemoryStore;

    fn call(
        registry: &FunctionRegistry,
        context: &EvaluationContext<'_>,
        name: &str,
        arguments: &[Term],
    ) -> Result<Term, ExpressionError> {
        registry
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_owned()))?
            .call(arguments, context)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.get("strlen").is_some());
        assert!(registry.get("StrLen").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_string_functions() {
        let registry = FunctionRegistry::with_builtins();
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());

        assert_eq!(
            call(&registry, &ctx, "STR", &[Term::iri("http://a")]),
            Ok(Term::literal("http://a"))
        );
        assert_eq!(
            call(&registry, &ctx, "STRLEN", &[Term::literal("héllo")]),
            Ok(Term::integer(5))
        );
        assert_eq!(
            call(&registry, &ctx, "UCASE", &[Term::lang_literal("chat", "fr")]),
            Ok(Term::lang_literal("CHAT", "fr"))
        );
        assert_eq!(
            call(
                &registry,
                &ctx,
                "CONCAT",
                &[Term::lang_literal("a", "en"), Term::literal("b")]
            ),
            Ok(Term::literal("ab"))
        );
        assert!(matches!(
            call(&registry, &ctx, "STRLEN", &[Term::integer(1)]),
            Err(ExpressionError::TypeMismatch(_))
        ));
        assert!(matches!(
            call(&registry, &ctx, "LCASE", &[]),
            Err(ExpressionError::ArgumentCount { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_bnode_state_is_per_context() {
        let registry = FunctionRegistry::with_builtins();
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());

        let first = call(&registry, &ctx, "BNODE", &[]).unwrap();
        let second = call(&registry, &ctx, "BNODE", &[]).unwrap();
        assert_ne!(first, second);

        let x1 = call(&registry, &ctx, "BNODE", &[Term::literal("x")]).unwrap();
        let x2 = call(&registry, &ctx, "BNODE", &[Term::literal("x")]).unwrap();
        let y = call(&registry, &ctx, "BNODE", &[Term::literal("y")]).unwrap();
        assert_eq!(x1, x2);
        assert_ne!(x1, y);

        // A fresh context starts counting again.
        let other = EvaluationContext::new(&store, QueryOptions::default());
        assert_eq!(call(&registry, &other, "BNODE", &[]).unwrap(), first);
    }

    #[test]
    fn test_closures_can_be_registered() {
        let mut registry = FunctionRegistry::new();
        registry.register(
            "answer",
            |_: &[Term], _: &EvaluationContext<'_>| -> Result<Term, ExpressionError> {
                Ok(Term::integer(42))
            },
        );
        let store = MemoryStore::new();
        let ctx = EvaluationContext::new(&store, QueryOptions::default());
        assert_eq!(call(&registry, &ctx, "ANSWER", &[]), Ok(Term::integer(42)));
    }
}
