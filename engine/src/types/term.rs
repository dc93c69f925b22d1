//! RDF term types.
//!
//! Provides the `Term` enum (IRI, blank node, literal, quoted triple), a
//! numeric view over numeric literals, and the `TermComparer` used when
//! ordering values during evaluation.
//!
//! # Ordering
//!
//! The derived total order is blank nodes < IRIs < literals < quoted triples.
//! Literals order by lexical form, then datatype, then language tag. This
//! order is used for sorting and distinctness; it is *not* value order for
//! numbers (see [`TermComparer`]).

use std::cmp::Ordering;
use std::fmt;

use super::triple::Triple;

/// `xsd:string`, the datatype of plain literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:decimal`.
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
/// `xsd:double`.
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
/// `xsd:float`.
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// `rdf:langString`, the datatype of language-tagged literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::disallowed_methods)] // Clone needed for binding terms into solutions
pub struct Literal {
    /// The lexical form.
    pub value: String,
    /// The datatype IRI.
    pub datatype: String,
    /// The language tag, if any.
    pub language: Option<String>,
}

/// An RDF term.
///
/// Terms are immutable values. Variant order matters: it defines the total
/// ordering used for sorting and distinctness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::disallowed_methods)] // Clone needed for binding terms into solutions
pub enum Term {
    /// A blank node with its label.
    BlankNode(String),
    /// An IRI.
    Iri(String),
    /// A literal.
    Literal(Literal),
    /// A quoted triple.
    Triple(Box<Triple>),
}

impl Term {
    /// Create an IRI term.
    #[must_use]
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Create a blank node term.
    #[must_use]
    pub fn blank(label: impl Into<String>) -> Self {
        Self::BlankNode(label.into())
    }

    /// Create a plain (`xsd:string`) literal.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::typed_literal(value, XSD_STRING)
    }

    /// Create a literal with an explicit datatype.
    #[must_use]
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        })
    }

    /// Create a language-tagged literal.
    ///
    /// The tag is normalised to lowercase.
    #[must_use]
    pub fn lang_literal(value: impl Into<String>, language: &str) -> Self {
        Self::Literal(Literal {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_owned(),
            language: Some(language.to_ascii_lowercase()),
        })
    }

    /// Create an `xsd:integer` literal.
    #[must_use]
    pub fn integer(n: i64) -> Self {
        Self::typed_literal(n.to_string(), XSD_INTEGER)
    }

    /// Create an `xsd:double` literal.
    #[must_use]
    pub fn double(n: f64) -> Self {
        Self::typed_literal(n.to_string(), XSD_DOUBLE)
    }

    /// Create an `xsd:boolean` literal.
    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Self::typed_literal(if b { "true" } else { "false" }, XSD_BOOLEAN)
    }

    /// Create a quoted triple term.
    #[must_use]
    pub fn triple(triple: Triple) -> Self {
        Self::Triple(Box::new(triple))
    }

    #[must_use]
    pub const fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    #[must_use]
    pub const fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Get the quoted triple if this term is one.
    #[must_use]
    pub fn as_triple(&self) -> Option<&Triple> {
        match self {
            Self::Triple(t) => Some(t),
            _ => None,
        }
    }

    /// Get the literal if this term is one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Get the numeric value of a numeric literal.
    ///
    /// Returns `None` for non-literals, non-numeric datatypes and lexical
    /// forms that do not parse.
    #[must_use]
    pub fn as_numeric(&self) -> Option<Numeric> {
        let literal = self.as_literal()?;
        match literal.datatype.as_str() {
            XSD_INTEGER => literal.value.trim().parse().ok().map(Numeric::Integer),
            XSD_DECIMAL | XSD_DOUBLE | XSD_FLOAT => {
                literal.value.trim().parse().ok().map(Numeric::Double)
            }
            _ => None,
        }
    }

    /// Get the value of an `xsd:boolean` literal.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        let literal = self.as_literal()?;
        if literal.datatype != XSD_BOOLEAN {
            return None;
        }
        match literal.value.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::BlankNode(label) => write!(f, "_:{label}"),
            Self::Literal(Literal {
                value,
                language: Some(lang),
                ..
            }) => write!(f, "\"{value}\"@{lang}"),
            Self::Literal(Literal {
                value, datatype, ..
            }) => {
                if datatype == XSD_STRING {
                    write!(f, "\"{value}\"")
                } else {
                    write!(f, "\"{value}\"^^<{datatype}>")
                }
            }
            Self::Triple(t) => write!(f, "<< {t} >>"),
        }
    }
}

/// A numeric view of a literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Double(f64),
}

impl Numeric {
    /// Widen to a double.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Integer literals beyond 2^53 lose precision, as in xsd
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Integer(n) => n as f64,
            Self::Double(n) => n,
        }
    }

    /// Convert back to a literal term.
    #[must_use]
    pub fn to_term(self) -> Term {
        match self {
            Self::Integer(n) => Term::integer(n),
            Self::Double(n) => Term::double(n),
        }
    }

    /// Add, staying integral while both sides are integers and no overflow occurs.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_add(b)
                .map_or_else(|| Self::Double(self.as_f64() + other.as_f64()), Self::Integer),
            _ => Self::Double(self.as_f64() + other.as_f64()),
        }
    }

    /// Subtract, staying integral while possible.
    #[must_use]
    pub fn subtract(self, other: Self) -> Self {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_sub(b)
                .map_or_else(|| Self::Double(self.as_f64() - other.as_f64()), Self::Integer),
            _ => Self::Double(self.as_f64() - other.as_f64()),
        }
    }

    /// Multiply, staying integral while possible.
    #[must_use]
    pub fn multiply(self, other: Self) -> Self {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_mul(b)
                .map_or_else(|| Self::Double(self.as_f64() * other.as_f64()), Self::Integer),
            _ => Self::Double(self.as_f64() * other.as_f64()),
        }
    }

    /// Divide. Returns `None` when dividing by zero.
    #[must_use]
    pub fn divide(self, other: Self) -> Option<Self> {
        if other.as_f64() == 0.0 {
            return None;
        }
        Some(Self::Double(self.as_f64() / other.as_f64()))
    }

    fn compare(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Compares terms during evaluation.
///
/// Numeric literals compare by value. Everything else (and incomparable
/// numbers such as NaN) falls back to the total term order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermComparer;

impl TermComparer {
    /// Compare two terms.
    #[must_use]
    pub fn compare(self, a: &Term, b: &Term) -> Ordering {
        if let (Some(x), Some(y)) = (a.as_numeric(), b.as_numeric())
            && let Some(ordering) = x.compare(y)
        {
            return ordering;
        }
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order_by_kind() {
        let blank = Term::blank("b");
        let iri = Term::iri("http://example.org/a");
        let literal = Term::literal("a");
        let quoted = Term::triple(Triple::new(
            Term::iri("s"),
            Term::iri("p"),
            Term::iri("o"),
        ));
        assert!(blank < iri);
        assert!(iri < literal);
        assert!(literal < quoted);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Term::integer(42).as_numeric(), Some(Numeric::Integer(42)));
        assert_eq!(Term::double(1.5).as_numeric(), Some(Numeric::Double(1.5)));
        assert_eq!(Term::literal("42").as_numeric(), None);
        assert_eq!(Term::iri("http://x").as_numeric(), None);
    }

    #[test]
    fn test_comparer_orders_numbers_by_value() {
        let comparer = TermComparer;
        // Lexically "10" < "9", numerically it is the other way round.
        assert_eq!(
            comparer.compare(&Term::integer(10), &Term::integer(9)),
            Ordering::Greater
        );
        assert_eq!(
            comparer.compare(&Term::integer(2), &Term::double(2.5)),
            Ordering::Less
        );
        assert_eq!(
            comparer.compare(&Term::literal("a"), &Term::literal("b")),
            Ordering::Less
        );
    }

    #[test]
    fn test_integer_arithmetic_overflow_widens() {
        let big = Numeric::Integer(i64::MAX);
        assert!(matches!(big.add(Numeric::Integer(1)), Numeric::Double(_)));
        assert_eq!(
            Numeric::Integer(2).add(Numeric::Integer(3)),
            Numeric::Integer(5)
        );
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(Numeric::Integer(1).divide(Numeric::Integer(0)), None);
        assert_eq!(
            Numeric::Integer(1).divide(Numeric::Integer(2)),
            Some(Numeric::Double(0.5))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::iri("http://a").to_string(), "<http://a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::literal("x").to_string(), "\"x\"");
        assert_eq!(Term::lang_literal("chat", "FR").to_string(), "\"chat\"@fr");
        assert_eq!(
            Term::integer(3).to_string(),
            format!("\"3\"^^<{XSD_INTEGER}>")
        );
    }

    #[test]
    fn test_boolean_view() {
        assert_eq!(Term::boolean(true).as_boolean(), Some(true));
        assert_eq!(Term::literal("true").as_boolean(), None);
    }
}
