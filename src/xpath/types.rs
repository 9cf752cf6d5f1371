//! `XPath` 1.0 value type system and errors.
//!
//! The four `XPath` data types (boolean, number, string, node-set), their
//! conversions, and the number formatting rules of the `string()` function.

use std::fmt;

use thiserror::Error;

use crate::tree::NodeId;

// ---------------------------------------------------------------------------
// XPathValue
// ---------------------------------------------------------------------------

/// An `XPath` 1.0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    /// A boolean value.
    Boolean(bool),
    /// An IEEE 754 double, including NaN and the infinities.
    Number(f64),
    /// A string.
    String(String),
    /// Nodes in document order without duplicates.
    NodeSet(Vec<NodeId>),
}

impl XPathValue {
    /// Converts this value to a boolean (`XPath` 1.0 §4.3).
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    /// Converts a non-node-set value to a number (`XPath` 1.0 §4.4).
    ///
    /// Node-sets need the document to compute a string-value and yield NaN
    /// here; the evaluator converts them itself.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::String(s) => parse_xpath_number(s),
            Self::NodeSet(_) => f64::NAN,
        }
    }

    /// Converts a non-node-set value to a string (`XPath` 1.0 §4.2).
    ///
    /// Node-sets yield the empty string here; the evaluator converts them
    /// itself.
    #[must_use]
    pub fn to_xpath_string(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_xpath_number(*n),
            Self::String(s) => s.clone(),
            Self::NodeSet(_) => String::new(),
        }
    }

    /// Returns the node-set, if this value is one.
    #[must_use]
    pub fn as_node_set(&self) -> Option<&[NodeId]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Returns the `XPath` type name of this value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NodeSet(_) => "node-set",
        }
    }
}

impl fmt::Display for XPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeSet(nodes) => write!(f, "node-set({})", nodes.len()),
            other => f.write_str(&other.to_xpath_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Number formatting and parsing
// ---------------------------------------------------------------------------

/// Formats an `f64` per the `XPath` number-to-string rules.
///
/// NaN, the infinities and negative zero have fixed spellings; integral
/// values print without a decimal point.
///
/// ```
/// use xmlguard::xpath::format_xpath_number;
///
/// assert_eq!(format_xpath_number(3.0), "3");
/// assert_eq!(format_xpath_number(-0.0), "0");
/// assert_eq!(format_xpath_number(0.5), "0.5");
/// assert_eq!(format_xpath_number(f64::NAN), "NaN");
/// ```
#[must_use]
pub fn format_xpath_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n.is_sign_positive() {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        };
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    if n.fract() == 0.0 && n.abs() < 1e18 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// Parses a string as an `XPath` number: optional surrounding whitespace,
/// an optional minus sign, digits with an optional decimal point. Anything
/// else is NaN.
pub(crate) fn parse_xpath_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1;
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

// ---------------------------------------------------------------------------
// XPathError
// ---------------------------------------------------------------------------

/// An error raised while parsing or evaluating an `XPath` expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    /// The expression does not match the `XPath` 1.0 grammar.
    #[error("XPath syntax error at position {position}: {message}")]
    Syntax {
        /// What went wrong.
        message: String,
        /// 0-based byte offset in the expression.
        position: usize,
    },
    /// A function name not in the core library.
    #[error("undefined function: {0}()")]
    UndefinedFunction(String),
    /// A variable reference; no variable bindings are provided.
    #[error("undefined variable: ${0}")]
    UndefinedVariable(String),
    /// A core function called with the wrong number of arguments.
    #[error("{name}() expects {expected} argument(s), got {got}")]
    InvalidArgCount {
        /// The function name.
        name: String,
        /// The accepted arity, e.g. `"1"` or `"2 or 3"`.
        expected: String,
        /// The number of arguments supplied.
        got: usize,
    },
    /// A value of the wrong type, e.g. a predicate on a string.
    #[error("type error: expected {expected}, found {found}")]
    TypeError {
        /// The required type.
        expected: String,
        /// The type actually produced.
        found: String,
    },
}

impl XPathError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Returns the offset in the expression where a syntax error occurred.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::Number(-1.0).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        assert!(XPathValue::String("false".into()).to_boolean());
        assert!(!XPathValue::NodeSet(vec![]).to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(XPathValue::Boolean(true).to_number(), 1.0);
        assert_eq!(XPathValue::String(" 42 ".into()).to_number(), 42.0);
        assert_eq!(XPathValue::String("-1.5".into()).to_number(), -1.5);
        assert!(XPathValue::String("1e3".into()).to_number().is_nan());
        assert!(XPathValue::String("abc".into()).to_number().is_nan());
        assert!(XPathValue::String("".into()).to_number().is_nan());
        assert!(XPathValue::String(".".into()).to_number().is_nan());
    }

    #[test]
    fn test_to_xpath_string() {
        assert_eq!(XPathValue::Boolean(false).to_xpath_string(), "false");
        assert_eq!(XPathValue::Number(2.0).to_xpath_string(), "2");
        assert_eq!(XPathValue::Number(-2.25).to_xpath_string(), "-2.25");
    }

    #[test]
    fn test_format_special_values() {
        assert_eq!(format_xpath_number(f64::INFINITY), "Infinity");
        assert_eq!(format_xpath_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_xpath_number(1_000_000.0), "1000000");
    }

    #[test]
    fn test_type_name_and_display() {
        assert_eq!(XPathValue::NodeSet(vec![]).type_name(), "node-set");
        assert_eq!(XPathValue::NodeSet(vec![]).to_string(), "node-set(0)");
        assert_eq!(XPathValue::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_error_display() {
        let err = XPathError::syntax("unexpected token ']'", 4);
        assert_eq!(
            err.to_string(),
            "XPath syntax error at position 4: unexpected token ']'"
        );
        assert_eq!(err.position(), Some(4));
        assert_eq!(
            XPathError::UndefinedFunction("document".into()).to_string(),
            "undefined function: document()"
        );
        assert_eq!(XPathError::UndefinedVariable("x".into()).position(), None);
    }
}
