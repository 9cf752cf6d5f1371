//! Lexical and structural safety checks for `XPath` expressions.
//!
//! The checks are heuristic: they reject expressions that are oversized,
//! structurally broken, or that contain idioms commonly used in `XPath`
//! injection attacks, before the expression reaches the evaluator. They run
//! in a fixed order and the first failure wins.
//!
//! ```
//! use xmlguard::query::{validate, Rule};
//!
//! assert!(validate("//book[@id='b1']", 10_000).is_ok());
//!
//! let err = validate("//user[@name='Alice' or 1=1]", 10_000).unwrap_err();
//! assert_eq!(err.rule(), Rule::InjectionPattern);
//! ```

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::xpath::types::parse_xpath_number;

/// Maximum depth of nested `[...]` or `(...)` groups.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Function names rejected by default. They reach outside the document or
/// leak host information in `XPath` 2.0+ and XSLT processors.
pub const DEFAULT_BLOCKED_FUNCTIONS: &[&str] = &[
    "document",
    "doc",
    "collection",
    "unparsed-text",
    "system-property",
    "environment-variable",
];

/// Identifies which check rejected an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    NullByte,
    TooLong,
    Empty,
    UnbalancedQuotes,
    UnbalancedBrackets,
    ExcessiveNesting,
    CommentPattern,
    EncodedCharacters,
    DangerousFunction,
    InjectionPattern,
}

impl Rule {
    /// A short kebab-case name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NullByte => "null-byte",
            Self::TooLong => "too-long",
            Self::Empty => "empty",
            Self::UnbalancedQuotes => "unbalanced-quotes",
            Self::UnbalancedBrackets => "unbalanced-brackets",
            Self::ExcessiveNesting => "excessive-nesting",
            Self::CommentPattern => "comment-pattern",
            Self::EncodedCharacters => "encoded-characters",
            Self::DangerousFunction => "dangerous-function",
            Self::InjectionPattern => "injection-pattern",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("XPath expression contains null bytes")]
    NullByte,
    #[error("XPath expression is too long (max {max} characters)")]
    TooLong { max: usize },
    #[error("XPath expression cannot be empty")]
    Empty,
    #[error("XPath expression contains unbalanced quotes")]
    UnbalancedQuotes,
    #[error("XPath expression has unbalanced brackets or parentheses")]
    UnbalancedBrackets,
    #[error("XPath expression has excessive nesting depth")]
    ExcessiveNesting,
    #[error("XPath expression contains suspicious comment patterns")]
    CommentPattern,
    #[error("XPath expression contains encoded characters")]
    EncodedCharacters,
    #[error("XPath expression contains potentially dangerous function: {name}()")]
    DangerousFunction { name: String },
    #[error("XPath expression contains suspicious injection pattern")]
    InjectionPattern,
}

impl ValidationError {
    /// The check that fired.
    #[must_use]
    pub fn rule(&self) -> Rule {
        match self {
            Self::NullByte => Rule::NullByte,
            Self::TooLong { .. } => Rule::TooLong,
            Self::Empty => Rule::Empty,
            Self::UnbalancedQuotes => Rule::UnbalancedQuotes,
            Self::UnbalancedBrackets => Rule::UnbalancedBrackets,
            Self::ExcessiveNesting => Rule::ExcessiveNesting,
            Self::CommentPattern => Rule::CommentPattern,
            Self::EncodedCharacters => Rule::EncodedCharacters,
            Self::DangerousFunction { .. } => Rule::DangerousFunction,
            Self::InjectionPattern => Rule::InjectionPattern,
        }
    }
}

/// Validates `expr` with the default blocklist.
///
/// A `max_length` of 0 disables the length check.
///
/// # Errors
///
/// Returns the first failing check as a [`ValidationError`].
pub fn validate(expr: &str, max_length: usize) -> Result<(), ValidationError> {
    run_checks(expr, max_length, DEFAULT_BLOCKED_FUNCTIONS)
}

/// An expression validator with an extensible function blocklist.
///
/// ```
/// use xmlguard::query::{Rule, Validator};
///
/// let validator = Validator::new().with_blocked_function("key");
/// let err = validator.validate("key('k', 'v')", 0).unwrap_err();
/// assert_eq!(err.rule(), Rule::DangerousFunction);
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    blocked_functions: Vec<Cow<'static, str>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            blocked_functions: DEFAULT_BLOCKED_FUNCTIONS
                .iter()
                .map(|&name| Cow::Borrowed(name))
                .collect(),
        }
    }
}

impl Validator {
    /// Creates a validator with the default blocklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function name to the blocklist. Matching is
    /// case-insensitive.
    #[must_use]
    pub fn with_blocked_function(mut self, name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        if !self.blocked_functions.iter().any(|b| *b == name) {
            self.blocked_functions.push(Cow::Owned(name));
        }
        self
    }

    /// The blocked function names, lowercase.
    pub fn blocked_functions(&self) -> impl Iterator<Item = &str> {
        self.blocked_functions.iter().map(|name| &**name)
    }

    /// Validates `expr`. A `max_length` of 0 disables the length check.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub fn validate(&self, expr: &str, max_length: usize) -> Result<(), ValidationError> {
        run_checks(expr, max_length, &self.blocked_functions)
    }
}

fn run_checks<S: AsRef<str>>(
    expr: &str,
    max_length: usize,
    blocked: &[S],
) -> Result<(), ValidationError> {
    if expr.contains('\0') {
        return Err(ValidationError::NullByte);
    }
    if max_length != 0 && expr.chars().count() > max_length {
        return Err(ValidationError::TooLong { max: max_length });
    }
    if expr.is_empty() {
        return Err(ValidationError::Empty);
    }
    check_quotes(expr)?;
    check_nesting(expr)?;
    if expr.contains("(:") || expr.contains(":)") {
        return Err(ValidationError::CommentPattern);
    }
    if expr.contains("&#") || expr.contains("&amp;#") {
        return Err(ValidationError::EncodedCharacters);
    }
    let lower = expr.to_ascii_lowercase();
    for name in blocked {
        let name: &str = name.as_ref();
        if calls_function(&lower, name) {
            return Err(ValidationError::DangerousFunction {
                name: name.to_owned(),
            });
        }
    }
    if has_tautology(&lower) {
        return Err(ValidationError::InjectionPattern);
    }
    Ok(())
}

/// Each quote character must occur an even number of times. The count is
/// not context-aware: an apostrophe inside a double-quoted literal still
/// counts.
fn check_quotes(expr: &str) -> Result<(), ValidationError> {
    let singles = expr.bytes().filter(|&b| b == b'\'').count();
    let doubles = expr.bytes().filter(|&b| b == b'"').count();
    if singles % 2 == 0 && doubles % 2 == 0 {
        Ok(())
    } else {
        Err(ValidationError::UnbalancedQuotes)
    }
}

fn check_nesting(expr: &str) -> Result<(), ValidationError> {
    let mut brackets = 0usize;
    let mut parens = 0usize;
    for b in expr.bytes() {
        let depth = match b {
            b'[' | b']' => &mut brackets,
            b'(' | b')' => &mut parens,
            _ => continue,
        };
        if matches!(b, b'[' | b'(') {
            *depth += 1;
            if *depth > MAX_NESTING_DEPTH {
                return Err(ValidationError::ExcessiveNesting);
            }
        } else {
            *depth = depth
                .checked_sub(1)
                .ok_or(ValidationError::UnbalancedBrackets)?;
        }
    }
    if brackets == 0 && parens == 0 {
        Ok(())
    } else {
        Err(ValidationError::UnbalancedBrackets)
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

/// Whether `lower` contains `name` at a name boundary followed by optional
/// whitespace and `(`. A namespace prefix (`fn:doc(`) does not hide the
/// name.
fn calls_function(lower: &str, name: &str) -> bool {
    let bytes = lower.as_bytes();
    lower.match_indices(name).any(|(start, _)| {
        if start > 0 && is_name_byte(bytes[start - 1]) {
            return false;
        }
        let rest = lower[start + name.len()..].trim_start();
        rest.starts_with('(')
    })
}

/// Detects `or <always-true>` and `and <always-false>` where the operand is
/// `true()`/`false()` or a comparison between two literals.
fn has_tautology(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    for (keyword, wanted) in [("or", true), ("and", false)] {
        for (start, _) in lower.match_indices(keyword) {
            let end = start + keyword.len();
            let bounded_left = start == 0 || !is_name_byte(bytes[start - 1]);
            let bounded_right = bytes
                .get(end)
                .is_some_and(|&b| {
                    b.is_ascii_whitespace()
                        || b.is_ascii_digit()
                        || matches!(b, b'(' | b'\'' | b'"')
                });
            if !(bounded_left && bounded_right) {
                continue;
            }
            let operand =
                lower[end..].trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '(');
            if constant_operand(operand) == Some(wanted) {
                return true;
            }
        }
    }
    false
}

/// Evaluates the leading operand of `s` when it is constant.
fn constant_operand(s: &str) -> Option<bool> {
    for (name, value) in [("true", true), ("false", false)] {
        let call = s
            .strip_prefix(name)
            .and_then(|rest| rest.trim_start().strip_prefix('('));
        if call.is_some_and(|inner| inner.trim_start().starts_with(')')) {
            return Some(value);
        }
    }
    let (left, rest) = literal(s)?;
    let rest = rest.trim_start();
    let (negated, rest) = if let Some(r) = rest.strip_prefix("!=") {
        (true, r)
    } else {
        (false, rest.strip_prefix('=')?)
    };
    let (right, _) = literal(rest.trim_start())?;
    let equal = left.equals(&right);
    Some(equal != negated)
}

enum Literal<'a> {
    Number(f64),
    String(&'a str),
}

impl Literal<'_> {
    fn as_number(&self) -> f64 {
        match self {
            Literal::Number(n) => *n,
            Literal::String(s) => parse_xpath_number(s),
        }
    }

    #[allow(clippy::float_cmp)]
    fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => self.as_number() == other.as_number(),
        }
    }
}

/// Reads a number or quoted string literal from the start of `s`.
fn literal(s: &str) -> Option<(Literal<'_>, &str)> {
    let first = s.chars().next()?;
    if first == '\'' || first == '"' {
        let body = &s[1..];
        let close = body.find(first)?;
        return Some((Literal::String(&body[..close]), &body[close + 1..]));
    }
    let len = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    if len == 0 {
        return None;
    }
    let number = parse_xpath_number(&s[..len]);
    if number.is_nan() {
        return None;
    }
    Some((Literal::Number(number), &s[len..]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(expr: &str) -> Option<Rule> {
        validate(expr, 10_000).err().map(|e| e.rule())
    }

    #[test]
    fn test_accepts_ordinary_expressions() {
        for expr in [
            "//book",
            "/library/book[@id='b1']/title",
            "count(//book[price > 10]) + 1",
            "//book[contains(concat(' ', normalize-space(@class), ' '), ' fiction ')]",
            "//a[@x='1' or @y='2']",
            "//order[total = 1]",
            "//doc-info",
            "//p[@class=\"don't\" or @lang=\"en's\"]",
        ] {
            assert_eq!(rule(expr), None, "{expr}");
        }
    }

    #[test]
    fn test_null_byte_checked_first() {
        assert_eq!(rule("\0"), Some(Rule::NullByte));
        let long = format!("{}\0", "a".repeat(20));
        assert_eq!(validate(&long, 5).unwrap_err(), ValidationError::NullByte);
    }

    #[test]
    fn test_length_limit() {
        let expr = "a".repeat(10_001);
        assert_eq!(
            validate(&expr, 10_000).unwrap_err(),
            ValidationError::TooLong { max: 10_000 }
        );
        assert!(validate(&expr, 0).is_ok());
        assert!(validate(&"a".repeat(10_000), 10_000).is_ok());
        // Characters, not bytes.
        assert!(validate("ééé", 3).is_ok());
    }

    #[test]
    fn test_empty() {
        let err = validate("", 0).unwrap_err();
        assert_eq!(err, ValidationError::Empty);
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_quotes() {
        assert_eq!(rule("//a[@b='c]"), Some(Rule::UnbalancedQuotes));
        assert_eq!(rule("//a[@b=\"c]"), Some(Rule::UnbalancedQuotes));
        // Simple counting rejects an apostrophe inside a double-quoted literal.
        assert_eq!(rule("//a[@b=\"it's\"]"), Some(Rule::UnbalancedQuotes));
    }

    #[test]
    fn test_brackets() {
        assert_eq!(rule("//a[1"), Some(Rule::UnbalancedBrackets));
        assert_eq!(rule("//a]["), Some(Rule::UnbalancedBrackets));
        assert_eq!(rule("count(//a"), Some(Rule::UnbalancedBrackets));
        assert_eq!(rule("count(//a))("), Some(Rule::UnbalancedBrackets));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("//a{}{}", "[b".repeat(100), "]".repeat(100));
        assert_eq!(rule(&ok), None);
        let deep = format!("//a{}{}", "[b".repeat(101), "]".repeat(101));
        assert_eq!(rule(&deep), Some(Rule::ExcessiveNesting));
        let parens = format!("{}1{}", "(".repeat(101), ")".repeat(101));
        assert_eq!(rule(&parens), Some(Rule::ExcessiveNesting));
    }

    #[test]
    fn test_comment_and_encoded() {
        assert_eq!(rule("//a(: hidden :)"), Some(Rule::CommentPattern));
        // A lone closing marker still counts.
        assert_eq!(rule("//a[(b:)]"), Some(Rule::CommentPattern));
        assert_eq!(rule("//a[@b='&#60;']"), Some(Rule::EncodedCharacters));
        assert_eq!(rule("//a[@b='&#x3C;']"), Some(Rule::EncodedCharacters));
        assert_eq!(rule("//a[@b='&amp;#60;']"), Some(Rule::EncodedCharacters));
        assert_eq!(rule("//a[@b='Q&A']"), None);
    }

    #[test]
    fn test_dangerous_functions() {
        let err = validate("document('/etc/passwd')", 0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DangerousFunction {
                name: "document".into()
            }
        );
        assert_eq!(rule("DOC ('x')"), Some(Rule::DangerousFunction));
        assert_eq!(rule("fn:unparsed-text('x')"), Some(Rule::DangerousFunction));
        assert_eq!(rule("system-property('xsl:vendor')"), Some(Rule::DangerousFunction));
        // Names only count when called.
        assert_eq!(rule("//document/doc"), None);
        assert_eq!(rule("my-doc('x')"), None);
    }

    #[test]
    fn test_custom_blocklist() {
        let validator = Validator::new().with_blocked_function("Key");
        assert!(validator.blocked_functions().any(|n| n == "key"));
        assert_eq!(
            validator.validate("key('a', 'b')", 0).unwrap_err().rule(),
            Rule::DangerousFunction
        );
        assert!(validate("key('a', 'b')", 0).is_ok());
    }

    #[test]
    fn test_injection_patterns() {
        for expr in [
            "//user[@name='Alice' or 1=1]",
            "//user[@name='Alice' OR 1=1]",
            "//user[@name='Alice' or 2 = 2]",
            "//user[@name='Alice' or 1!=2]",
            "//user[@name='' or 'x'='x']",
            "//user[@name='' or \"a\"=\"a\"]",
            "//user[@name='' or true()]",
            "//user[@name='' or (1=1)]",
            "//user[@id=1 and 1=0]",
            "//user[@id=1 and false()]",
            "//user[@id=1 and 'a'='b']",
            "//user[@name='' or'1'='1']",
            "//user[@name='' or\"x\"=\"x\"]",
            "//user[@id=1 and\"a\"=\"b\"]",
            "//user[@name='' or1=1]",
        ] {
            assert_eq!(rule(expr), Some(Rule::InjectionPattern), "{expr}");
        }
    }

    #[test]
    fn test_non_tautologies_pass() {
        for expr in [
            "//user[@name='Alice' or @id=1]",
            "//user[@id=1 and 1=1]",
            "//user[@id=1 or 1=0]",
            "//user[@id=1 or 1=10]",
            "//user[@id=1 and true()]",
            "//color[.='1=1']",
            "//floor[@n=1]",
        ] {
            assert_eq!(rule(expr), None, "{expr}");
        }
    }

    #[test]
    fn test_check_order() {
        // Quotes are checked before brackets.
        assert_eq!(rule("//a['b"), Some(Rule::UnbalancedQuotes));
        // Dangerous functions before injection heuristics.
        assert_eq!(rule("doc('x') or 1=1"), Some(Rule::DangerousFunction));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::TooLong { max: 5 }.to_string(),
            "XPath expression is too long (max 5 characters)"
        );
        assert_eq!(
            ValidationError::InjectionPattern.to_string(),
            "XPath expression contains suspicious injection pattern"
        );
        assert_eq!(Rule::ExcessiveNesting.to_string(), "excessive-nesting");
    }
}
