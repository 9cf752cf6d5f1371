//! Validated `XPath` and CSS queries.
//!
//! Every query passes through the same gate: CSS selectors are compiled to
//! `XPath`, the expression is checked against the [`ValidationCache`], and
//! only then handed to the evaluator. Rejections are errors, never empty
//! results.
//!
//! ```
//! use xmlguard::Document;
//! use xmlguard::query::{query, QueryKind, ValidationCache};
//!
//! let doc = Document::parse_str("<library><book/><book/></library>").unwrap();
//! let cache = ValidationCache::new();
//!
//! let books = query(&cache, &doc, doc.root(), "library > book", QueryKind::Css).unwrap();
//! assert_eq!(books.len(), 2);
//!
//! let err = query(&cache, &doc, doc.root(), "//book[@id='' or 1=1]", QueryKind::XPath)
//!     .unwrap_err();
//! assert!(err.is_input_validation());
//! ```

pub mod cache;
pub mod config;
pub mod validate;

pub use cache::ValidationCache;
pub use config::{check_limit, parse_limit, ConfigError, ValidationConfig};
pub use validate::{validate, Rule, ValidationError, Validator, MAX_NESTING_DEPTH};

use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::css::{self, CssError};
use crate::dom::{Node, NodeSet};
use crate::tree::{Document, NodeId};
use crate::xpath::{self, XPathError, XPathValue};

/// The language of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    XPath,
    Css,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::XPath => "xpath",
            Self::Css => "css",
        })
    }
}

/// A failed query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The CSS selector could not be compiled.
    #[error("invalid CSS selector: {0}")]
    InvalidSelector(#[from] CssError),
    /// The `XPath` expression was rejected by validation.
    #[error(transparent)]
    InvalidExpression(#[from] ValidationError),
    /// The evaluator failed; the message is its diagnostic.
    #[error(transparent)]
    Evaluation(#[from] XPathError),
}

impl QueryError {
    /// Whether the caller's input was rejected before evaluation.
    #[must_use]
    pub fn is_input_validation(&self) -> bool {
        matches!(self, Self::InvalidSelector(_) | Self::InvalidExpression(_))
    }

    /// The validation rule that fired, for rejected expressions.
    #[must_use]
    pub fn rule(&self) -> Option<Rule> {
        match self {
            Self::InvalidExpression(err) => Some(err.rule()),
            _ => None,
        }
    }

    /// Offset into the selector or expression, when known.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::InvalidSelector(err) => err.position(),
            Self::InvalidExpression(_) => None,
            Self::Evaluation(err) => err.position(),
        }
    }
}

/// Translates a selector into the `XPath` that will be evaluated.
///
/// CSS selectors compile to the same root-anchored `//...` expression from
/// every context node.
///
/// # Errors
///
/// Returns [`QueryError::InvalidSelector`] for malformed CSS.
pub fn to_xpath(selector: &str, kind: QueryKind) -> Result<String, QueryError> {
    match kind {
        QueryKind::XPath => Ok(selector.to_owned()),
        QueryKind::Css => Ok(css::compile(selector)?),
    }
}

/// Runs a validated query and returns the matching nodes in document order.
///
/// # Errors
///
/// Returns [`QueryError`]: `InvalidSelector` or `InvalidExpression` when
/// the input is rejected, `Evaluation` when the evaluator fails or the
/// expression does not yield a node-set.
pub fn query<'a>(
    cache: &ValidationCache,
    doc: &'a Document,
    context: NodeId,
    selector: &str,
    kind: QueryKind,
) -> Result<NodeSet<'a>, QueryError> {
    let expression = to_xpath(selector, kind)?;
    cache.check_and_cache(&expression)?;
    trace!(%kind, selector, expression = %expression, "running query");
    match xpath::evaluate(doc, context, &expression)? {
        XPathValue::NodeSet(ids) => Ok(NodeSet::from_ids(doc, &ids)),
        other => Err(QueryError::Evaluation(XPathError::TypeError {
            expected: "node-set".to_owned(),
            found: other.type_name().to_owned(),
        })),
    }
}

/// Like [`query`], returning only the first match.
///
/// # Errors
///
/// Returns the same errors as [`query`].
pub fn query_first<'a>(
    cache: &ValidationCache,
    doc: &'a Document,
    context: NodeId,
    selector: &str,
    kind: QueryKind,
) -> Result<Option<Node<'a>>, QueryError> {
    Ok(query(cache, doc, context, selector, kind)?.first())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XML: &str = "<library><book id='b1'><title>A</title></book>\
                       <shelf><book id='b2'><title>B</title></book></shelf></library>";

    #[test]
    fn test_xpath_and_css_agree() {
        let doc = Document::parse_str(XML).unwrap();
        let cache = ValidationCache::new();
        let by_css = query(&cache, &doc, doc.root(), "book title", QueryKind::Css).unwrap();
        let by_xpath = query(&cache, &doc, doc.root(), "//book//title", QueryKind::XPath).unwrap();
        assert_eq!(by_css, by_xpath);
        assert_eq!(by_css.len(), 2);
    }

    #[test]
    fn test_css_from_element_matches_compiled_xpath() {
        let doc = Document::parse_str(XML).unwrap();
        let cache = ValidationCache::new();
        let shelf = query_first(&cache, &doc, doc.root(), "shelf", QueryKind::Css)
            .unwrap()
            .unwrap();
        for selector in ["book", "shelf > book", "book title"] {
            let by_css = query(&cache, &doc, shelf.id(), selector, QueryKind::Css).unwrap();
            let compiled = css::compile(selector).unwrap();
            let by_xpath = query(&cache, &doc, shelf.id(), &compiled, QueryKind::XPath).unwrap();
            assert_eq!(by_css, by_xpath, "{selector}");
        }
        // Root-anchored: both books match, not just the shelf's.
        let books = query(&cache, &doc, shelf.id(), "book", QueryKind::Css).unwrap();
        assert_eq!(books.len(), 2);
    }

    #[test]
    fn test_error_classification() {
        let doc = Document::parse_str(XML).unwrap();
        let cache = ValidationCache::new();
        let root = doc.root();

        let err = query(&cache, &doc, root, "a[", QueryKind::Css).unwrap_err();
        assert!(err.is_input_validation());
        assert_eq!(err.position(), Some(1));

        let err = query(&cache, &doc, root, "", QueryKind::XPath).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::Empty));

        let err = query(&cache, &doc, root, "//book[", QueryKind::XPath).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::UnbalancedBrackets));

        let err = query(&cache, &doc, root, "//book/", QueryKind::XPath).unwrap_err();
        assert!(!err.is_input_validation());
        assert!(err.position().is_some());

        let err = query(&cache, &doc, root, "count(//book)", QueryKind::XPath).unwrap_err();
        assert_eq!(
            err,
            QueryError::Evaluation(XPathError::TypeError {
                expected: "node-set".into(),
                found: "number".into(),
            })
        );
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let doc = Document::parse_str(XML).unwrap();
        let cache = ValidationCache::new();
        let none = query(&cache, &doc, doc.root(), "//magazine", QueryKind::XPath).unwrap();
        assert!(none.is_empty());
        assert_eq!(
            query_first(&cache, &doc, doc.root(), "magazine", QueryKind::Css).unwrap(),
            None
        );
    }

    #[test]
    fn test_rejected_expressions_leave_cache_alone() {
        let doc = Document::parse_str(XML).unwrap();
        let cache = ValidationCache::new();
        query(&cache, &doc, doc.root(), "//book", QueryKind::XPath).unwrap();
        let _ = query(&cache, &doc, doc.root(), "document('x')", QueryKind::XPath);
        assert_eq!(cache.entries(), vec!["//book"]);
    }
}
