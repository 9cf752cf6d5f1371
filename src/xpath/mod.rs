//! `XPath` 1.0 query language.
//!
//! Expression parsing and evaluation against a [`Document`] tree, following
//! <https://www.w3.org/TR/xpath-10/>.
//!
//! # Quick Start
//!
//! ```
//! use xmlguard::Document;
//! use xmlguard::xpath::{evaluate, XPathValue};
//!
//! let doc = Document::parse_str("<root><a>1</a><b>2</b></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! let result = evaluate(&doc, root, "count(*)").unwrap();
//! assert_eq!(result, XPathValue::Number(2.0));
//! ```
//!
//! # Known Limitations
//!
//! - Namespaces are not processed; the `namespace::` axis is always empty,
//!   `namespace-uri()` returns `""` and prefixed names match literally.
//! - Variable references are parsed but no bindings exist, so evaluating
//!   one fails with [`XPathError::UndefinedVariable`].
//!
//! # Submodules
//!
//! - [`ast`]: syntax tree types.
//! - [`lexer`]: tokenizer.
//! - [`types`]: value types and errors.
//! - [`parser`]: recursive descent parser.
//! - [`eval`]: evaluator.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod types;

pub use eval::XPathContext;
pub use types::{format_xpath_number, XPathError, XPathValue};

use tracing::trace;

use crate::tree::{Document, NodeId};

/// Parses and evaluates an `XPath` 1.0 expression against a context node.
///
/// To evaluate one expression against many context nodes, parse it once
/// with [`parser::parse`] and call [`XPathContext::evaluate`].
///
/// ```
/// use xmlguard::Document;
/// use xmlguard::xpath::evaluate;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// let result = evaluate(&doc, root, "string(child)").unwrap();
/// assert_eq!(result.to_xpath_string(), "Hello");
/// ```
///
/// # Errors
///
/// Returns [`XPathError`] if the expression is malformed or evaluation fails.
pub fn evaluate(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
) -> Result<XPathValue, XPathError> {
    let expr = parser::parse(expression)?;
    let value = XPathContext::new(doc, context_node).evaluate(&expr)?;
    trace!(expression, result = %value, "evaluated xpath");
    Ok(value)
}
