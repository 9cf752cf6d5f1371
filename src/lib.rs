//! # xmlguard
//!
//! A security-hardened, Nokogiri-style query front end over an XML tree.
//!
//! Queries are written in `XPath` 1.0 or a CSS3 subset. CSS is compiled to
//! `XPath`; every expression then passes a defense-in-depth validator
//! (memoized by a bounded, thread-safe LRU cache) before it reaches the
//! evaluator. Documents are parsed with external entities disabled by
//! default.
//!
//! ## Quick Start
//!
//! ```
//! use xmlguard::Document;
//!
//! let doc = Document::parse_str(
//!     "<library><book id='b1' class='fiction'/><book id='b2'/></library>",
//! ).unwrap();
//!
//! assert_eq!(doc.css("book.fiction").unwrap().len(), 1);
//! assert_eq!(doc.xpath("//book").unwrap().len(), 2);
//!
//! let err = doc.xpath("//book[@id='x' or 1=1]").unwrap_err();
//! assert!(err.is_input_validation());
//! ```

pub mod css;
pub mod dom;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod query;
pub mod serial;
pub mod tree;
pub mod xpath;

pub use dom::{Node, NodeSet};
pub use error::{ParseDiagnostic, ParseError};
pub use parser::ParseOptions;
pub use query::{QueryError, QueryKind, ValidationCache, ValidationConfig};
pub use tree::{Document, NodeId, NodeKind};
