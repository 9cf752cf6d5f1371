//! Nokogiri-style node handles and query entry points.
//!
//! [`Node`] pairs a [`Document`] reference with a [`NodeId`]; [`NodeSet`] is
//! an ordered collection of nodes as returned by queries. Both are cheap,
//! read-only views. The `xpath`/`css`/`at_xpath`/`at_css` methods use the
//! process-wide [`ValidationCache::global`]; `search_with` takes an
//! explicit cache.
//!
//! ```
//! use xmlguard::Document;
//!
//! let doc = Document::parse_str(
//!     "<library><book class='fiction'><title>Dune</title></book></library>",
//! ).unwrap();
//!
//! let book = doc.at_css("book.fiction").unwrap().unwrap();
//! assert_eq!(book.at_xpath("title").unwrap().unwrap().text(), "Dune");
//! assert_eq!(book.path(), "/library/book");
//! ```

use std::fmt;
use std::ops::Index;

use crate::error::ParseDiagnostic;
use crate::query::{self, QueryError, QueryKind, ValidationCache};
use crate::serial;
use crate::tree::{Document, NodeId, NodeKind};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node in a parsed document.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind().type_name())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

impl<'a> Node<'a> {
    /// Wraps `id` from `doc`.
    #[must_use]
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<Node<'a>> {
        id.map(|id| Node::new(self.doc, id))
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    #[must_use]
    pub fn kind(&self) -> &'a NodeKind {
        &self.doc.node(self.id).kind
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        self.doc.is_element(self.id)
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text { .. } | NodeKind::CData { .. })
    }

    /// The element, attribute or processing-instruction name; `None` for
    /// other node kinds.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.doc.node_name(self.id)
    }

    /// The text content: concatenated descendant text for elements, the
    /// value for attributes and character data.
    #[must_use]
    pub fn text(&self) -> String {
        self.doc.text_content(self.id)
    }

    /// Whether this is a text node holding only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.is_text()
            && self
                .doc
                .node_text(self.id)
                .is_some_and(|t| t.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')))
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc.attribute(self.id, name)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attribute `(name, value)` pairs in document order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'a str, &'a str)> {
        let doc = self.doc;
        doc.attribute_nodes(self.id)
            .iter()
            .filter_map(|&a| Some((doc.node_name(a)?, doc.node_text(a)?)))
            .collect()
    }

    /// All child nodes.
    #[must_use]
    pub fn children(&self) -> NodeSet<'a> {
        NodeSet::from_ids(self.doc, &self.doc.children(self.id).collect::<Vec<_>>())
    }

    /// Child elements only.
    #[must_use]
    pub fn element_children(&self) -> NodeSet<'a> {
        let ids: Vec<NodeId> = self
            .doc
            .children(self.id)
            .filter(|&c| self.doc.is_element(c))
            .collect();
        NodeSet::from_ids(self.doc, &ids)
    }

    #[must_use]
    pub fn first_element_child(&self) -> Option<Node<'a>> {
        self.wrap(self.doc.children(self.id).find(|&c| self.doc.is_element(c)))
    }

    #[must_use]
    pub fn last_element_child(&self) -> Option<Node<'a>> {
        let mut child = self.doc.last_child(self.id);
        while let Some(c) = child {
            if self.doc.is_element(c) {
                return self.wrap(Some(c));
            }
            child = self.doc.prev_sibling(c);
        }
        None
    }

    /// The parent node; the owning element for attributes.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'a>> {
        self.wrap(self.doc.parent(self.id))
    }

    /// Ancestors from the parent up to the document node.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        doc.ancestors(self.id).skip(1).map(move |id| Node::new(doc, id))
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Node<'a>> {
        self.wrap(self.doc.next_sibling(self.id))
    }

    #[must_use]
    pub fn previous_sibling(&self) -> Option<Node<'a>> {
        self.wrap(self.doc.prev_sibling(self.id))
    }

    /// The next sibling that is an element.
    #[must_use]
    pub fn next_element(&self) -> Option<Node<'a>> {
        let doc = self.doc;
        self.wrap(
            std::iter::successors(doc.next_sibling(self.id), |&s| doc.next_sibling(s))
                .find(|&s| doc.is_element(s)),
        )
    }

    /// The previous sibling that is an element.
    #[must_use]
    pub fn previous_element(&self) -> Option<Node<'a>> {
        let doc = self.doc;
        self.wrap(
            std::iter::successors(doc.prev_sibling(self.id), |&s| doc.prev_sibling(s))
                .find(|&s| doc.is_element(s)),
        )
    }

    /// An `XPath` location path that selects this node, with positional
    /// predicates only where same-named siblings exist.
    #[must_use]
    pub fn path(&self) -> String {
        let doc = self.doc;
        let mut segments = Vec::new();
        for id in doc.ancestors(self.id) {
            let segment = match &doc.node(id).kind {
                NodeKind::Document => break,
                NodeKind::Attribute { name, .. } => format!("@{name}"),
                NodeKind::Element { name, .. } => {
                    self.step(id, name, |k| matches!(k, NodeKind::Element { name: n, .. } if n == name))
                }
                NodeKind::Text { .. } | NodeKind::CData { .. } => self.step(id, "text()", |k| {
                    matches!(k, NodeKind::Text { .. } | NodeKind::CData { .. })
                }),
                NodeKind::Comment { .. } => {
                    self.step(id, "comment()", |k| matches!(k, NodeKind::Comment { .. }))
                }
                NodeKind::ProcessingInstruction { .. } => self.step(id, "processing-instruction()", |k| {
                    matches!(k, NodeKind::ProcessingInstruction { .. })
                }),
                NodeKind::DocumentType { .. } => "node()".to_owned(),
            };
            segments.push(segment);
        }
        if segments.is_empty() {
            return "/".to_owned();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn step(&self, id: NodeId, test: &str, same: impl Fn(&NodeKind) -> bool) -> String {
        let doc = self.doc;
        let Some(parent) = doc.parent(id) else {
            return test.to_owned();
        };
        let mut index = 0;
        let mut total = 0;
        for sibling in doc.children(parent) {
            if same(&doc.node(sibling).kind) {
                total += 1;
                if sibling == id {
                    index = total;
                }
            }
        }
        if total > 1 {
            format!("{test}[{index}]")
        } else {
            test.to_owned()
        }
    }

    /// Serialized child content.
    #[must_use]
    pub fn inner_xml(&self) -> String {
        serial::serialize_children(self.doc, self.id)
    }

    /// Serialized markup of this node.
    #[must_use]
    pub fn to_xml(&self) -> String {
        serial::serialize_node(self.doc, self.id)
    }

    /// Runs a query from this node through `cache`.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn search_with(
        &self,
        cache: &ValidationCache,
        selector: &str,
        kind: QueryKind,
    ) -> Result<NodeSet<'a>, QueryError> {
        query::query(cache, self.doc, self.id, selector, kind)
    }

    /// Evaluates an `XPath` expression relative to this node.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn xpath(&self, expression: &str) -> Result<NodeSet<'a>, QueryError> {
        self.search_with(ValidationCache::global(), expression, QueryKind::XPath)
    }

    /// Matches a CSS selector. The compiled expression is root-anchored,
    /// so the result equals [`Document::css`] for the same selector.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn css(&self, selector: &str) -> Result<NodeSet<'a>, QueryError> {
        self.search_with(ValidationCache::global(), selector, QueryKind::Css)
    }

    /// The first result of [`Node::xpath`].
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn at_xpath(&self, expression: &str) -> Result<Option<Node<'a>>, QueryError> {
        Ok(self.xpath(expression)?.first())
    }

    /// The first result of [`Node::css`].
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn at_css(&self, selector: &str) -> Result<Option<Node<'a>>, QueryError> {
        Ok(self.css(selector)?.first())
    }
}

// ---------------------------------------------------------------------------
// NodeSet
// ---------------------------------------------------------------------------

/// An ordered collection of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> NodeSet<'a> {
    /// Wraps `ids`, keeping their order.
    #[must_use]
    pub fn from_ids(doc: &'a Document, ids: &[NodeId]) -> Self {
        Self {
            nodes: ids.iter().map(|&id| Node::new(doc, id)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Node<'a>> {
        self.nodes.get(index).copied()
    }

    #[must_use]
    pub fn first(&self) -> Option<Node<'a>> {
        self.nodes.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Node<'a>> {
        self.nodes.last().copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node<'a>> {
        self.nodes.iter()
    }

    /// Concatenated text of every node.
    #[must_use]
    pub fn text(&self) -> String {
        self.nodes.iter().map(Node::text).collect()
    }

    /// Concatenated serialized content of every node.
    #[must_use]
    pub fn inner_xml(&self) -> String {
        self.nodes.iter().map(Node::inner_xml).collect()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Node<'a>> {
        self.nodes.clone()
    }

    /// The node ids, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(Node::id).collect()
    }
}

impl<'a> Index<usize> for NodeSet<'a> {
    type Output = Node<'a>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for NodeSet<'a> {
    type Item = Node<'a>;
    type IntoIter = std::vec::IntoIter<Node<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'s, 'a> IntoIterator for &'s NodeSet<'a> {
    type Item = &'s Node<'a>;
    type IntoIter = std::slice::Iter<'s, Node<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

// ---------------------------------------------------------------------------
// Document entry points
// ---------------------------------------------------------------------------

impl Document {
    /// The document node wrapped as a [`Node`].
    #[must_use]
    pub fn document_node(&self) -> Node<'_> {
        Node::new(self, self.root())
    }

    /// The root element wrapped as a [`Node`].
    #[must_use]
    pub fn root_node(&self) -> Option<Node<'_>> {
        self.root_element().map(|id| Node::new(self, id))
    }

    /// The text content of the whole document.
    #[must_use]
    pub fn text(&self) -> String {
        self.text_content(self.root())
    }

    /// Serializes the document with an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        serial::serialize(self)
    }

    /// Non-fatal diagnostics collected while parsing.
    #[must_use]
    pub fn errors(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// Runs a query from the document node through `cache`.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn search_with(
        &self,
        cache: &ValidationCache,
        selector: &str,
        kind: QueryKind,
    ) -> Result<NodeSet<'_>, QueryError> {
        self.document_node().search_with(cache, selector, kind)
    }

    /// Evaluates an `XPath` expression from the document node.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn xpath(&self, expression: &str) -> Result<NodeSet<'_>, QueryError> {
        self.document_node().xpath(expression)
    }

    /// Matches a CSS selector against the whole document.
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn css(&self, selector: &str) -> Result<NodeSet<'_>, QueryError> {
        self.document_node().css(selector)
    }

    /// The first result of [`Document::xpath`].
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn at_xpath(&self, expression: &str) -> Result<Option<Node<'_>>, QueryError> {
        self.document_node().at_xpath(expression)
    }

    /// The first result of [`Document::css`].
    ///
    /// # Errors
    ///
    /// See [`query::query`].
    pub fn at_css(&self, selector: &str) -> Result<Option<Node<'_>>, QueryError> {
        self.document_node().at_css(selector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XML: &str = r#"<library>
  <book id="b1" lang="en"><title>Dune</title></book>
  <!-- note -->
  <book id="b2"><title>Emma</title><title>Persuasion</title></book>
</library>"#;

    fn doc() -> Document {
        Document::parse_str(XML).unwrap()
    }

    #[test]
    fn test_navigation() {
        let doc = doc();
        let library = doc.root_node().unwrap();
        assert_eq!(library.name(), Some("library"));
        assert_eq!(library.element_children().len(), 2);
        assert_eq!(library.children().len(), 7);

        let first = library.first_element_child().unwrap();
        let last = library.last_element_child().unwrap();
        assert_eq!(first.attribute("id"), Some("b1"));
        assert_eq!(first.next_element(), Some(last));
        assert_eq!(last.previous_element(), Some(first));
        assert!(first.next_sibling().unwrap().is_blank());
        assert_eq!(first.parent(), Some(library));
        assert_eq!(first.ancestors().count(), 2);
    }

    #[test]
    fn test_attributes() {
        let doc = doc();
        let book = doc.at_xpath("//book").unwrap().unwrap();
        assert_eq!(book.attributes(), vec![("id", "b1"), ("lang", "en")]);
        assert!(book.has_attribute("lang"));
        assert!(!book.has_attribute("class"));
        let attr = doc.at_xpath("//book/@lang").unwrap().unwrap();
        assert_eq!(attr.text(), "en");
        assert_eq!(attr.parent(), Some(book));
    }

    #[test]
    fn test_paths() {
        let doc = doc();
        assert_eq!(doc.document_node().path(), "/");
        let persuasion = doc.at_xpath("//title[. = 'Persuasion']").unwrap().unwrap();
        assert_eq!(persuasion.path(), "/library/book[2]/title[2]");
        let lang = doc.at_xpath("//@lang").unwrap().unwrap();
        assert_eq!(lang.path(), "/library/book[1]/@lang");
        let comment = doc.at_xpath("//comment()").unwrap().unwrap();
        assert_eq!(comment.path(), "/library/comment()");
        // The path selects the node it was built from.
        assert_eq!(doc.at_xpath(&persuasion.path()).unwrap(), Some(persuasion));
    }

    #[test]
    fn test_node_set_access() {
        let doc = doc();
        let titles = doc.css("title").unwrap();
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[1].text(), "Emma");
        assert_eq!(titles.get(5), None);
        assert_eq!(titles.last().unwrap().text(), "Persuasion");
        assert_eq!(titles.text(), "DuneEmmaPersuasion");
        let names: Vec<String> = titles.iter().map(Node::text).collect();
        assert_eq!(names, vec!["Dune", "Emma", "Persuasion"]);
        assert_eq!(titles.clone().into_iter().count(), 3);
        assert_eq!(titles.to_vec().len(), 3);
    }

    #[test]
    fn test_serialization() {
        let doc = doc();
        let book = doc.at_css("#b1").unwrap().unwrap();
        assert_eq!(book.inner_xml(), "<title>Dune</title>");
        assert_eq!(book.to_xml(), r#"<book id="b1" lang="en"><title>Dune</title></book>"#);
        assert_eq!(doc.css("book").unwrap().inner_xml(), "<title>Dune</title><title>Emma</title><title>Persuasion</title>");
        assert!(doc.to_xml().starts_with("<?xml"));
    }

    #[test]
    fn test_relative_queries() {
        let doc = doc();
        let second = doc.at_css("#b2").unwrap().unwrap();
        // CSS compiles to `//title` whatever the context.
        assert_eq!(second.css("title").unwrap().len(), 3);
        assert_eq!(second.xpath("title").unwrap().len(), 2);
        assert_eq!(second.at_xpath("../book[1]/title").unwrap().unwrap().text(), "Dune");
    }

    #[test]
    fn test_document_text_and_errors() {
        let doc = Document::parse_str("<a>x<b>y</b></a>").unwrap();
        assert_eq!(doc.text(), "xy");
        assert!(doc.errors().is_empty());
    }
}
