//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the `Document` and
//! are referenced by `NodeId`, a newtype over `NonZeroU32`. Navigation links
//! (parent, first/last child, next/previous sibling) are arena indices, so the
//! tree has no reference counting and no per-node heap allocation beyond the
//! payload strings.
//!
//! The parser allocates nodes in document order (an element, then its
//! attributes, then its content). Nodes are never reordered after parsing, so
//! comparing two `NodeId`s compares their document order. The `XPath`
//! evaluator relies on this to sort and deduplicate node-sets cheaply.

mod node;

pub use node::NodeKind;

use std::num::NonZeroU32;

use crate::error::{ParseDiagnostic, ParseError};
use crate::parser::ParseOptions;

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization), and
/// the derived ordering is document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Returns the raw `u32` value of this id (always non-zero).
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. For attributes this is the owning element.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An XML document.
///
/// The `Document` owns every node in an arena. Navigation goes through
/// `&Document`; the tree is built by the parser and is immutable afterwards,
/// which makes a parsed document safe to share across threads for querying.
///
/// # Examples
///
/// ```
/// use xmlguard::Document;
///
/// let doc = Document::parse_str("<library><book/></library>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("library"));
/// ```
#[derive(Debug)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The document node id (not the root element).
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g., "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
    /// Non-fatal diagnostics collected during parsing.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Document {
    /// Creates a new empty document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        let nodes = vec![
            // Index 0: placeholder (NodeId uses NonZeroU32)
            NodeData::new(NodeKind::Document),
            NodeData::new(NodeKind::Document),
        ];
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
            diagnostics: Vec::new(),
        }
    }

    /// Parses an XML string with default (secure) options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        Self::parse_str_with_options(input, &ParseOptions::default())
    }

    /// Parses an XML string with the given options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML or violates
    /// one of the configured limits.
    pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        crate::parser::parse_str_with_options(input, options)
    }

    /// Parses XML from raw bytes, detecting the encoding from the BOM or the
    /// XML declaration.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the resulting
    /// text is not well-formed XML.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlguard::Document;
    ///
    /// let doc = Document::parse_bytes(b"<root/>").unwrap();
    /// assert!(doc.root_element().is_some());
    /// ```
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_bytes_with_options(input, &ParseOptions::default())
    }

    /// Parses XML from raw bytes with the given options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the resulting
    /// text is not well-formed XML.
    pub fn parse_bytes_with_options(
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let text = crate::encoding::decode_to_utf8(input)
            .map_err(|e| ParseError::without_location(e.to_string()))?;
        Self::parse_str_with_options(&text, options)
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the single top-level element, if any.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.is_element(id))
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` if the node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Returns `true` if the node is an attribute.
    #[must_use]
    pub fn is_attribute(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Attribute { .. })
    }

    /// Returns the name of an element, attribute, or processing instruction.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::Attribute { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the direct text payload of a text-like or attribute node.
    ///
    /// Elements return `None`; use [`text_content`](Self::text_content).
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::Attribute { value, .. } => Some(value),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the concatenated text of a node and all its descendants.
    ///
    /// Comments and processing instructions below the node do not
    /// contribute. For attributes the value is returned.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Element { .. } | NodeKind::Document => {
                let mut result = String::new();
                self.collect_text(id, &mut result);
                result
            }
            _ => self.node_text(id).unwrap_or_default().to_owned(),
        }
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        for child in self.children(id) {
            match &self.node(child).kind {
                NodeKind::Text { content } | NodeKind::CData { content } => {
                    buf.push_str(content);
                }
                NodeKind::Element { .. } => self.collect_text(child, buf),
                _ => {}
            }
        }
    }

    /// Returns the attribute nodes of an element (empty for other nodes).
    #[must_use]
    pub fn attribute_nodes(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by name on an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_nodes(id)
            .iter()
            .find_map(|&attr| match &self.node(attr).kind {
                NodeKind::Attribute { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
    }

    // --- Navigation ---

    /// Returns the parent of a node (the owner element for attributes).
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to the
    /// document node).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns a depth-first iterator over all descendants of a node,
    /// excluding attributes.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns the total number of nodes in the arena, attributes included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    // --- Construction (parser only) ---

    /// Allocates a new node in the arena and returns its `NodeId`.
    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Appends a child node to the end of a parent's child list.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Allocates an attribute node and attaches it to `element`.
    pub(crate) fn add_attribute(&mut self, element: NodeId, name: String, value: String) -> NodeId {
        let attr = self.create_node(NodeKind::Attribute { name, value });
        self.node_mut(attr).parent = Some(element);
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(element).kind {
            attributes.push(attr);
        }
        attr
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Climb until an ancestor (below the root) has a next sibling.
        let mut cursor = current;
        loop {
            if cursor == self.root {
                self.next = None;
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(cursor) {
                self.next = Some(sibling);
                break;
            }
            match self.doc.parent(cursor) {
                Some(parent) => cursor = parent,
                None => {
                    self.next = None;
                    break;
                }
            }
        }
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, name: &str) -> NodeId {
        doc.create_node(NodeKind::Element {
            name: name.to_owned(),
            attributes: Vec::new(),
        })
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(matches!(doc.node(doc.root()).kind, NodeKind::Document));
        assert_eq!(doc.node_count(), 1);
        assert!(doc.root_element().is_none());
    }

    #[test]
    fn test_append_and_navigate() {
        let mut doc = Document::new();
        let root = doc.root();
        let library = element(&mut doc, "library");
        doc.append_child(root, library);
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        doc.append_child(library, a);
        doc.append_child(library, b);

        assert_eq!(doc.root_element(), Some(library));
        assert_eq!(doc.children(library).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(b), Some(a));
        assert_eq!(doc.parent(b), Some(library));
        assert_eq!(doc.last_child(library), Some(b));
    }

    #[test]
    fn test_attributes_are_not_children() {
        let mut doc = Document::new();
        let root = doc.root();
        let book = element(&mut doc, "book");
        doc.append_child(root, book);
        let attr = doc.add_attribute(book, "id".into(), "b1".into());

        assert_eq!(doc.attribute(book, "id"), Some("b1"));
        assert_eq!(doc.attribute(book, "missing"), None);
        assert_eq!(doc.parent(attr), Some(book));
        assert!(doc.is_attribute(attr));
        assert_eq!(doc.children(book).count(), 0);
        assert_eq!(doc.text_content(attr), "b1");
    }

    #[test]
    fn test_descendants_depth_first() {
        let doc = Document::parse_str("<a><b><c/></b><d>t</d></a>").unwrap();
        let a = doc.root_element().unwrap();
        let names: Vec<_> = doc
            .descendants(a)
            .map(|id| doc.node_name(id).unwrap_or("#text"))
            .collect();
        assert_eq!(names, vec!["b", "c", "d", "#text"]);
    }

    #[test]
    fn test_descendants_stop_at_subtree() {
        let doc = Document::parse_str("<a><b><c/></b><d/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let b = doc.children(a).next().unwrap();
        let names: Vec<_> = doc
            .descendants(b)
            .filter_map(|id| doc.node_name(id))
            .collect();
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let doc = Document::parse_str("<p>Hello <!-- x --><b>world</b></p>").unwrap();
        let p = doc.root_element().unwrap();
        assert_eq!(doc.text_content(p), "Hello world");
    }

    #[test]
    fn test_node_ids_follow_document_order() {
        let doc = Document::parse_str("<a x='1'><b y='2'/><c/></a>").unwrap();
        let ids: Vec<_> = doc.descendants(doc.root()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_ancestors_include_self() {
        let doc = Document::parse_str("<a><b><c/></b></a>").unwrap();
        let c = doc
            .descendants(doc.root())
            .find(|&id| doc.node_name(id) == Some("c"))
            .unwrap();
        let names: Vec<_> = doc.ancestors(c).filter_map(|id| doc.node_name(id)).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
