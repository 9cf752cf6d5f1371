//! Node type definitions.
//!
//! The `NodeKind` enum carries the payload for each node type in the
//! document tree. Attributes are first-class arena nodes so that `XPath`
//! node-sets and query results can hold them by `NodeId` like any other node.

use super::NodeId;

/// The kind of an XML node and its associated data.
///
/// Navigation links (parent, children, siblings) are stored in `NodeData`,
/// not here.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// An element node, e.g., `<book class="x">`.
    Element {
        /// The element's qualified name as written in the source.
        name: String,
        /// Attribute nodes owned by this element, in source order.
        attributes: Vec<NodeId>,
    },

    /// An attribute node. Its parent is the owning element; it never
    /// appears in a child list.
    Attribute {
        /// The attribute's qualified name.
        name: String,
        /// The normalized, entity-expanded value.
        value: String,
    },

    /// A text node containing character data.
    Text {
        /// The text content (character references resolved).
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text (without delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration node, e.g., `<!DOCTYPE library>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
    },
}

impl NodeKind {
    /// Returns a short lowercase name for the node type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Element { .. } => "element",
            Self::Attribute { .. } => "attribute",
            Self::Text { .. } => "text",
            Self::CData { .. } => "cdata",
            Self::Comment { .. } => "comment",
            Self::ProcessingInstruction { .. } => "processing-instruction",
            Self::DocumentType { .. } => "doctype",
        }
    }
}
