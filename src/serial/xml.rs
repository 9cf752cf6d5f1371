//! XML serializer.
//!
//! Writes a `Document`, or any node inside it, back out as XML text.

use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// ```
/// use xmlguard::Document;
/// use xmlguard::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented output. Defaults to `false`.
    pub indent: bool,
    /// The indentation string per level when `indent` is on.
    pub indent_str: String,
    /// Whether whole-document output starts with an XML declaration.
    /// Defaults to `true`.
    pub xml_declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_owned(),
            xml_declaration: true,
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented output.
    ///
    /// Elements with mixed content are never indented internally, so their
    /// text is preserved exactly.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_owned();
        self
    }

    /// Enables or disables the leading XML declaration.
    #[must_use]
    pub fn xml_declaration(mut self, yes: bool) -> Self {
        self.xml_declaration = yes;
        self
    }
}

/// Serializes a document to an XML string.
///
/// ```
/// use xmlguard::Document;
/// use xmlguard::serial::serialize;
///
/// let doc = Document::parse_str("<root a='1'>x &amp; y</root>").unwrap();
/// assert_eq!(serialize(&doc), "<?xml version=\"1.0\"?>\n<root a=\"1\">x &amp; y</root>\n");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document to an XML string with the given options.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut out = String::new();

    if options.xml_declaration {
        out.push_str("<?xml version=\"");
        out.push_str(doc.version.as_deref().unwrap_or("1.0"));
        out.push('"');
        if let Some(encoding) = &doc.encoding {
            out.push_str(" encoding=\"");
            out.push_str(encoding);
            out.push('"');
        }
        if let Some(standalone) = doc.standalone {
            out.push_str(" standalone=\"");
            out.push_str(if standalone { "yes" } else { "no" });
            out.push('"');
        }
        out.push_str("?>\n");
    }

    for child in doc.children(doc.root()) {
        write_node(doc, child, options, 0, &mut out);
        out.push('\n');
    }
    out
}

/// Serializes a single node and its subtree, without an XML declaration.
///
/// Attributes serialize as `name="value"`; the document node serializes its
/// children back to back.
///
/// ```
/// use xmlguard::Document;
/// use xmlguard::serial::serialize_node;
///
/// let doc = Document::parse_str("<a><b x='1'>t</b></a>").unwrap();
/// let a = doc.root_element().unwrap();
/// let b = doc.first_child(a).unwrap();
/// assert_eq!(serialize_node(&doc, b), "<b x=\"1\">t</b>");
/// ```
#[must_use]
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &SerializeOptions::default(), 0, &mut out);
    out
}

/// Serializes the children of a node back to back (the node's inner XML).
#[must_use]
pub fn serialize_children(doc: &Document, id: NodeId) -> String {
    let options = SerializeOptions::default();
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, child, &options, 0, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, options: &SerializeOptions, depth: usize, out: &mut String) {
    match &doc.node(id).kind {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, child, options, depth, out);
            }
        }
        NodeKind::Element { name, .. } => write_element(doc, id, name, options, depth, out),
        NodeKind::Attribute { name, value } => {
            out.push_str(name);
            out.push_str("=\"");
            escape_attr(out, value);
            out.push('"');
        }
        NodeKind::Text { content } => escape_text(out, content),
        NodeKind::CData { content } => {
            out.push_str("<![CDATA[");
            out.push_str(content);
            out.push_str("]]>");
        }
        NodeKind::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(data) = data {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
        NodeKind::DocumentType {
            name,
            system_id,
            public_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            match (public_id, system_id) {
                (Some(public), Some(system)) => {
                    out.push_str(&format!(" PUBLIC \"{public}\" \"{system}\""));
                }
                (None, Some(system)) => out.push_str(&format!(" SYSTEM \"{system}\"")),
                _ => {}
            }
            out.push('>');
        }
    }
}

fn write_element(
    doc: &Document,
    id: NodeId,
    name: &str,
    options: &SerializeOptions,
    depth: usize,
    out: &mut String,
) {
    out.push('<');
    out.push_str(name);
    for &attr in doc.attribute_nodes(id) {
        out.push(' ');
        write_node(doc, attr, options, depth, out);
    }

    if doc.first_child(id).is_none() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let pretty = options.indent && is_element_only(doc, id);
    for child in doc.children(id) {
        if pretty {
            out.push('\n');
            out.push_str(&options.indent_str.repeat(depth + 1));
        }
        write_node(doc, child, options, depth + 1, out);
    }
    if pretty {
        out.push('\n');
        out.push_str(&options.indent_str.repeat(depth));
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Returns `true` if the element has no text or CDATA children.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    doc.children(id).all(|child| {
        !matches!(
            doc.node(child).kind,
            NodeKind::Text { .. } | NodeKind::CData { .. }
        )
    })
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
