//! Tree-building XML parser.
//!
//! Recursive descent over the document: XML declaration, prolog (comments,
//! PIs, an optional DOCTYPE with an internal subset), exactly one root
//! element, then trailing misc. Nodes are appended to the arena as they are
//! encountered, which keeps `NodeId` order equal to document order.

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::error::ParseError;
use crate::tree::{Document, NodeId, NodeKind};

use super::input::{is_xml_whitespace, ParserInput};
use super::{ExternalEntityRequest, ParseOptions};

/// A general entity declared in the internal subset.
#[derive(Debug, Clone)]
enum EntityDecl {
    /// `<!ENTITY name "value">`; the value is kept raw and expanded on use.
    Internal(String),
    /// `<!ENTITY name SYSTEM "uri">` or `PUBLIC "id" "uri"`.
    External {
        system_id: String,
        public_id: Option<String>,
    },
}

/// Where an entity reference occurs; attribute values may not reference
/// external entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefContext {
    Content,
    Attribute,
}

/// The core XML parser.
pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    options: &'a ParseOptions,
    entities: HashMap<String, EntityDecl>,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &'a ParseOptions) -> Self {
        let mut pi = ParserInput::new(input);
        pi.set_max_depth(options.max_depth);
        pi.set_max_entity_expansions(options.max_entity_expansions);
        Self {
            input: pi,
            doc: Document::new(),
            options,
            entities: HashMap::new(),
        }
    }

    /// Parses the entire document.
    pub fn parse(&mut self) -> Result<Document, ParseError> {
        if self.input.looking_at("<?xml")
            && self.input.char_after("<?xml".len()).is_some_and(is_xml_whitespace)
        {
            self.parse_xml_declaration()?;
        }

        let root = self.doc.root();
        let mut seen_doctype = false;
        let mut seen_root = false;

        loop {
            self.input.skip_whitespace();
            if self.input.at_end() {
                break;
            }
            if self.input.looking_at("<!--") {
                self.parse_comment(root)?;
            } else if self.input.looking_at("<?") {
                self.parse_processing_instruction(root)?;
            } else if self.input.looking_at("<!DOCTYPE") {
                if seen_doctype || seen_root {
                    return Err(self.input.fatal("misplaced DOCTYPE declaration"));
                }
                seen_doctype = true;
                self.parse_doctype(root)?;
            } else if self.input.looking_at("<") {
                if seen_root {
                    return Err(self.input.fatal("content after document element"));
                }
                seen_root = true;
                self.parse_element(root)?;
            } else {
                return Err(self.input.fatal(if seen_root {
                    "content after document element"
                } else {
                    "text outside of the document element"
                }));
            }
        }

        if !seen_root {
            return Err(self.input.fatal("missing root element"));
        }

        self.doc.diagnostics = std::mem::take(&mut self.input.diagnostics);
        trace!(nodes = self.doc.node_count(), "parsed document");
        Ok(std::mem::take(&mut self.doc))
    }

    // --- XML declaration ---

    fn parse_xml_declaration(&mut self) -> Result<(), ParseError> {
        self.input.expect_str("<?xml")?;
        loop {
            let had_space = self.input.skip_whitespace();
            if self.input.eat("?>") {
                break;
            }
            if !had_space {
                return Err(self.input.fatal("whitespace required in XML declaration"));
            }
            let name = self.input.parse_name()?;
            self.input.skip_whitespace();
            self.input.expect_str("=")?;
            self.input.skip_whitespace();
            let value = self.input.parse_quoted()?;
            match name.as_str() {
                "version" => self.doc.version = Some(value),
                "encoding" => self.doc.encoding = Some(value),
                "standalone" => {
                    self.doc.standalone = match value.as_str() {
                        "yes" => Some(true),
                        "no" => Some(false),
                        _ => {
                            return Err(self
                                .input
                                .fatal(format!("invalid standalone value '{value}'")))
                        }
                    }
                }
                _ => {
                    return Err(self
                        .input
                        .fatal(format!("unexpected '{name}' in XML declaration")))
                }
            }
        }
        if self.doc.version.is_none() {
            return Err(self.input.fatal("XML declaration is missing version"));
        }
        Ok(())
    }

    // --- DOCTYPE ---

    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str("<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        let (system_id, public_id) = self.parse_external_id()?;
        self.input.skip_whitespace();
        if self.input.eat("[") {
            self.parse_internal_subset()?;
            self.input.skip_whitespace();
        }
        self.input.expect_str(">")?;

        let node = self.doc.create_node(NodeKind::DocumentType {
            name,
            system_id,
            public_id,
        });
        self.doc.append_child(parent, node);
        Ok(())
    }

    /// Parses an optional `SYSTEM "uri"` or `PUBLIC "id" "uri"` clause.
    fn parse_external_id(&mut self) -> Result<(Option<String>, Option<String>), ParseError> {
        if self.input.eat("SYSTEM") {
            self.input.skip_whitespace_required()?;
            let system = self.input.parse_quoted()?;
            Ok((Some(system), None))
        } else if self.input.eat("PUBLIC") {
            self.input.skip_whitespace_required()?;
            let public = self.input.parse_quoted()?;
            self.input.skip_whitespace_required()?;
            let system = self.input.parse_quoted()?;
            Ok((Some(system), Some(public)))
        } else {
            Ok((None, None))
        }
    }

    fn parse_internal_subset(&mut self) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.eat("]") {
                return Ok(());
            }
            if self.input.at_end() {
                return Err(self.input.fatal("unterminated DOCTYPE internal subset"));
            }
            if self.input.looking_at("<!ENTITY") {
                self.parse_entity_decl()?;
            } else if self.input.eat("<!--") {
                self.input.take_until("-->", "comment")?;
            } else if self.input.eat("<?") {
                self.input.take_until("?>", "processing instruction")?;
            } else if self.input.eat("<!") {
                self.skip_markup_decl()?;
            } else if self.input.eat("%") {
                let name = self.input.parse_name()?;
                self.input.expect_str(";")?;
                self.input
                    .push_warning(format!("parameter entity reference '%{name};' ignored"));
            } else {
                return Err(self.input.fatal("unexpected content in DOCTYPE internal subset"));
            }
        }
    }

    /// Skips an ELEMENT, ATTLIST or NOTATION declaration, honoring quotes.
    fn skip_markup_decl(&mut self) -> Result<(), ParseError> {
        loop {
            match self.input.peek() {
                Some(b'>') => {
                    self.input.expect_str(">")?;
                    return Ok(());
                }
                Some(b'"' | b'\'') => {
                    self.input.parse_quoted()?;
                }
                Some(_) => {
                    self.input.next_char()?;
                }
                None => return Err(self.input.fatal("unterminated markup declaration")),
            }
        }
    }

    fn parse_entity_decl(&mut self) -> Result<(), ParseError> {
        self.input.expect_str("<!ENTITY")?;
        self.input.skip_whitespace_required()?;
        let parameter = self.input.eat("%");
        if parameter {
            self.input.skip_whitespace_required()?;
        }
        let name = self.input.parse_name()?;
        self.input.skip_whitespace_required()?;

        let decl = if matches!(self.input.peek(), Some(b'"' | b'\'')) {
            EntityDecl::Internal(self.input.parse_quoted()?)
        } else {
            let (system_id, public_id) = self.parse_external_id()?;
            let Some(system_id) = system_id else {
                return Err(self.input.fatal(format!(
                    "entity '{name}' needs a value or an external identifier"
                )));
            };
            self.input.skip_whitespace();
            if self.input.eat("NDATA") {
                self.input.skip_whitespace_required()?;
                self.input.parse_name()?;
            }
            EntityDecl::External {
                system_id,
                public_id,
            }
        };
        self.input.skip_whitespace();
        self.input.expect_str(">")?;

        // The first declaration of a name is binding.
        if !parameter && !self.entities.contains_key(&name) {
            self.entities.insert(name, decl);
        }
        Ok(())
    }

    // --- Elements ---

    fn parse_element(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str("<")?;
        let name = self.input.parse_name()?;
        self.input.increment_depth()?;

        let element = self.doc.create_node(NodeKind::Element {
            name: name.clone(),
            attributes: Vec::new(),
        });
        self.doc.append_child(parent, element);

        let mut seen = HashSet::new();
        let self_closing = loop {
            let had_space = self.input.skip_whitespace();
            if self.input.eat("/>") {
                break true;
            }
            if self.input.eat(">") {
                break false;
            }
            if self.input.at_end() {
                return Err(self.input.fatal(format!("unterminated start tag '{name}'")));
            }
            if !had_space {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            let attr_name = self.input.parse_name()?;
            self.input.skip_whitespace();
            self.input.expect_str("=")?;
            self.input.skip_whitespace();
            let value = self.parse_attribute_value()?;
            if !seen.insert(attr_name.clone()) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute '{attr_name}' on '{name}'")));
            }
            self.doc.add_attribute(element, attr_name, value);
        };

        if !self_closing {
            self.parse_content(element, &name)?;
        }
        self.input.decrement_depth();
        Ok(())
    }

    fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = match self.input.peek() {
            Some(b'"') => '"',
            Some(b'\'') => '\'',
            _ => return Err(self.input.fatal("attribute value must be quoted")),
        };
        self.input.advance_char(quote);

        let mut value = String::new();
        loop {
            match self.input.peek_char() {
                None => return Err(self.input.fatal("unterminated attribute value")),
                Some(c) if c == quote => {
                    self.input.advance_char(c);
                    return Ok(value);
                }
                Some('<') => return Err(self.input.fatal("'<' not allowed in attribute value")),
                Some('&') => self.parse_reference(&mut value, RefContext::Attribute)?,
                Some(_) => {
                    let c = self.input.next_char()?;
                    value.push(if is_xml_whitespace(c) { ' ' } else { c });
                }
            }
        }
    }

    fn parse_content(&mut self, element: NodeId, name: &str) -> Result<(), ParseError> {
        let mut text = String::new();
        loop {
            if self.input.at_end() {
                return Err(self.input.fatal(format!("element '{name}' is not closed")));
            }
            if self.input.looking_at("<") {
                self.flush_text(element, &mut text);
                if self.input.eat("</") {
                    let end = self.input.parse_name()?;
                    if end != name {
                        return Err(self.input.fatal(format!(
                            "mismatched end tag: expected '</{name}>', found '</{end}>'"
                        )));
                    }
                    self.input.skip_whitespace();
                    self.input.expect_str(">")?;
                    return Ok(());
                } else if self.input.looking_at("<!--") {
                    self.parse_comment(element)?;
                } else if self.input.looking_at("<![CDATA[") {
                    self.parse_cdata(element)?;
                } else if self.input.looking_at("<?") {
                    self.parse_processing_instruction(element)?;
                } else {
                    self.parse_element(element)?;
                }
            } else if self.input.looking_at("&") {
                self.parse_reference(&mut text, RefContext::Content)?;
            } else {
                if self.input.looking_at("]]>") {
                    return Err(self.input.fatal("']]>' not allowed in character data"));
                }
                text.push(self.input.next_char()?);
            }
        }
    }

    fn flush_text(&mut self, parent: NodeId, text: &mut String) {
        if text.is_empty() {
            return;
        }
        let node = self.doc.create_node(NodeKind::Text {
            content: std::mem::take(text),
        });
        self.doc.append_child(parent, node);
    }

    // --- References ---

    /// Parses `&...;` at the cursor and appends its expansion to `out`.
    fn parse_reference(&mut self, out: &mut String, context: RefContext) -> Result<(), ParseError> {
        self.input.expect_str("&")?;
        if self.input.eat("#") {
            out.push(self.input.parse_char_reference()?);
            return Ok(());
        }
        let name = self.input.parse_name()?;
        self.input.expect_str(";")?;
        let mut stack = Vec::new();
        self.expand_entity(&name, out, context, &mut stack)
    }

    /// Expands a named entity, recursing into references in its
    /// replacement text. `stack` holds the entities currently being
    /// expanded and catches self-reference.
    fn expand_entity(
        &mut self,
        name: &str,
        out: &mut String,
        context: RefContext,
        stack: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        if let Some(c) = predefined_entity(name) {
            out.push(c);
            return Ok(());
        }
        let Some(decl) = self.entities.get(name).cloned() else {
            return Err(self.input.fatal(format!("undefined entity '&{name};'")));
        };
        if stack.iter().any(|n| n == name) {
            return Err(self.input.fatal(format!("recursive entity reference '&{name};'")));
        }
        self.input.count_expansion()?;

        let replacement = match decl {
            EntityDecl::Internal(value) => value,
            EntityDecl::External {
                system_id,
                public_id,
            } => {
                if context == RefContext::Attribute {
                    return Err(self.input.fatal(format!(
                        "external entity '&{name};' referenced in attribute value"
                    )));
                }
                match self.resolve_external(name, &system_id, public_id.as_deref())? {
                    Some(text) => text,
                    None => return Ok(()),
                }
            }
        };

        stack.push(name.to_owned());
        self.expand_text(&replacement, out, context, stack)?;
        stack.pop();
        Ok(())
    }

    /// Returns the replacement text of an external entity, or `None` when
    /// the reference is skipped because external entities are disallowed.
    fn resolve_external(
        &mut self,
        name: &str,
        system_id: &str,
        public_id: Option<&str>,
    ) -> Result<Option<String>, ParseError> {
        if !self.options.allow_external_entities {
            warn!(entity = name, system_id, "external entity reference not loaded");
            self.input.push_warning(format!(
                "external entity '{name}' ({system_id}) not loaded"
            ));
            return Ok(None);
        }
        let resolved = self.options.entity_resolver.as_ref().and_then(|resolver| {
            resolver(ExternalEntityRequest {
                name,
                system_id,
                public_id,
            })
        });
        match resolved {
            Some(text) => Ok(Some(text)),
            None => Err(self.input.fatal(format!(
                "failed to resolve external entity '{name}' ({system_id})"
            ))),
        }
    }

    /// Expands the references in an entity's replacement text. Markup in
    /// replacement text is kept as character data.
    fn expand_text(
        &mut self,
        text: &str,
        out: &mut String,
        context: RefContext,
        stack: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        let mut rest = text;
        while let Some(amp) = rest.find('&') {
            push_normalized(out, &rest[..amp], context);
            let after = &rest[amp + 1..];
            let Some(semi) = after.find(';') else {
                return Err(self.input.fatal("unterminated reference in entity value"));
            };
            let reference = &after[..semi];
            if let Some(num) = reference.strip_prefix('#') {
                let parsed = match num.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => num.parse::<u32>(),
                };
                let c = parsed
                    .ok()
                    .and_then(char::from_u32)
                    .filter(|&c| super::input::is_xml_char(c))
                    .ok_or_else(|| {
                        self.input
                            .fatal(format!("invalid character reference '&{reference};'"))
                    })?;
                out.push(c);
            } else {
                self.expand_entity(reference, out, context, stack)?;
            }
            rest = &after[semi + 1..];
        }
        push_normalized(out, rest, context);
        Ok(())
    }

    // --- Comments, CDATA, PIs ---

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str("<!--")?;
        let content = self.input.take_until("-->", "comment")?;
        if content.contains("--") || content.ends_with('-') {
            return Err(self.input.fatal("'--' not allowed inside a comment"));
        }
        let node = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, node);
        Ok(())
    }

    fn parse_cdata(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str("<![CDATA[")?;
        let content = self.input.take_until("]]>", "CDATA section")?;
        let node = self.doc.create_node(NodeKind::CData { content });
        self.doc.append_child(parent, node);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str("<?")?;
        let target = self.input.parse_name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(self
                .input
                .fatal("XML declaration allowed only at the start of the document"));
        }
        let data = if self.input.eat("?>") {
            None
        } else {
            self.input.skip_whitespace_required()?;
            let data = self.input.take_until("?>", "processing instruction")?;
            (!data.is_empty()).then_some(data)
        };
        let node = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, node);
        Ok(())
    }
}

fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

fn push_normalized(out: &mut String, text: &str, context: RefContext) {
    match context {
        RefContext::Content => out.push_str(text),
        RefContext::Attribute => out.extend(
            text.chars()
                .map(|c| if is_xml_whitespace(c) { ' ' } else { c }),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorSeverity;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Document {
        Document::parse_str(input).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn parse_err(input: &str) -> ParseError {
        Document::parse_str(input).unwrap_err()
    }

    #[test]
    fn test_parse_empty_element() {
        let doc = parse("<root/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.first_child(root), None);
    }

    #[test]
    fn test_parse_nested_elements_and_text() {
        let doc = parse("<a><b>hi</b><c/></a>");
        let a = doc.root_element().unwrap();
        let names: Vec<_> = doc.children(a).filter_map(|c| doc.node_name(c)).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(doc.text_content(a), "hi");
    }

    #[test]
    fn test_parse_attributes_both_quotes() {
        let doc = parse("<book id=\"b1\" lang='en'/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "id"), Some("b1"));
        assert_eq!(doc.attribute(root, "lang"), Some("en"));
    }

    #[test]
    fn test_attribute_whitespace_normalized() {
        let doc = parse("<a t=\"x\ty\nz\"/>");
        assert_eq!(doc.attribute(doc.root_element().unwrap(), "t"), Some("x y z"));
    }

    #[test]
    fn test_parse_xml_declaration() {
        let doc = parse("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<r/>");
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert_eq!(doc.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(doc.standalone, Some(true));
    }

    #[test]
    fn test_parse_comment_cdata_pi() {
        let doc = parse("<r><!-- c --><![CDATA[<raw>]]><?pi data?></r>");
        let r = doc.root_element().unwrap();
        let kinds: Vec<_> = doc
            .children(r)
            .map(|c| doc.node(c).kind.type_name())
            .collect();
        assert_eq!(kinds, vec!["comment", "cdata", "processing-instruction"]);
        assert_eq!(doc.text_content(r), "<raw>");
    }

    #[test]
    fn test_predefined_and_char_references() {
        let doc = parse("<r a=\"&lt;&#65;\">&amp;&#x42;&quot;</r>");
        let r = doc.root_element().unwrap();
        assert_eq!(doc.attribute(r, "a"), Some("<A"));
        assert_eq!(doc.text_content(r), "&B\"");
    }

    #[test]
    fn test_internal_entity_expansion() {
        let doc = parse(
            "<!DOCTYPE r [<!ENTITY who \"World\"><!ENTITY greet \"Hello &who;\">]><r>&greet;!</r>",
        );
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "Hello World!");
    }

    #[test]
    fn test_recursive_entity_rejected() {
        let err = parse_err("<!DOCTYPE r [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">]><r>&a;</r>");
        assert!(err.message.contains("recursive entity"));
    }

    #[test]
    fn test_entity_expansion_limit() {
        let input = "<!DOCTYPE r [<!ENTITY a \"xx\"><!ENTITY b \"&a;&a;&a;&a;\">\
                     <!ENTITY c \"&b;&b;&b;&b;\">]><r>&c;&c;&c;&c;</r>";
        let opts = ParseOptions::default().max_entity_expansions(20);
        let err = Document::parse_str_with_options(input, &opts).unwrap_err();
        assert!(err.message.contains("entity expansion limit"));
    }

    #[test]
    fn test_external_entity_skipped_by_default() {
        let resolver_called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = resolver_called.clone();
        let opts = ParseOptions::default().entity_resolver(move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Some("secret".into())
        });
        let doc = Document::parse_str_with_options(
            "<!DOCTYPE r [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]><r>[&xxe;]</r>",
            &opts,
        )
        .unwrap();
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "[]");
        assert!(!resolver_called.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].severity, ErrorSeverity::Warning);
    }

    #[test]
    fn test_external_entity_resolved_when_allowed() {
        let opts = ParseOptions::default()
            .allow_external_entities(true)
            .entity_resolver(|req| (req.system_id == "ext.txt").then(|| "included".to_owned()));
        let doc = Document::parse_str_with_options(
            "<!DOCTYPE r [<!ENTITY ext SYSTEM \"ext.txt\">]><r>&ext;</r>",
            &opts,
        )
        .unwrap();
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "included");
    }

    #[test]
    fn test_external_entity_without_resolver_fails_when_allowed() {
        let opts = ParseOptions::default().allow_external_entities(true);
        let err = Document::parse_str_with_options(
            "<!DOCTYPE r [<!ENTITY ext SYSTEM \"ext.txt\">]><r>&ext;</r>",
            &opts,
        )
        .unwrap_err();
        assert!(err.message.contains("failed to resolve"));
    }

    #[test]
    fn test_doctype_node_recorded() {
        let doc = parse("<!DOCTYPE library SYSTEM \"lib.dtd\"><library/>");
        let first = doc.first_child(doc.root()).unwrap();
        match &doc.node(first).kind {
            NodeKind::DocumentType {
                name, system_id, ..
            } => {
                assert_eq!(name, "library");
                assert_eq!(system_id.as_deref(), Some("lib.dtd"));
            }
            other => panic!("expected doctype, got {other:?}"),
        }
    }

    #[test]
    fn test_error_mismatched_tags() {
        let err = parse_err("<a><b></a></b>");
        assert!(err.message.contains("mismatched end tag"));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_error_location_line() {
        let err = parse_err("<a>\n<b>\n</c></a>");
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_error_unclosed_and_missing_root() {
        assert!(parse_err("<a>").message.contains("not closed"));
        assert!(parse_err("<!-- only -->").message.contains("missing root"));
        assert!(parse_err("<a/><b/>").message.contains("after document element"));
    }

    #[test]
    fn test_error_duplicate_attribute() {
        assert!(parse_err("<a x='1' x='2'/>").message.contains("duplicate attribute"));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "<a>".repeat(10), "</a>".repeat(10));
        let opts = ParseOptions::default().max_depth(5);
        let err = Document::parse_str_with_options(&deep, &opts).unwrap_err();
        assert!(err.message.contains("nesting depth"));
    }
}
