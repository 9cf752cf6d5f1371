//! CSS selector to `XPath` 1.0 compiler.
//!
//! Supports a linear CSS3 subset: compound selectors (type or `*`, `#id`,
//! `.class`, attribute selectors) joined by the descendant (whitespace) and
//! child (`>`) combinators. Grouping, sibling combinators and
//! pseudo-classes are rejected.
//!
//! ```
//! use xmlguard::css;
//!
//! assert_eq!(css::compile("library > book").unwrap(), "//library/book");
//! assert_eq!(
//!     css::compile("book.fiction").unwrap(),
//!     "//book[contains(concat(' ', normalize-space(@class), ' '), ' fiction ')]"
//! );
//! ```
//!
//! The output is never validated here; callers pass it through the same
//! validation gate as hand-written `XPath`.

use std::fmt::{self, Write};

use thiserror::Error;
use tracing::debug;

use crate::parser::input::{is_name_char, is_name_start_char};

/// A malformed or unsupported selector. Positions are byte offsets into
/// the selector text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssError {
    #[error("CSS selector cannot be empty")]
    Empty,
    #[error("unterminated attribute selector starting at position {position}")]
    UnterminatedAttribute { position: usize },
    #[error("unterminated quoted value starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("expected a selector after combinator at position {position}")]
    DanglingCombinator { position: usize },
    #[error("empty attribute name at position {position}")]
    EmptyAttributeName { position: usize },
    #[error("missing attribute value at position {position}")]
    MissingAttributeValue { position: usize },
    #[error("expected an identifier after '{prefix}' at position {position}")]
    MissingIdentifier { prefix: char, position: usize },
    #[error("unsupported selector syntax '{found}' at position {position}")]
    Unsupported { found: char, position: usize },
}

impl CssError {
    /// The byte offset of the error, if it has one.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::UnterminatedAttribute { position }
            | Self::UnterminatedString { position }
            | Self::DanglingCombinator { position }
            | Self::EmptyAttributeName { position }
            | Self::MissingAttributeValue { position }
            | Self::MissingIdentifier { position, .. }
            | Self::Unsupported { position, .. } => Some(*position),
        }
    }
}

// ---------------------------------------------------------------------------
// Selector model
// ---------------------------------------------------------------------------

/// How a compound selector relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace; also the implicit combinator of the first compound.
    Descendant,
    /// `>`.
    Child,
}

/// An attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr~=value]`: whitespace-separated token.
    Includes,
    /// `[attr^=value]`
    Prefix,
    /// `[attr$=value]`
    Suffix,
    /// `[attr*=value]`
    Substring,
    /// `[attr|=value]`: exactly `value` or starting with `value-`.
    DashMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: AttrOperator,
    /// Empty for [`AttrOperator::Exists`].
    pub value: String,
}

/// One step of a selector chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// `None` is the universal selector.
    pub tag: Option<String>,
    pub ids: Vec<String>,
    /// Deduplicated, in source order.
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
}

impl CompoundSelector {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }
}

/// A parsed selector: compound selectors with the combinator preceding
/// each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub steps: Vec<(Combinator, CompoundSelector)>,
}

impl Selector {
    /// Renders the selector as an `XPath` location path anchored with `//`.
    #[must_use]
    pub fn to_xpath(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (combinator, compound) in &self.steps {
            f.write_str(match combinator {
                Combinator::Descendant => "//",
                Combinator::Child => "/",
            })?;
            f.write_str(compound.tag.as_deref().unwrap_or("*"))?;
            for id in &compound.ids {
                write!(f, "[@id={}]", xpath_literal(id))?;
            }
            for class in &compound.classes {
                write!(f, "[{}]", token_test("class", class))?;
            }
            for attr in &compound.attributes {
                write!(f, "[{}]", attribute_test(attr))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compiles a selector to an `XPath` expression anchored with `//`.
///
/// # Errors
///
/// Returns [`CssError`] for empty, malformed or unsupported selectors.
pub fn compile(selector: &str) -> Result<String, CssError> {
    let xpath = parse(selector)?.to_xpath();
    debug!(selector, xpath = %xpath, "compiled css selector");
    Ok(xpath)
}

/// Parses a selector into its compound steps.
///
/// # Errors
///
/// Returns [`CssError`] for empty, malformed or unsupported selectors.
pub fn parse(selector: &str) -> Result<Selector, CssError> {
    SelectorParser::new(selector).parse()
}

/// Quotes `value` as an `XPath` string literal, using whichever quote it
/// does not contain.
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let mut out = String::from("concat(");
        for (i, part) in value.split('\'').enumerate() {
            if i > 0 {
                out.push_str(", \"'\", ");
            }
            let _ = write!(out, "'{part}'");
        }
        out.push(')');
        out
    }
}

fn token_test(attr: &str, token: &str) -> String {
    format!(
        "contains(concat(' ', normalize-space(@{attr}), ' '), {})",
        xpath_literal(&format!(" {token} "))
    )
}

fn attribute_test(attr: &AttributeSelector) -> String {
    let name = &attr.name;
    let value = &attr.value;
    let literal = xpath_literal(value);
    // An empty or blank operand can never match these operators.
    let never = match attr.operator {
        AttrOperator::Includes => value.is_empty() || value.chars().any(char::is_whitespace),
        AttrOperator::Prefix | AttrOperator::Suffix | AttrOperator::Substring => {
            value.is_empty()
        }
        _ => false,
    };
    if never {
        return "false()".to_owned();
    }
    match attr.operator {
        AttrOperator::Exists => format!("@{name}"),
        AttrOperator::Equals => format!("@{name}={literal}"),
        AttrOperator::Includes => token_test(name, value),
        AttrOperator::Prefix => format!("starts-with(@{name}, {literal})"),
        AttrOperator::Suffix => format!(
            "substring(@{name}, string-length(@{name}) - {}) = {literal}",
            value.chars().count() - 1
        ),
        AttrOperator::Substring => format!("contains(@{name}, {literal})"),
        AttrOperator::DashMatch => format!(
            "@{name}={literal} or starts-with(@{name}, {})",
            xpath_literal(&format!("{value}-"))
        ),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct SelectorParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn unsupported(&self) -> CssError {
        match self.peek() {
            Some(found) => CssError::Unsupported {
                found,
                position: self.pos,
            },
            None => CssError::Empty,
        }
    }

    fn parse(mut self) -> Result<Selector, CssError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(CssError::Empty);
        }
        if self.peek() == Some('>') {
            return Err(CssError::DanglingCombinator { position: self.pos });
        }
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            steps.push((combinator, compound));

            let spaced = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    let position = self.pos;
                    self.pos += 1;
                    self.skip_whitespace();
                    if matches!(self.peek(), None | Some('>')) {
                        return Err(CssError::DanglingCombinator { position });
                    }
                    combinator = Combinator::Child;
                }
                Some(_) if spaced => combinator = Combinator::Descendant,
                Some(_) => return Err(self.unsupported()),
            }
        }
        Ok(Selector { steps })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, CssError> {
        let mut compound = CompoundSelector::default();
        let universal = self.peek() == Some('*');
        if universal {
            self.pos += 1;
        } else if self.peek().is_some_and(is_ident_start) {
            compound.tag = Some(self.parse_ident(is_ident_start));
        }
        loop {
            match self.peek() {
                Some('#') => {
                    let id = self.parse_prefixed('#')?;
                    compound.ids.push(id);
                }
                Some('.') => {
                    let class = self.parse_prefixed('.')?;
                    if !compound.classes.contains(&class) {
                        compound.classes.push(class);
                    }
                }
                Some('[') => compound.attributes.push(self.parse_attribute()?),
                _ => break,
            }
        }
        if compound.is_empty() && !universal {
            return Err(self.unsupported());
        }
        Ok(compound)
    }

    fn parse_ident(&mut self, first: fn(char) -> bool) -> String {
        let start = self.pos;
        if self.peek().is_some_and(first) {
            self.bump();
            while self.peek().is_some_and(is_ident_char) {
                self.bump();
            }
        }
        self.input[start..self.pos].to_owned()
    }

    /// `#ident` or `.ident`.
    fn parse_prefixed(&mut self, prefix: char) -> Result<String, CssError> {
        let position = self.pos;
        self.pos += 1;
        let ident = self.parse_ident(is_ident_char);
        if ident.is_empty() {
            return Err(CssError::MissingIdentifier { prefix, position });
        }
        Ok(ident)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, CssError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_whitespace();

        let name_pos = self.pos;
        let name = self.parse_ident(is_ident_start);
        self.skip_whitespace();
        let operator = match self.peek() {
            None => return Err(CssError::UnterminatedAttribute { position: open }),
            Some(']') => None,
            Some('=') => Some((AttrOperator::Equals, 1)),
            Some(c @ ('~' | '^' | '$' | '*' | '|')) => {
                if self.input[self.pos + 1..].starts_with('=') {
                    Some((
                        match c {
                            '~' => AttrOperator::Includes,
                            '^' => AttrOperator::Prefix,
                            '$' => AttrOperator::Suffix,
                            '*' => AttrOperator::Substring,
                            _ => AttrOperator::DashMatch,
                        },
                        2,
                    ))
                } else {
                    return Err(self.unsupported());
                }
            }
            Some(_) => return Err(self.unsupported()),
        };
        if name.is_empty() {
            return Err(CssError::EmptyAttributeName { position: name_pos });
        }

        let Some((operator, width)) = operator else {
            self.pos += 1;
            return Ok(AttributeSelector {
                name,
                operator: AttrOperator::Exists,
                value: String::new(),
            });
        };
        self.pos += width;
        self.skip_whitespace();

        let value = match self.peek() {
            None => return Err(CssError::UnterminatedAttribute { position: open }),
            Some(']') => return Err(CssError::MissingAttributeValue { position: self.pos }),
            Some(quote @ ('\'' | '"')) => {
                let start = self.pos;
                let body = &self.input[start + 1..];
                let Some(len) = body.find(quote) else {
                    return Err(CssError::UnterminatedString { position: start });
                };
                self.pos = start + 1 + len + 1;
                body[..len].to_owned()
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c != ']' && !c.is_whitespace() && c != '\'' && c != '"')
                {
                    self.bump();
                }
                self.input[start..self.pos].to_owned()
            }
        };

        self.skip_whitespace();
        match self.peek() {
            Some(']') => self.pos += 1,
            None => return Err(CssError::UnterminatedAttribute { position: open }),
            Some(_) => return Err(self.unsupported()),
        }
        Ok(AttributeSelector {
            name,
            operator,
            value,
        })
    }
}

/// Identifier characters: XML name characters without the colon and the
/// period, which CSS reserves.
fn is_ident_char(c: char) -> bool {
    is_name_char(c) && c != ':' && c != '.'
}

fn is_ident_start(c: char) -> bool {
    is_name_start_char(c) && c != ':'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn xpath(selector: &str) -> String {
        compile(selector).unwrap_or_else(|e| panic!("{selector}: {e}"))
    }

    #[test]
    fn test_type_and_universal() {
        assert_eq!(xpath("book"), "//book");
        assert_eq!(xpath("*"), "//*");
        assert_eq!(xpath("  book  "), "//book");
    }

    #[test]
    fn test_id_and_class() {
        assert_eq!(xpath("#id1"), "//*[@id='id1']");
        assert_eq!(
            xpath(".fiction"),
            "//*[contains(concat(' ', normalize-space(@class), ' '), ' fiction ')]"
        );
        assert_eq!(
            xpath("book#b1.a.b.a"),
            "//book[@id='b1']\
             [contains(concat(' ', normalize-space(@class), ' '), ' a ')]\
             [contains(concat(' ', normalize-space(@class), ' '), ' b ')]"
        );
    }

    #[test]
    fn test_attributes() {
        assert_eq!(xpath("[lang]"), "//*[@lang]");
        assert_eq!(xpath("a[ href = 'x' ]"), "//a[@href='x']");
        assert_eq!(xpath("a[href=x]"), "//a[@href='x']");
        assert_eq!(xpath("a[title=\"it's\"]"), "//a[@title=\"it's\"]");
        assert_eq!(xpath("a[href^=http]"), "//a[starts-with(@href, 'http')]");
        assert_eq!(
            xpath("a[href$='.pdf']"),
            "//a[substring(@href, string-length(@href) - 3) = '.pdf']"
        );
        assert_eq!(xpath("a[href*=example]"), "//a[contains(@href, 'example')]");
        assert_eq!(
            xpath("p[lang|=en]"),
            "//p[@lang='en' or starts-with(@lang, 'en-')]"
        );
        assert_eq!(
            xpath("p[rel~=next]"),
            "//p[contains(concat(' ', normalize-space(@rel), ' '), ' next ')]"
        );
        assert_eq!(xpath("p[rel^='']"), "//p[false()]");
    }

    #[test]
    fn test_combinators() {
        assert_eq!(xpath("library > book"), "//library/book");
        assert_eq!(xpath("library>book"), "//library/book");
        assert_eq!(xpath("library book title"), "//library//book//title");
        assert_eq!(
            xpath("div > .x [y]"),
            "//div/*[contains(concat(' ', normalize-space(@class), ' '), ' x ')]//*[@y]"
        );
    }

    #[test]
    fn test_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn test_errors() {
        assert_eq!(compile("").unwrap_err(), CssError::Empty);
        assert_eq!(compile("   ").unwrap_err(), CssError::Empty);
        assert_eq!(
            compile("a[href").unwrap_err(),
            CssError::UnterminatedAttribute { position: 1 }
        );
        assert_eq!(
            compile("a[href='x]").unwrap_err(),
            CssError::UnterminatedString { position: 7 }
        );
        assert_eq!(
            compile("a >").unwrap_err(),
            CssError::DanglingCombinator { position: 2 }
        );
        assert_eq!(
            compile("> a").unwrap_err(),
            CssError::DanglingCombinator { position: 0 }
        );
        assert_eq!(
            compile("a > > b").unwrap_err(),
            CssError::DanglingCombinator { position: 2 }
        );
        assert_eq!(
            compile("[=x]").unwrap_err(),
            CssError::EmptyAttributeName { position: 1 }
        );
        assert_eq!(
            compile("a[b=]").unwrap_err(),
            CssError::MissingAttributeValue { position: 4 }
        );
        assert_eq!(
            compile("a.").unwrap_err(),
            CssError::MissingIdentifier {
                prefix: '.',
                position: 1
            }
        );
    }

    #[test]
    fn test_unsupported_syntax() {
        for (selector, found, position) in [
            ("a, b", ',', 1),
            ("a + b", '+', 2),
            ("a ~ b", '~', 2),
            ("a:first-child", ':', 1),
            ("a::before", ':', 1),
            ("a[b!=c]", '!', 3),
        ] {
            assert_eq!(
                compile(selector).unwrap_err(),
                CssError::Unsupported { found, position },
                "{selector}"
            );
        }
    }

    #[test]
    fn test_parse_model() {
        let selector = parse("ul > li.item.item[data-x]").unwrap();
        assert_eq!(selector.steps.len(), 2);
        assert_eq!(selector.steps[1].0, Combinator::Child);
        let li = &selector.steps[1].1;
        assert_eq!(li.tag.as_deref(), Some("li"));
        assert_eq!(li.classes, vec!["item"]);
        assert_eq!(li.attributes[0].operator, AttrOperator::Exists);
    }

    #[test]
    fn test_output_parses_as_xpath() {
        for selector in [
            "book",
            "library > book.fiction",
            "#x [a|=b] > *[c$=d]",
            "a[title=\"it's\"]",
        ] {
            assert!(crate::xpath::parser::parse(&xpath(selector)).is_ok(), "{selector}");
        }
    }
}
