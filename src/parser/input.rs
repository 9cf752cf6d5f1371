//! Low-level input handling for the XML parser.
//!
//! [`ParserInput`] owns the cursor over the source text, position tracking
//! (line, column, byte offset), the depth and entity expansion counters, and
//! the primitives every production needs: peeking, advancing, names, quoted
//! literals and character references.

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum number of entity expansions per document.
pub(crate) const DEFAULT_MAX_ENTITY_EXPANSIONS: u32 = 10_000;

// -------------------------------------------------------------------------
// XML character classes (XML 1.0 §2.2, §2.3)
// -------------------------------------------------------------------------

/// Returns `true` if `c` matches the XML 1.0 `Char` production.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` may start an XML name.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` may appear after the first character of a name.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` for the four XML whitespace characters.
pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

// -------------------------------------------------------------------------
// ParserInput
// -------------------------------------------------------------------------

/// Cursor and bookkeeping shared by every production of the parser.
pub(crate) struct ParserInput<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    max_depth: u32,
    entity_expansions: u32,
    max_entity_expansions: u32,
    /// Warnings collected while parsing.
    pub(crate) diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> ParserInput<'a> {
    /// Creates a new `ParserInput` with default limits.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            entity_expansions: 0,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
            diagnostics: Vec::new(),
        }
    }

    pub fn set_max_depth(&mut self, max: u32) {
        self.max_depth = max;
    }

    pub fn set_max_entity_expansions(&mut self, max: u32) {
        self.max_entity_expansions = max;
    }

    // -- Limits --

    /// Increments the nesting depth, failing once the limit is exceeded.
    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        Ok(())
    }

    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Records one entity expansion, failing once the limit is exceeded.
    pub fn count_expansion(&mut self) -> Result<(), ParseError> {
        self.entity_expansions += 1;
        if self.entity_expansions > self.max_entity_expansions {
            return Err(self.fatal(format!(
                "entity expansion limit exceeded ({})",
                self.max_entity_expansions
            )));
        }
        Ok(())
    }

    // -- Position --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    // -- Peek and advance --

    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns the character `offset` bytes ahead of the cursor.
    pub fn char_after(&self, offset: usize) -> Option<char> {
        self.rest().get(offset..)?.chars().next()
    }

    /// Advances past one character, updating line and column.
    pub fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    /// Advances past the given text, which must be the upcoming input.
    fn advance_over(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance_char(ch);
        }
    }

    /// Consumes the next character with `\r\n` folded to `\n`, rejecting
    /// characters outside the XML `Char` production.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", ch as u32)));
        }
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance_char('\n');
            }
            return Ok('\n');
        }
        Ok(ch)
    }

    // -- Lookahead and expectations --

    pub fn looking_at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Consumes `s` if it is next in the input.
    pub fn eat(&mut self, s: &str) -> bool {
        if self.looking_at(s) {
            self.advance_over(s);
            true
        } else {
            false
        }
    }

    pub fn expect_str(&mut self, s: &str) -> Result<(), ParseError> {
        if self.eat(s) {
            Ok(())
        } else {
            let found = self
                .peek_char()
                .map_or_else(|| "end of input".to_owned(), |c| format!("'{c}'"));
            Err(self.fatal(format!("expected '{s}', found {found}")))
        }
    }

    /// Skips whitespace. Returns `true` if any was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(ch) = self.peek_char().filter(|&c| is_xml_whitespace(c)) {
            self.advance_char(ch);
        }
        self.pos > start
    }

    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if self.skip_whitespace() {
            Ok(())
        } else {
            Err(self.fatal("whitespace required"))
        }
    }

    /// Consumes everything up to `delimiter` and the delimiter itself,
    /// returning the text in between with line endings normalized.
    pub fn take_until(&mut self, delimiter: &str, what: &str) -> Result<String, ParseError> {
        let rest = self.rest();
        let Some(end) = rest.find(delimiter) else {
            return Err(self.fatal(format!("unterminated {what}")));
        };
        let body = &rest[..end];
        if let Some(bad) = body.chars().find(|&c| !is_xml_char(c)) {
            return Err(self.fatal(format!(
                "invalid XML character in {what}: U+{:04X}",
                bad as u32
            )));
        }
        self.advance_over(body);
        self.advance_over(delimiter);
        Ok(body.replace("\r\n", "\n"))
    }

    // -- Names and literals --

    /// Parses an XML `Name`.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !is_name_start_char(first) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);
        while let Some(ch) = self.peek_char().filter(|&c| is_name_char(c)) {
            self.advance_char(ch);
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    /// Parses a single- or double-quoted literal and returns its raw
    /// content (no reference expansion).
    pub fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(b'"') => "\"",
            Some(b'\'') => "'",
            _ => return Err(self.fatal("expected quoted literal")),
        };
        self.advance_over(quote);
        self.take_until(quote, "quoted literal")
    }

    /// Parses the body of a character reference after `&#` up to and
    /// including the closing `;`.
    pub fn parse_char_reference(&mut self) -> Result<char, ParseError> {
        let (radix, digits) = if self.eat("x") {
            (16, self.take_digits(|c| c.is_ascii_hexdigit()))
        } else {
            (10, self.take_digits(|c| c.is_ascii_digit()))
        };
        if digits.is_empty() {
            return Err(self.fatal("empty character reference"));
        }
        self.expect_str(";")?;
        let value = u32::from_str_radix(&digits, radix)
            .map_err(|_| self.fatal("character reference out of range"))?;
        char::from_u32(value)
            .filter(|&c| is_xml_char(c))
            .ok_or_else(|| {
                self.fatal(format!(
                    "character reference &#x{value:X}; is not a valid XML character"
                ))
            })
    }

    fn take_digits(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char().filter(|&c| pred(c)) {
            self.advance_char(ch);
        }
        self.input[start..self.pos].to_owned()
    }

    // -- Diagnostics --

    /// Builds a fatal error at the current position.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn push_warning(&mut self, message: String) {
        self.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message,
            location: self.location(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column_tracking() {
        let mut input = ParserInput::new("ab\ncd");
        input.expect_str("ab").unwrap();
        assert_eq!(input.next_char().unwrap(), '\n');
        let loc = input.location();
        assert_eq!((loc.line, loc.column, loc.byte_offset), (2, 1, 3));
    }

    #[test]
    fn test_next_char_crlf_normalization() {
        let mut input = ParserInput::new("\r\nx");
        assert_eq!(input.next_char().unwrap(), '\n');
        assert_eq!(input.next_char().unwrap(), 'x');
        assert!(input.at_end());
    }

    #[test]
    fn test_next_char_rejects_control_chars() {
        let mut input = ParserInput::new("\u{1}");
        assert!(input.next_char().is_err());
    }

    #[test]
    fn test_parse_name() {
        let mut input = ParserInput::new("xs:book-1 rest");
        assert_eq!(input.parse_name().unwrap(), "xs:book-1");
        assert!(ParserInput::new("1abc").parse_name().is_err());
    }

    #[test]
    fn test_parse_quoted() {
        let mut input = ParserInput::new("'a\"b' \"c\"");
        assert_eq!(input.parse_quoted().unwrap(), "a\"b");
        input.skip_whitespace();
        assert_eq!(input.parse_quoted().unwrap(), "c");
    }

    #[test]
    fn test_char_references() {
        assert_eq!(ParserInput::new("65;").parse_char_reference().unwrap(), 'A');
        assert_eq!(ParserInput::new("x3C;").parse_char_reference().unwrap(), '<');
        assert!(ParserInput::new("0;").parse_char_reference().is_err());
        assert!(ParserInput::new(";").parse_char_reference().is_err());
    }

    #[test]
    fn test_take_until() {
        let mut input = ParserInput::new(" hi -->after");
        assert_eq!(input.take_until("-->", "comment").unwrap(), " hi ");
        assert!(input.looking_at("after"));
        assert!(ParserInput::new("never closed").take_until("-->", "comment").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut input = ParserInput::new("");
        input.set_max_depth(2);
        input.increment_depth().unwrap();
        input.increment_depth().unwrap();
        assert!(input.increment_depth().is_err());
    }

    #[test]
    fn test_expansion_limit() {
        let mut input = ParserInput::new("");
        input.set_max_entity_expansions(1);
        input.count_expansion().unwrap();
        let err = input.count_expansion().unwrap_err();
        assert!(err.message.contains("entity expansion limit"));
    }
}
