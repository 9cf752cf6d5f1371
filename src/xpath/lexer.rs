//! `XPath` 1.0 expression tokenizer.
//!
//! Converts an expression string into [`Token`]s tagged with their byte
//! offset. The disambiguation rules of `XPath` 1.0 §3.7 are applied here:
//!
//! - After a token that can end an operand, `*` is the multiply operator
//!   and `and`/`or`/`mod`/`div` are operator names.
//! - A name followed by `(` is a function name or a node type test.
//! - A name followed by `::` is an axis name.
//! - Otherwise a name is a name test.

use std::fmt;

use super::types::XPathError;

const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// A token produced by the `XPath` lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    /// `*` as the multiply operator.
    Multiply,
    /// `*` as a name test.
    Star,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
    Mod,
    Div,
    Number(f64),
    Literal(String),
    /// A name test: `foo`, `svg:rect` or `svg:*`.
    Name(String),
    /// `$name`, without the `$`.
    VariableReference(String),
    FunctionName(String),
    NodeType(String),
    AxisName(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Dot => ".",
            Self::DotDot => "..",
            Self::At => "@",
            Self::Comma => ",",
            Self::ColonColon => "::",
            Self::Slash => "/",
            Self::DoubleSlash => "//",
            Self::Pipe => "|",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply | Self::Star => "*",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Mod => "mod",
            Self::Div => "div",
            Self::Number(n) => return write!(f, "{n}"),
            Self::Literal(s) => return write!(f, "'{s}'"),
            Self::VariableReference(name) => return write!(f, "${name}"),
            Self::Name(name)
            | Self::FunctionName(name)
            | Self::NodeType(name)
            | Self::AxisName(name) => name,
        };
        f.write_str(text)
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Tokenizes an `XPath` expression.
///
/// # Errors
///
/// Returns `XPathError::Syntax` for unterminated literals, stray
/// characters and malformed names.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, XPathError> {
    Lexer { input, pos: 0 }.run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Spanned>, XPathError> {
        let mut tokens: Vec<Spanned> = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else { break };
            let position = self.pos;
            let operand_before = tokens.last().is_some_and(|t| ends_operand(&t.token));

            let token = match c {
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                '[' => self.single(Token::LeftBracket),
                ']' => self.single(Token::RightBracket),
                '@' => self.single(Token::At),
                ',' => self.single(Token::Comma),
                '|' => self.single(Token::Pipe),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '=' => self.single(Token::Equal),
                '*' => self.single(if operand_before {
                    Token::Multiply
                } else {
                    Token::Star
                }),
                '/' => {
                    if self.eat("//") {
                        Token::DoubleSlash
                    } else {
                        self.single(Token::Slash)
                    }
                }
                ':' => {
                    if self.eat("::") {
                        Token::ColonColon
                    } else {
                        return Err(XPathError::syntax("unexpected ':'", position));
                    }
                }
                '!' => {
                    if self.eat("!=") {
                        Token::NotEqual
                    } else {
                        return Err(XPathError::syntax("expected '=' after '!'", position));
                    }
                }
                '<' => {
                    if self.eat("<=") {
                        Token::LessThanEqual
                    } else {
                        self.single(Token::LessThan)
                    }
                }
                '>' => {
                    if self.eat(">=") {
                        Token::GreaterThanEqual
                    } else {
                        self.single(Token::GreaterThan)
                    }
                }
                '.' => {
                    if self.eat("..") {
                        Token::DotDot
                    } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                        self.read_number()
                    } else {
                        self.single(Token::Dot)
                    }
                }
                '"' | '\'' => self.read_literal(c)?,
                '$' => {
                    self.pos += 1;
                    let name = self.read_qname().ok_or_else(|| {
                        XPathError::syntax("expected variable name after '$'", position)
                    })?;
                    Token::VariableReference(name)
                }
                c if c.is_ascii_digit() => self.read_number(),
                c if is_name_start_char(c) => {
                    let name = self
                        .read_name_test()
                        .ok_or_else(|| XPathError::syntax("malformed name", position))?;
                    self.classify_name(name, operand_before)
                }
                other => {
                    return Err(XPathError::syntax(
                        format!("unexpected character '{other}'"),
                        position,
                    ))
                }
            };
            tokens.push(Spanned { token, position });
        }
        Ok(tokens)
    }

    fn classify_name(&self, name: String, operand_before: bool) -> Token {
        if operand_before {
            match name.as_str() {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }
        let rest = self.input[self.pos..].trim_start();
        if rest.starts_with("::") {
            Token::AxisName(name)
        } else if rest.starts_with('(') && !name.ends_with(":*") {
            if NODE_TYPE_NAMES.contains(&name.as_str()) {
                Token::NodeType(name)
            } else {
                Token::FunctionName(name)
            }
        } else {
            Token::Name(name)
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset..)?.chars().next()
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            self.pos += c.len_utf8();
        }
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let start = self.pos;
        let body = &self.input[start + 1..];
        let end = body
            .find(quote)
            .ok_or_else(|| XPathError::syntax("unterminated string literal", start))?;
        self.pos = start + 1 + end + 1;
        Ok(Token::Literal(body[..end].to_owned()))
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        Token::Number(self.input[start..self.pos].parse().unwrap_or(f64::NAN))
    }

    fn read_ncname(&mut self) -> Option<&str> {
        let start = self.pos;
        let first = self.peek().filter(|&c| is_name_start_char(c))?;
        self.pos += first.len_utf8();
        while let Some(c) = self.peek().filter(|&c| is_name_char(c)) {
            self.pos += c.len_utf8();
        }
        Some(&self.input[start..self.pos])
    }

    fn read_qname(&mut self) -> Option<String> {
        let mut name = self.read_ncname()?.to_owned();
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(is_name_start_char) {
            self.pos += 1;
            name.push(':');
            name.push_str(self.read_ncname()?);
        }
        Some(name)
    }

    /// Reads `NCName`, `QName` or `NCName:*`.
    fn read_name_test(&mut self) -> Option<String> {
        let mut name = self.read_ncname()?.to_owned();
        if self.peek() == Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.pos += 2;
                    name.push_str(":*");
                }
                Some(c) if is_name_start_char(c) => {
                    self.pos += 1;
                    name.push(':');
                    name.push_str(self.read_ncname()?);
                }
                _ => {}
            }
        }
        Some(name)
    }
}

/// Returns `true` if `token` can end an operand, so that a following `*`
/// or operator name is an operator.
fn ends_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DotDot
            | Token::Star
            | Token::Number(_)
            | Token::Literal(_)
            | Token::Name(_)
            | Token::VariableReference(_)
    )
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}
