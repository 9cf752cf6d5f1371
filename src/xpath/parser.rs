//! `XPath` 1.0 expression parser.
//!
//! Recursive descent over the token stream from [`super::lexer`]. Operator
//! precedence, lowest to highest:
//!
//! 1. `or`
//! 2. `and`
//! 3. `=`, `!=`
//! 4. `<`, `<=`, `>`, `>=`
//! 5. `+`, `-`
//! 6. `*`, `div`, `mod`
//! 7. unary `-`
//! 8. `|`
//! 9. path and filter expressions

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::lexer::{tokenize, Spanned, Token};
use super::types::XPathError;

/// Maximum depth of the expression tree. Each nested group, predicate,
/// function argument, unary minus and chained binary operator adds one.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Parses an `XPath` expression string into an AST.
///
/// # Errors
///
/// Returns `XPathError::Syntax` with the byte offset of the offending
/// token if the input is not a valid `XPath` 1.0 expression, or if the
/// expression is nested deeper than [`MAX_EXPRESSION_DEPTH`].
///
/// ```
/// use xmlguard::xpath::parser::parse;
///
/// assert!(parse("//book[@price > 10.00]/title").is_ok());
/// assert_eq!(parse("//book[").unwrap_err().position(), Some(7));
/// ```
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(XPathError::syntax("empty XPath expression", 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(XPathError::syntax(
            format!("unexpected token '{}' after expression", extra.token),
            extra.position,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Byte length of the input, reported for errors at end of input.
    end: usize,
    /// Depth of the tree being built; bounds evaluator recursion.
    depth: usize,
}

impl Parser {
    // --- Token access ---

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}', found {}", self.describe())))
        }
    }

    fn describe(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_owned(), |t| format!("'{t}'"))
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        let position = self.tokens.get(self.pos).map_or(self.end, |s| s.position);
        XPathError::syntax(message, position)
    }

    fn descend(&mut self) -> Result<(), XPathError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(self.error(format!(
                "expression nested too deeply (max {MAX_EXPRESSION_DEPTH})"
            )));
        }
        Ok(())
    }

    /// Parses a nested sub-expression: a group, predicate or argument.
    fn parse_nested(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        self.descend()?;
        let expr = self.parse_or()?;
        self.depth = base;
        Ok(expr)
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    // --- Operators ---

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            self.descend()?;
            let right = self.parse_and()?;
            left = Self::binary(BinaryOp::Or, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            self.descend()?;
            let right = self.parse_equality()?;
            left = Self::binary(BinaryOp::And, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equal) => BinaryOp::Eq,
                Some(Token::NotEqual) => BinaryOp::Neq,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_relational()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::LessThan) => BinaryOp::Lt,
                Some(Token::LessThanEqual) => BinaryOp::Lte,
                Some(Token::GreaterThan) => BinaryOp::Gt,
                Some(Token::GreaterThanEqual) => BinaryOp::Gte,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_additive()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right);
        }
    }

    /// Leading minuses fold by parity: `--x` keeps one double negation
    /// (still a number conversion), never one node per sign.
    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        let mut signs = 0usize;
        while self.eat(&Token::Minus) {
            signs += 1;
        }
        if signs == 0 {
            return self.parse_union();
        }
        let base = self.depth;
        self.descend()?;
        let operand = self.parse_union()?;
        self.depth = base;
        let negated = Expr::UnaryNeg(Box::new(operand));
        Ok(if signs % 2 == 0 {
            Expr::UnaryNeg(Box::new(negated))
        } else {
            negated
        })
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let base = self.depth;
        let mut left = self.parse_path()?;
        while self.eat(&Token::Pipe) {
            self.descend()?;
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    // --- Paths ---

    fn parse_path(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.starts_step() {
                    self.parse_relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::RootPath { steps })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.parse_relative_steps()?);
                Ok(Expr::RootPath { steps })
            }
            _ if self.starts_step() => Ok(Expr::Path {
                steps: self.parse_relative_steps()?,
            }),
            _ => self.parse_filter_path(),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name(_)
                    | Token::Star
                    | Token::AxisName(_)
                    | Token::At
                    | Token::Dot
                    | Token::DotDot
                    | Token::NodeType(_)
            )
        )
    }

    /// Parses `Step (('/' | '//') Step)*`.
    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        self.parse_trailing_steps(&mut steps)?;
        Ok(steps)
    }

    fn parse_trailing_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), XPathError> {
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.parse_step()?);
            } else {
                return Ok(());
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::Self_,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = match self.peek() {
            Some(Token::At) => {
                self.pos += 1;
                Axis::Attribute
            }
            Some(Token::AxisName(name)) => {
                let axis = Axis::parse(name)
                    .ok_or_else(|| self.error(format!("unknown axis '{name}'")))?;
                self.pos += 1;
                self.expect(&Token::ColonColon)?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().cloned() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(NodeTest::Wildcard)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(match name.strip_suffix(":*") {
                    Some(prefix) => NodeTest::PrefixWildcard(prefix.to_owned()),
                    None => NodeTest::Name(name),
                })
            }
            Some(Token::NodeType(kind)) => {
                self.pos += 1;
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match self.peek() {
                            Some(Token::Literal(target)) => Some(target.clone()),
                            _ => None,
                        };
                        if target.is_some() {
                            self.pos += 1;
                        }
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            _ => Err(self.error(format!("expected node test, found {}", self.describe()))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_nested()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }

    /// Parses `FilterExpr (('/' | '//') RelativeLocationPath)?`.
    fn parse_filter_path(&mut self) -> Result<Expr, XPathError> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let filter = if predicates.is_empty() {
            primary
        } else {
            Expr::Filter {
                expr: Box::new(primary),
                predicates,
            }
        };

        let mut steps = Vec::new();
        self.parse_trailing_steps(&mut steps)?;
        if steps.is_empty() {
            Ok(filter)
        } else {
            Ok(Expr::FilterPath {
                filter: Box::new(filter),
                steps,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        match self.peek().cloned() {
            Some(Token::VariableReference(name)) => {
                self.pos += 1;
                Ok(Expr::Variable(name))
            }
            Some(Token::LeftParen) => {
                self.pos += 1;
                let inner = self.parse_nested()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Some(Token::Literal(value)) => {
                self.pos += 1;
                Ok(Expr::String(value))
            }
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::FunctionName(name)) => {
                self.pos += 1;
                self.expect(&Token::LeftParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RightParen) {
                    loop {
                        args.push(self.parse_nested()?);
                        if self.eat(&Token::RightParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::FunctionCall { name, args })
            }
            _ => Err(self.error(format!("unexpected {}", self.describe()))),
        }
    }
}
