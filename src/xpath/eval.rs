//! `XPath` 1.0 expression evaluator.
//!
//! Walks an [`Expr`] against a [`Document`]. Every expression is evaluated
//! relative to a context (node, position, size). Location steps enumerate
//! their axis per context node in axis order, so predicates see proximity
//! positions; the merged result of a step is sorted into document order
//! and deduplicated, which is cheap because `NodeId` order is document
//! order.

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::types::{format_xpath_number, parse_xpath_number, XPathError, XPathValue};
use crate::tree::{Document, NodeId, NodeKind};

/// Evaluation context for an `XPath` 1.0 expression.
///
/// ```
/// use xmlguard::Document;
/// use xmlguard::xpath::{parser::parse, XPathContext};
///
/// let doc = Document::parse_str("<root><a/><b/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// let expr = parse("count(*)").unwrap();
/// let value = XPathContext::new(&doc, root).evaluate(&expr).unwrap();
/// assert_eq!(value.to_number(), 2.0);
/// ```
#[derive(Clone, Copy)]
pub struct XPathContext<'a> {
    doc: &'a Document,
    context_node: NodeId,
    context_position: usize,
    context_size: usize,
}

impl<'a> XPathContext<'a> {
    /// Creates a context with `context_node` as the only member of a
    /// singleton context set.
    #[must_use]
    pub fn new(doc: &'a Document, context_node: NodeId) -> Self {
        Self {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
        }
    }

    fn with_node(self, node: NodeId, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            context_position: position,
            context_size: size,
            ..self
        }
    }

    /// Evaluates a parsed expression.
    ///
    /// # Errors
    ///
    /// Returns `XPathError` for unknown functions, variables, wrong arity
    /// or type mismatches.
    pub fn evaluate(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        self.eval(expr)
    }

    fn eval(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        match expr {
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::String(s) => Ok(XPathValue::String(s.clone())),
            Expr::Variable(name) => Err(XPathError::UndefinedVariable(name.clone())),
            Expr::BinaryOp { op, left, right } => self.eval_binary(*op, left, right),
            Expr::UnaryNeg(inner) => Ok(XPathValue::Number(-self.number(&self.eval(inner)?))),
            Expr::FunctionCall { name, args } => self.eval_function(name, args),
            Expr::Path { steps } => self.eval_steps(vec![self.context_node], steps),
            Expr::RootPath { steps } => self.eval_steps(vec![self.doc.root()], steps),
            Expr::FilterPath { filter, steps } => {
                let start = self.node_set(filter)?;
                self.eval_steps(start, steps)
            }
            Expr::Filter { expr, predicates } => {
                let mut nodes = self.node_set(expr)?;
                for predicate in predicates {
                    nodes = self.filter(&nodes, predicate)?;
                }
                Ok(XPathValue::NodeSet(nodes))
            }
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left)?;
                nodes.extend(self.node_set(right)?);
                nodes.sort_unstable();
                nodes.dedup();
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    /// Evaluates `expr` and requires a node-set.
    fn node_set(&self, expr: &Expr) -> Result<Vec<NodeId>, XPathError> {
        match self.eval(expr)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError {
                expected: "node-set".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn eval_steps(&self, start: Vec<NodeId>, steps: &[Step]) -> Result<XPathValue, XPathError> {
        let mut current = start;
        for step in steps {
            let mut next = Vec::new();
            for &node in &current {
                let mut selected: Vec<NodeId> = self
                    .axis_nodes(node, step.axis)
                    .into_iter()
                    .filter(|&id| self.matches(id, &step.node_test, step.axis))
                    .collect();
                for predicate in &step.predicates {
                    selected = self.filter(&selected, predicate)?;
                }
                next.extend(selected);
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        Ok(XPathValue::NodeSet(current))
    }

    /// Returns the nodes on `axis` from `node`, in axis order (reverse axes
    /// closest first).
    fn axis_nodes(&self, node: NodeId, axis: Axis) -> Vec<NodeId> {
        let doc = self.doc;
        match axis {
            Axis::Child => doc.children(node).collect(),
            Axis::Descendant => doc.descendants(node).collect(),
            Axis::DescendantOrSelf => std::iter::once(node).chain(doc.descendants(node)).collect(),
            Axis::Parent => doc.parent(node).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(node).skip(1).collect(),
            Axis::AncestorOrSelf => doc.ancestors(node).collect(),
            Axis::FollowingSibling => {
                std::iter::successors(doc.next_sibling(node), |&s| doc.next_sibling(s)).collect()
            }
            Axis::PrecedingSibling => {
                std::iter::successors(doc.prev_sibling(node), |&s| doc.prev_sibling(s)).collect()
            }
            Axis::Following => self.following(node),
            Axis::Preceding => self.preceding(node),
            Axis::Attribute => doc.attribute_nodes(node).to_vec(),
            Axis::Namespace => Vec::new(),
            Axis::Self_ => vec![node],
        }
    }

    /// Nodes after `node` in document order, excluding its descendants and
    /// attributes.
    fn following(&self, node: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        let mut result = Vec::new();
        // The following axis of an attribute starts with its element's
        // content.
        let mut anchor = node;
        if doc.is_attribute(node) {
            if let Some(owner) = doc.parent(node) {
                result.extend(doc.descendants(owner));
                anchor = owner;
            }
        }
        for ancestor in doc.ancestors(anchor) {
            let mut sibling = doc.next_sibling(ancestor);
            while let Some(s) = sibling {
                result.push(s);
                result.extend(doc.descendants(s));
                sibling = doc.next_sibling(s);
            }
        }
        result
    }

    /// Nodes before `node` in document order, excluding its ancestors and
    /// attributes, closest first.
    fn preceding(&self, node: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        let anchor = if doc.is_attribute(node) {
            doc.parent(node).unwrap_or(node)
        } else {
            node
        };
        let ancestors: Vec<NodeId> = doc.ancestors(anchor).collect();
        let mut result: Vec<NodeId> = doc
            .descendants(doc.root())
            .take_while(|&id| id != anchor)
            .filter(|id| !ancestors.contains(id))
            .collect();
        result.reverse();
        result
    }

    fn matches(&self, id: NodeId, test: &NodeTest, axis: Axis) -> bool {
        let kind = &self.doc.node(id).kind;
        let principal = |kind: &NodeKind| {
            if axis == Axis::Attribute {
                matches!(kind, NodeKind::Attribute { .. })
            } else {
                matches!(kind, NodeKind::Element { .. })
            }
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(kind, NodeKind::Text { .. } | NodeKind::CData { .. }),
            NodeTest::Comment => matches!(kind, NodeKind::Comment { .. }),
            NodeTest::ProcessingInstruction(target) => match kind {
                NodeKind::ProcessingInstruction { target: t, .. } => {
                    target.as_ref().map_or(true, |want| want == t)
                }
                _ => false,
            },
            NodeTest::Wildcard => principal(kind),
            NodeTest::PrefixWildcard(prefix) => {
                principal(kind)
                    && self
                        .doc
                        .node_name(id)
                        .and_then(|n| n.split_once(':'))
                        .is_some_and(|(p, _)| p == prefix)
            }
            NodeTest::Name(name) => principal(kind) && self.doc.node_name(id) == Some(name),
        }
    }

    /// Keeps the nodes for which `predicate` holds. A numeric predicate
    /// selects by proximity position.
    fn filter(&self, nodes: &[NodeId], predicate: &Expr) -> Result<Vec<NodeId>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (index, &node) in nodes.iter().enumerate() {
            let ctx = self.with_node(node, index + 1, size);
            let keep = match ctx.eval(predicate)? {
                #[allow(clippy::float_cmp)]
                XPathValue::Number(n) => n == len_to_number(index + 1),
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    fn string_value(&self, node: NodeId) -> String {
        self.doc.text_content(node)
    }

    fn string(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&n| self.string_value(n))
                .unwrap_or_default(),
            other => other.to_xpath_string(),
        }
    }

    fn number(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::NodeSet(_) => parse_xpath_number(&self.string(value)),
            other => other.to_number(),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<XPathValue, XPathError> {
        match op {
            BinaryOp::And => {
                let result = self.eval(left)?.to_boolean() && self.eval(right)?.to_boolean();
                Ok(XPathValue::Boolean(result))
            }
            BinaryOp::Or => {
                let result = self.eval(left)?.to_boolean() || self.eval(right)?.to_boolean();
                Ok(XPathValue::Boolean(result))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.number(&self.eval(left)?);
                let r = self.number(&self.eval(right)?);
                Ok(XPathValue::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                }))
            }
            _ => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(XPathValue::Boolean(self.compare(op, &l, &r)))
            }
        }
    }

    /// Comparison with the node-set rules of `XPath` 1.0 §3.4.
    fn compare(&self, op: BinaryOp, lhs: &XPathValue, rhs: &XPathValue) -> bool {
        match (lhs, rhs) {
            (XPathValue::NodeSet(left), XPathValue::NodeSet(right)) => {
                let right_values: Vec<String> =
                    right.iter().map(|&n| self.string_value(n)).collect();
                left.iter().any(|&l| {
                    let lv = XPathValue::String(self.string_value(l));
                    right_values
                        .iter()
                        .any(|rv| compare_atomic(op, &lv, &XPathValue::String(rv.clone())))
                })
            }
            (XPathValue::NodeSet(nodes), other) => self.compare_node_set(op, nodes, other),
            (other, XPathValue::NodeSet(nodes)) => {
                self.compare_node_set(op.flipped(), nodes, other)
            }
            _ => compare_atomic(op, lhs, rhs),
        }
    }

    fn compare_node_set(&self, op: BinaryOp, nodes: &[NodeId], other: &XPathValue) -> bool {
        if let XPathValue::Boolean(_) = other {
            return compare_atomic(op, &XPathValue::Boolean(!nodes.is_empty()), other);
        }
        nodes.iter().any(|&n| {
            let sv = self.string_value(n);
            let value = match other {
                XPathValue::Number(_) => XPathValue::Number(parse_xpath_number(&sv)),
                _ => XPathValue::String(sv),
            };
            compare_atomic(op, &value, other)
        })
    }

    // -----------------------------------------------------------------------
    // Core function library
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn eval_function(&self, name: &str, args: &[Expr]) -> Result<XPathValue, XPathError> {
        let value = match name {
            // Node-set functions
            "last" => {
                arity(name, args, 0, 0)?;
                XPathValue::Number(len_to_number(self.context_size))
            }
            "position" => {
                arity(name, args, 0, 0)?;
                XPathValue::Number(len_to_number(self.context_position))
            }
            "count" => {
                arity(name, args, 1, 1)?;
                XPathValue::Number(len_to_number(self.node_set(&args[0])?.len()))
            }
            "id" => {
                arity(name, args, 1, 1)?;
                XPathValue::NodeSet(self.fn_id(&args[0])?)
            }
            "local-name" | "name" | "namespace-uri" => {
                arity(name, args, 0, 1)?;
                let node = match args.first() {
                    Some(arg) => self.node_set(arg)?.first().copied(),
                    None => Some(self.context_node),
                };
                let qname = node.and_then(|n| self.doc.node_name(n)).unwrap_or_default();
                XPathValue::String(match name {
                    "name" => qname.to_owned(),
                    "local-name" => qname
                        .split_once(':')
                        .map_or(qname, |(_, local)| local)
                        .to_owned(),
                    _ => String::new(),
                })
            }

            // String functions
            "string" => {
                arity(name, args, 0, 1)?;
                XPathValue::String(self.string_arg(args.first())?)
            }
            "concat" => {
                if args.len() < 2 {
                    return Err(XPathError::InvalidArgCount {
                        name: name.to_owned(),
                        expected: "2 or more".to_owned(),
                        got: args.len(),
                    });
                }
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.string(&self.eval(arg)?));
                }
                XPathValue::String(out)
            }
            "starts-with" | "contains" | "substring-before" | "substring-after" => {
                arity(name, args, 2, 2)?;
                let s = self.string(&self.eval(&args[0])?);
                let pattern = self.string(&self.eval(&args[1])?);
                match name {
                    "starts-with" => XPathValue::Boolean(s.starts_with(&pattern)),
                    "contains" => XPathValue::Boolean(s.contains(&pattern)),
                    "substring-before" => XPathValue::String(
                        s.find(&pattern)
                            .map(|i| s[..i].to_owned())
                            .unwrap_or_default(),
                    ),
                    _ => XPathValue::String(
                        s.find(&pattern)
                            .map(|i| s[i + pattern.len()..].to_owned())
                            .unwrap_or_default(),
                    ),
                }
            }
            "substring" => {
                arity(name, args, 2, 3)?;
                let s = self.string(&self.eval(&args[0])?);
                let start = round(self.number(&self.eval(&args[1])?));
                let end = match args.get(2) {
                    Some(len) => start + round(self.number(&self.eval(len)?)),
                    None => f64::INFINITY,
                };
                let out: String = s
                    .chars()
                    .enumerate()
                    .filter(|&(i, _)| {
                        let p = len_to_number(i + 1);
                        p >= start && p < end
                    })
                    .map(|(_, c)| c)
                    .collect();
                XPathValue::String(out)
            }
            "string-length" => {
                arity(name, args, 0, 1)?;
                XPathValue::Number(len_to_number(
                    self.string_arg(args.first())?.chars().count(),
                ))
            }
            "normalize-space" => {
                arity(name, args, 0, 1)?;
                let s = self.string_arg(args.first())?;
                XPathValue::String(s.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
            }
            "translate" => {
                arity(name, args, 3, 3)?;
                let s = self.string(&self.eval(&args[0])?);
                let from: Vec<char> = self.string(&self.eval(&args[1])?).chars().collect();
                let to: Vec<char> = self.string(&self.eval(&args[2])?).chars().collect();
                XPathValue::String(
                    s.chars()
                        .filter_map(|c| match from.iter().position(|&f| f == c) {
                            Some(i) => to.get(i).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }

            // Boolean functions
            "boolean" => {
                arity(name, args, 1, 1)?;
                XPathValue::Boolean(self.eval(&args[0])?.to_boolean())
            }
            "not" => {
                arity(name, args, 1, 1)?;
                XPathValue::Boolean(!self.eval(&args[0])?.to_boolean())
            }
            "true" | "false" => {
                arity(name, args, 0, 0)?;
                XPathValue::Boolean(name == "true")
            }
            "lang" => {
                arity(name, args, 1, 1)?;
                let wanted = self.string(&self.eval(&args[0])?).to_ascii_lowercase();
                let lang = self
                    .doc
                    .ancestors(self.context_node)
                    .find_map(|n| self.doc.attribute(n, "xml:lang"))
                    .map(str::to_ascii_lowercase);
                XPathValue::Boolean(lang.is_some_and(|l| {
                    l == wanted || l.strip_prefix(&wanted).is_some_and(|r| r.starts_with('-'))
                }))
            }

            // Number functions
            "number" => {
                arity(name, args, 0, 1)?;
                match args.first() {
                    Some(arg) => XPathValue::Number(self.number(&self.eval(arg)?)),
                    None => XPathValue::Number(parse_xpath_number(
                        &self.string_value(self.context_node),
                    )),
                }
            }
            "sum" => {
                arity(name, args, 1, 1)?;
                let nodes = self.node_set(&args[0])?;
                XPathValue::Number(
                    nodes
                        .iter()
                        .map(|&n| parse_xpath_number(&self.string_value(n)))
                        .sum(),
                )
            }
            "floor" | "ceiling" | "round" => {
                arity(name, args, 1, 1)?;
                let n = self.number(&self.eval(&args[0])?);
                XPathValue::Number(match name {
                    "floor" => n.floor(),
                    "ceiling" => n.ceil(),
                    _ => round(n),
                })
            }
            _ => return Err(XPathError::UndefinedFunction(name.to_owned())),
        };
        Ok(value)
    }

    /// The string of the optional argument, or the context node's
    /// string-value.
    fn string_arg(&self, arg: Option<&Expr>) -> Result<String, XPathError> {
        match arg {
            Some(expr) => Ok(self.string(&self.eval(expr)?)),
            None => Ok(self.string_value(self.context_node)),
        }
    }

    /// Elements whose `id` attribute matches one of the whitespace
    /// separated tokens of the argument.
    fn fn_id(&self, arg: &Expr) -> Result<Vec<NodeId>, XPathError> {
        let tokens: Vec<String> = match self.eval(arg)? {
            XPathValue::NodeSet(nodes) => nodes
                .iter()
                .flat_map(|&n| {
                    self.string_value(n)
                        .split_ascii_whitespace()
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                })
                .collect(),
            other => self
                .string(&other)
                .split_ascii_whitespace()
                .map(str::to_owned)
                .collect(),
        };
        Ok(self
            .doc
            .descendants(self.doc.root())
            .filter(|&n| {
                self.doc
                    .attribute(n, "id")
                    .is_some_and(|id| tokens.iter().any(|t| t == id))
            })
            .collect())
    }
}

/// Compares two non-node-set values per `XPath` 1.0 §3.4.
fn compare_atomic(op: BinaryOp, lhs: &XPathValue, rhs: &XPathValue) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Neq => {
            let equal = match (lhs, rhs) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                    lhs.to_boolean() == rhs.to_boolean()
                }
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                    #[allow(clippy::float_cmp)]
                    let eq = lhs.to_number() == rhs.to_number();
                    eq
                }
                _ => lhs.to_xpath_string() == rhs.to_xpath_string(),
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (l, r) = (lhs.to_number(), rhs.to_number());
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Lte => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}

/// `XPath` `round()`: halves round towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}

#[allow(clippy::cast_precision_loss)]
fn len_to_number(n: usize) -> f64 {
    n as f64
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), XPathError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} or {max}")
    };
    Err(XPathError::InvalidArgCount {
        name: name.to_owned(),
        expected,
        got: args.len(),
    })
}

/// Renders a value the way `string()` would, for diagnostics.
#[must_use]
pub fn describe_value(doc: &Document, value: &XPathValue) -> String {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map(|&n| doc.text_content(n))
            .unwrap_or_default(),
        XPathValue::Number(n) => format_xpath_number(*n),
        other => other.to_xpath_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::evaluate;
    use super::*;
    use pretty_assertions::assert_eq;

    const LIBRARY: &str = r#"<library>
  <book id="b1" class="fiction classic" lang="en"><title>Dune</title><price>10</price></book>
  <book id="b2" class="non-fiction"><title>Cosmos</title><price>15.5</price></book>
  <magazine id="m1" xml:lang="en-GB"><title>Wired</title></magazine>
  <!-- end -->
</library>"#;

    fn doc() -> Document {
        Document::parse_str(LIBRARY).unwrap()
    }

    fn eval(doc: &Document, expr: &str) -> XPathValue {
        evaluate(doc, doc.root(), expr).unwrap_or_else(|e| panic!("{expr}: {e}"))
    }

    fn names(doc: &Document, value: &XPathValue) -> Vec<String> {
        value
            .as_node_set()
            .unwrap()
            .iter()
            .map(|&n| doc.node_name(n).unwrap_or("#text").to_owned())
            .collect()
    }

    fn string(doc: &Document, expr: &str) -> String {
        describe_value(doc, &eval(doc, expr))
    }

    #[test]
    fn test_descendant_path() {
        let doc = doc();
        assert_eq!(names(&doc, &eval(&doc, "//title")), vec!["title"; 3]);
        assert_eq!(names(&doc, &eval(&doc, "/library/book")), vec!["book", "book"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = doc();
        assert_eq!(string(&doc, "//book[@id='b2']/title"), "Cosmos");
        assert_eq!(string(&doc, "count(//*[@id])"), "3");
        assert_eq!(string(&doc, "//book[2]/@id"), "b2");
    }

    #[test]
    fn test_positional_predicates_are_per_context() {
        let doc = doc();
        assert_eq!(string(&doc, "count(//*/title[1])"), "3");
        assert_eq!(string(&doc, "(//title)[last()]"), "Wired");
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = doc();
        assert_eq!(
            string(&doc, "//magazine/preceding-sibling::*[1]/@id"),
            "b2"
        );
        assert_eq!(string(&doc, "name(//title[1]/ancestor::*[last()])"), "library");
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = doc();
        assert_eq!(string(&doc, "count(//book[1]/following::title)"), "2");
        assert_eq!(string(&doc, "count(//magazine/preceding::book)"), "2");
        assert_eq!(string(&doc, "count(//book[1]/@id/following::book)"), "1");
    }

    #[test]
    fn test_results_in_document_order_without_duplicates() {
        let doc = doc();
        let value = eval(&doc, "//price | //title | //book/title");
        let nodes = value.as_node_set().unwrap();
        assert_eq!(nodes.len(), 5);
        assert!(nodes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_node_set_comparisons() {
        let doc = doc();
        assert_eq!(eval(&doc, "//price > 12"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//price > 20"), XPathValue::Boolean(false));
        assert_eq!(eval(&doc, "//title = 'Cosmos'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//title != 'Cosmos'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "12 < //price"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//nothing = false()"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//book/@id = //magazine/@id"), XPathValue::Boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        let doc = doc();
        assert_eq!(string(&doc, "1 + 2 * 3"), "7");
        assert_eq!(string(&doc, "7 mod 3"), "1");
        assert_eq!(string(&doc, "1 div 0"), "Infinity");
        assert_eq!(string(&doc, "-(2 - 5)"), "3");
        assert_eq!(string(&doc, "sum(//price)"), "25.5");
    }

    #[test]
    fn test_string_functions() {
        let doc = doc();
        assert_eq!(string(&doc, "concat('a', 'b', 1)"), "ab1");
        assert_eq!(string(&doc, "substring('12345', 1.5, 2.6)"), "234");
        assert_eq!(string(&doc, "substring('12345', 0, 3)"), "12");
        assert_eq!(string(&doc, "substring-before('1999/04/01', '/')"), "1999");
        assert_eq!(string(&doc, "substring-after('1999/04/01', '/')"), "04/01");
        assert_eq!(string(&doc, "normalize-space('  a \n b ')"), "a b");
        assert_eq!(string(&doc, "translate('--aaa--', 'abc-', 'ABC')"), "AAA");
        assert_eq!(string(&doc, "string-length('héllo')"), "5");
        assert_eq!(
            string(&doc, "count(//book[contains(concat(' ', normalize-space(@class), ' '), ' fiction ')])"),
            "1"
        );
    }

    #[test]
    fn test_number_functions() {
        let doc = doc();
        assert_eq!(string(&doc, "round(2.5)"), "3");
        assert_eq!(string(&doc, "round(-2.5)"), "-2");
        assert_eq!(string(&doc, "floor(-1.5)"), "-2");
        assert_eq!(string(&doc, "ceiling(1.1)"), "2");
        assert_eq!(string(&doc, "number('x')"), "NaN");
    }

    #[test]
    fn test_name_id_lang() {
        let doc = doc();
        assert_eq!(string(&doc, "name(id('m1'))"), "magazine");
        assert_eq!(string(&doc, "count(id('b1 b2'))"), "2");
        assert_eq!(eval(&doc, "boolean(//magazine/title[lang('en')])"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "boolean(//book/title[lang('en')])"), XPathValue::Boolean(false));
        assert_eq!(string(&doc, "local-name(//magazine/@xml:lang)"), "lang");
    }

    #[test]
    fn test_node_type_tests() {
        let doc = doc();
        assert_eq!(string(&doc, "count(/library/comment())"), "1");
        assert_eq!(string(&doc, "//book[1]/title/text()"), "Dune");
        assert_eq!(string(&doc, "count(//book[1]/@*)"), "3");
    }

    #[test]
    fn test_context_node_is_respected() {
        let doc = doc();
        let library = doc.root_element().unwrap();
        let second = doc
            .children(library)
            .filter(|&c| doc.is_element(c))
            .nth(1)
            .unwrap();
        let value = evaluate(&doc, second, "title").unwrap();
        assert_eq!(describe_value(&doc, &value), "Cosmos");
        let value = evaluate(&doc, second, "../magazine/title").unwrap();
        assert_eq!(describe_value(&doc, &value), "Wired");
    }

    #[test]
    fn test_repeated_negation() {
        let doc = doc();
        let root = doc.root();
        assert_eq!(evaluate(&doc, root, "---2").unwrap(), XPathValue::Number(-2.0));
        assert_eq!(evaluate(&doc, root, "--'7'").unwrap(), XPathValue::Number(7.0));
        let deep = format!("{}1", "-".repeat(9_999));
        assert_eq!(evaluate(&doc, root, &deep).unwrap(), XPathValue::Number(-1.0));
    }

    #[test]
    fn test_errors() {
        let doc = doc();
        let root = doc.root();
        assert_eq!(
            evaluate(&doc, root, "document('x')").unwrap_err(),
            XPathError::UndefinedFunction("document".into())
        );
        assert_eq!(
            evaluate(&doc, root, "$v").unwrap_err(),
            XPathError::UndefinedVariable("v".into())
        );
        assert!(matches!(
            evaluate(&doc, root, "count()").unwrap_err(),
            XPathError::InvalidArgCount { got: 0, .. }
        ));
        assert!(matches!(
            evaluate(&doc, root, "'a' | //b").unwrap_err(),
            XPathError::TypeError { .. }
        ));
    }
}
