use tracing::debug;

use super::dom::{DomElement, DomNode, parse_dom};
use crate::model::{Attrs, Mark, Node};
use crate::schema::{NodeType, Schema};

/// Elements that never match a rule but still separate blocks.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "dd", "div", "dl", "dt", "figcaption", "figure", "footer",
    "form", "header", "main", "nav", "section",
];

/// Parses markup into a document valid for `schema`. Never fails:
/// unmatched elements are unwrapped, content that fits nowhere is dropped.
pub fn parse_html(html: &str, schema: &Schema) -> Node {
    let root = parse_dom(html);
    let mut builder = Builder::new(schema);
    builder.add_children(&root);
    builder.finish()
}

enum Rule {
    Mark(Mark),
    Node(String, Attrs),
}

#[derive(Debug)]
struct OpenNode {
    kind: String,
    attrs: Attrs,
    content: Vec<Node>,
    /// Opened for an actual element rather than generated as a wrapper.
    /// Content is never moved out of a solid node.
    solid: bool,
}

struct Builder<'s> {
    schema: &'s Schema,
    stack: Vec<OpenNode>,
    marks: Vec<Mark>,
}

impl<'s> Builder<'s> {
    fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            stack: vec![OpenNode {
                kind: "doc".to_string(),
                attrs: Attrs::default(),
                content: Vec::new(),
                solid: true,
            }],
            marks: Vec::new(),
        }
    }

    fn add_children(&mut self, el: &DomElement) {
        for child in &el.children {
            match child {
                DomNode::Text(text) => self.add_text(text),
                DomNode::Element(el) => self.add_element(el),
            }
        }
    }

    fn add_element(&mut self, el: &DomElement) {
        let saved_marks = self.marks.clone();
        for mark in self.style_marks(el) {
            self.marks = self.schema.add_mark_to_set(&self.marks, &mark);
        }
        match self.match_rule(el) {
            Some(Rule::Mark(mark)) => {
                self.marks = self.schema.add_mark_to_set(&self.marks, &mark);
                self.add_children(el);
            }
            Some(Rule::Node(kind, attrs)) => self.add_node_element(el, &kind, attrs),
            None if BLOCK_TAGS.contains(&el.tag.as_str()) => {
                self.close_generated();
                self.add_children(el);
                self.close_generated();
            }
            None => {
                if !el.children.is_empty() {
                    debug!(tag = %el.tag, "unwrapping unmatched element");
                }
                self.add_children(el);
            }
        }
        self.marks = saved_marks;
    }

    fn add_node_element(&mut self, el: &DomElement, kind: &str, attrs: Attrs) {
        let schema = self.schema;
        let Some(node_type) = schema.node_type(kind) else {
            return;
        };
        if node_type.is_leaf() {
            if self.in_code() {
                if kind == "hard_break" {
                    self.add_text_raw("\n");
                }
                return;
            }
            match schema.node(kind, attrs, []) {
                Ok(node) => {
                    self.insert(node);
                }
                Err(err) => debug!(kind, %err, "dropping leaf element"),
            }
            return;
        }
        if !self.open(kind, attrs, true) {
            debug!(kind, "element fits nowhere, unwrapping it");
            self.add_children(el);
            return;
        }
        let depth = self.stack.len() - 1;
        self.add_children(el);
        self.close_to(depth);
    }

    /// First matching tag rule, marks before nodes, each in declaration
    /// order.
    fn match_rule(&self, el: &DomElement) -> Option<Rule> {
        let schema = self.schema;
        for mark_type in schema.mark_types() {
            for rule in &mark_type.spec().parse_rules {
                if rule.is_style() {
                    continue;
                }
                if let Some(attrs) = rule.matches(el) {
                    if let Ok(mark) = schema.mark(mark_type.name(), attrs) {
                        return Some(Rule::Mark(mark));
                    }
                }
            }
        }
        for node_type in schema.node_types() {
            for rule in &node_type.spec().parse_rules {
                if let Some(attrs) = rule.matches(el) {
                    if let Some(attrs) = self.node_attrs(node_type, attrs) {
                        return Some(Rule::Node(node_type.name().to_string(), attrs));
                    }
                }
            }
        }
        None
    }

    fn node_attrs(&self, node_type: &NodeType, attrs: Attrs) -> Option<Attrs> {
        self.schema
            .node_attrs(node_type.name(), &attrs)
            .or_else(|_| self.schema.node_attrs(node_type.name(), &Attrs::default()))
            .ok()
    }

    fn style_marks(&self, el: &DomElement) -> Vec<Mark> {
        if el.attr("style").is_none() {
            return Vec::new();
        }
        let mut marks = Vec::new();
        for mark_type in self.schema.mark_types() {
            let found = mark_type
                .spec()
                .parse_rules
                .iter()
                .filter(|rule| rule.is_style())
                .find_map(|rule| rule.matches(el))
                .and_then(|attrs| self.schema.mark(mark_type.name(), attrs).ok());
            marks.extend(found);
        }
        marks
    }

    fn in_code(&self) -> bool {
        self.stack.iter().any(|open| {
            self.schema
                .node_type(&open.kind)
                .is_some_and(NodeType::is_code)
        })
    }

    fn top_inline(&self) -> bool {
        self.stack.last().is_some_and(|open| {
            self.schema
                .node_type(&open.kind)
                .is_some_and(NodeType::inline_content)
        })
    }

    fn add_text(&mut self, text: &str) {
        if self.in_code() {
            self.add_text_raw(text);
            return;
        }
        let mut collapsed = String::with_capacity(text.len());
        let mut in_space = false;
        for ch in text.chars() {
            if ch.is_ascii_whitespace() {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(ch);
                in_space = false;
            }
        }
        if collapsed.trim().is_empty() && !self.top_inline() {
            return;
        }
        let at_line_start = !self.top_inline()
            || self.stack.last().is_none_or(|open| match open.content.last() {
                None => true,
                Some(Node::Text(t)) => t.text.ends_with(' '),
                Some(other) => other.kind() == "hard_break",
            });
        let text = if at_line_start {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if !text.is_empty() {
            self.add_text_raw(text);
        }
    }

    fn add_text_raw(&mut self, text: &str) {
        let node = Node::text_with_marks(text, self.marks.clone());
        self.insert(node);
    }

    /// Places an inline or leaf node, generating wrappers if needed.
    fn insert(&mut self, node: Node) -> bool {
        let Some((depth, route)) = self.find_place(node.kind()) else {
            debug!(kind = node.kind(), "dropping node that fits nowhere");
            return false;
        };
        self.close_to(depth + 1);
        for kind in route {
            if !self.open(&kind, Attrs::default(), false) {
                return false;
            }
        }
        let schema = self.schema;
        let Some(parent) = self.stack.last_mut() else {
            return false;
        };
        let allowed = schema.node_type(&parent.kind);
        let kept: Option<Vec<Mark>> = match &node {
            Node::Text(text) => Some(
                text.marks
                    .iter()
                    .filter(|m| allowed.is_some_and(|t| t.allows_mark(&m.kind)))
                    .cloned()
                    .collect(),
            ),
            _ => None,
        };
        let node = match kept {
            Some(marks) => node.with_marks(marks),
            None => node,
        };
        parent.content.push(node);
        true
    }

    /// Opens a node context for `kind` wherever it fits.
    fn open(&mut self, kind: &str, attrs: Attrs, solid: bool) -> bool {
        let Some((depth, route)) = self.find_place(kind) else {
            return false;
        };
        self.close_to(depth + 1);
        for wrapper in route {
            self.stack.push(OpenNode {
                kind: wrapper,
                attrs: Attrs::default(),
                content: Vec::new(),
                solid: false,
            });
        }
        self.stack.push(OpenNode {
            kind: kind.to_string(),
            attrs,
            content: Vec::new(),
            solid,
        });
        true
    }

    /// The open node (by depth) that can take `kind`, and the wrappers
    /// needed in between. Prefers the shortest route, then the deepest
    /// node; never looks past a solid node.
    fn find_place(&self, kind: &str) -> Option<(usize, Vec<String>)> {
        let mut best: Option<(usize, Vec<String>)> = None;
        for depth in (0..self.stack.len()).rev() {
            let open = &self.stack[depth];
            let pending = self.stack.get(depth + 1).map(|child| child.kind.as_str());
            let matched = self.schema.node_type(&open.kind).and_then(|t| {
                t.content_match()
                    .match_kinds(open.content.iter().map(Node::kind).chain(pending))
            });
            if let Some(matched) = matched {
                if let Some(route) = self.schema.find_wrapping(matched, kind) {
                    let shorter = best.as_ref().is_none_or(|(_, r)| route.len() < r.len());
                    if shorter {
                        let direct = route.is_empty();
                        best = Some((depth, route));
                        if direct {
                            break;
                        }
                    }
                }
            }
            if open.solid {
                break;
            }
        }
        best
    }

    /// Closes wrapper nodes generated around loose content so the next
    /// block starts fresh.
    fn close_generated(&mut self) {
        let keep = self
            .stack
            .iter()
            .rposition(|open| open.solid)
            .map_or(1, |i| i + 1);
        self.close_to(keep);
    }

    /// Finishes every open node at `depth` and above.
    fn close_to(&mut self, depth: usize) {
        let depth = depth.max(1);
        while self.stack.len() > depth {
            let Some(open) = self.stack.pop() else {
                break;
            };
            let kind = open.kind.clone();
            match self.finish_node(open) {
                Some(node) => {
                    if let Some(parent) = self.stack.last_mut() {
                        parent.content.push(node);
                    }
                }
                None => debug!(kind, "dropping element with invalid content"),
            }
        }
    }

    fn finish_node(&self, mut open: OpenNode) -> Option<Node> {
        let code = self
            .schema
            .node_type(&open.kind)
            .is_some_and(NodeType::is_code);
        if !code {
            if let Some(Node::Text(last)) = open.content.last_mut() {
                let trimmed = last.text.trim_end_matches(' ').len();
                last.text.truncate(trimmed);
            }
        }
        self.schema
            .create_and_fill(&open.kind, open.attrs, open.content)
            .ok()
    }

    fn finish(mut self) -> Node {
        self.close_to(1);
        let schema = self.schema;
        self.stack
            .pop()
            .and_then(|root| self.finish_node(root))
            .or_else(|| schema.create_and_fill("doc", Attrs::default(), Vec::new()).ok())
            .unwrap_or_else(|| Node::doc([]))
    }
}
