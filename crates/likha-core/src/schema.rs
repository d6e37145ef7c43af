use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::content::{ContentExpr, ContentMatch};
use crate::html::DomElement;
use crate::model::{Attrs, Fragment, Mark, Node};
use crate::transform::TransactionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate node type `{0}`")]
    DuplicateNode(String),
    #[error("duplicate mark type `{0}`")]
    DuplicateMark(String),
    #[error("schema is missing the `{0}` node type")]
    MissingNode(String),
    #[error("content expression of `{node}` references unknown type or group `{name}`")]
    UnknownContent { node: String, name: String },
    #[error("invalid content expression for `{node}`: {reason}")]
    InvalidContent { node: String, reason: String },
    #[error("mark `{mark}` excludes unknown mark `{name}`")]
    UnknownExcludes { mark: String, name: String },
    #[error("node `{node}` allows unknown mark `{name}`")]
    UnknownMarks { node: String, name: String },
}

pub type AttrCheck = fn(&Value) -> Result<(), String>;
pub type GetAttrs = Arc<dyn Fn(&DomElement) -> Option<Attrs> + Send + Sync>;
pub type ToMarkup = Arc<dyn Fn(&Attrs) -> DomSpec + Send + Sync>;

/// An attribute declaration. No default means the attribute is required.
#[derive(Debug, Clone, Default)]
pub struct AttrSpec {
    pub default: Option<Value>,
    pub validate: Option<AttrCheck>,
}

/// Markup produced for a node or mark: an element whose content goes into
/// the innermost hole.
#[derive(Debug, Clone, PartialEq)]
pub struct DomSpec {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub inner: DomInner,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomInner {
    /// Void element, e.g. `<img>`.
    Empty,
    Hole,
    Child(Box<DomSpec>),
}

impl DomSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            inner: DomInner::Hole,
        }
    }

    pub fn empty(tag: impl Into<String>) -> Self {
        Self {
            inner: DomInner::Empty,
            ..Self::new(tag)
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn attr_opt(self, name: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn wrap(mut self, child: DomSpec) -> Self {
        self.inner = DomInner::Child(Box::new(child));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelector {
    Tag(String),
    Style(String),
}

/// How an HTML element maps onto a node or mark. `get_attrs` returning
/// `None` means the rule does not match.
#[derive(Clone)]
pub struct ParseRule {
    pub selector: RuleSelector,
    pub get_attrs: Option<GetAttrs>,
}

impl ParseRule {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            selector: RuleSelector::Tag(tag.into()),
            get_attrs: None,
        }
    }

    pub fn style(property: impl Into<String>) -> Self {
        Self {
            selector: RuleSelector::Style(property.into()),
            get_attrs: None,
        }
    }

    pub fn attrs(
        mut self,
        get_attrs: impl Fn(&DomElement) -> Option<Attrs> + Send + Sync + 'static,
    ) -> Self {
        self.get_attrs = Some(Arc::new(get_attrs));
        self
    }

    pub fn is_style(&self) -> bool {
        matches!(self.selector, RuleSelector::Style(_))
    }

    pub fn matches(&self, el: &DomElement) -> Option<Attrs> {
        let selected = match &self.selector {
            RuleSelector::Tag(tag) => el.tag == *tag,
            RuleSelector::Style(property) => el.style(property).is_some(),
        };
        if !selected {
            return None;
        }
        match &self.get_attrs {
            Some(get_attrs) => get_attrs(el),
            None => Some(Attrs::default()),
        }
    }
}

impl fmt::Debug for ParseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseRule")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct NodeSpec {
    pub name: String,
    pub content: Option<String>,
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub isolating: bool,
    pub defining: bool,
    pub code: bool,
    /// `None` allows every mark in inline content, `""` none, `"_"` all,
    /// otherwise a space separated list of mark names.
    pub marks: Option<String>,
    pub attrs: Vec<(String, AttrSpec)>,
    pub parse_rules: Vec<ParseRule>,
    pub to_markup: Option<ToMarkup>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attrs.push((
            name.into(),
            AttrSpec {
                default: Some(default.into()),
                validate: None,
            },
        ));
        self
    }

    pub fn checked_attr(
        mut self,
        name: impl Into<String>,
        default: impl Into<Value>,
        validate: AttrCheck,
    ) -> Self {
        self.attrs.push((
            name.into(),
            AttrSpec {
                default: Some(default.into()),
                validate: Some(validate),
            },
        ));
        self
    }

    pub fn required_attr(mut self, name: impl Into<String>) -> Self {
        self.attrs.push((name.into(), AttrSpec::default()));
        self
    }

    pub fn parse(mut self, rule: ParseRule) -> Self {
        self.parse_rules.push(rule);
        self
    }

    pub fn to_markup(mut self, render: impl Fn(&Attrs) -> DomSpec + Send + Sync + 'static) -> Self {
        self.to_markup = Some(Arc::new(render));
        self
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("content", &self.content)
            .field("group", &self.group)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MarkSpec {
    pub name: String,
    pub attrs: Vec<(String, AttrSpec)>,
    pub inclusive: bool,
    /// Space separated mark names; `None` means the mark excludes only
    /// itself, `"_"` excludes everything.
    pub excludes: Option<String>,
    pub parse_rules: Vec<ParseRule>,
    pub to_markup: Option<ToMarkup>,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            inclusive: true,
            excludes: None,
            parse_rules: Vec::new(),
            to_markup: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attrs.push((
            name.into(),
            AttrSpec {
                default: Some(default.into()),
                validate: None,
            },
        ));
        self
    }

    pub fn required_attr(mut self, name: impl Into<String>) -> Self {
        self.attrs.push((name.into(), AttrSpec::default()));
        self
    }

    pub fn non_inclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }

    pub fn excludes(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    pub fn parse(mut self, rule: ParseRule) -> Self {
        self.parse_rules.push(rule);
        self
    }

    pub fn to_markup(mut self, render: impl Fn(&Attrs) -> DomSpec + Send + Sync + 'static) -> Self {
        self.to_markup = Some(Arc::new(render));
        self
    }
}

impl fmt::Debug for MarkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkSpec")
            .field("name", &self.name)
            .field("inclusive", &self.inclusive)
            .field("excludes", &self.excludes)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct NodeType {
    spec: NodeSpec,
    groups: Vec<String>,
    content: ContentExpr,
    inline_content: bool,
    /// `None` allows every mark.
    allowed_marks: Option<Vec<String>>,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn content_match(&self) -> ContentMatch<'_> {
        self.content.start()
    }

    pub fn is_text(&self) -> bool {
        self.spec.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn is_isolating(&self) -> bool {
        self.spec.isolating
    }

    pub fn is_code(&self) -> bool {
        self.spec.code
    }

    pub fn allows_mark(&self, mark: &str) -> bool {
        match &self.allowed_marks {
            None => true,
            Some(allowed) => allowed.iter().any(|m| m == mark),
        }
    }

    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.iter().any(|(_, a)| a.default.is_none())
    }

    pub fn default_attr(&self, name: &str) -> Option<&Value> {
        self.spec
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, a)| a.default.as_ref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.spec.attrs.iter().any(|(n, _)| n == name)
    }
}

#[derive(Debug)]
pub struct MarkType {
    spec: MarkSpec,
    rank: usize,
    excluded: Vec<String>,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn inclusive(&self) -> bool {
        self.spec.inclusive
    }

    pub fn excludes(&self, other: &str) -> bool {
        self.excluded.iter().any(|m| m == other)
    }
}

/// Node and mark types of an editor. Immutable once defined.
#[derive(Debug)]
pub struct Schema {
    nodes: Vec<NodeType>,
    node_index: HashMap<String, usize>,
    marks: Vec<MarkType>,
    mark_index: HashMap<String, usize>,
}

impl Schema {
    pub fn define(nodes: Vec<NodeSpec>, marks: Vec<MarkSpec>) -> Result<Self, SchemaError> {
        let mut node_index = HashMap::new();
        for (i, spec) in nodes.iter().enumerate() {
            if node_index.insert(spec.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateNode(spec.name.clone()));
            }
        }
        for required in ["doc", "text"] {
            if !node_index.contains_key(required) {
                return Err(SchemaError::MissingNode(required.to_string()));
            }
        }
        let mut mark_index = HashMap::new();
        for (i, spec) in marks.iter().enumerate() {
            if mark_index.insert(spec.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateMark(spec.name.clone()));
            }
        }

        let groups: Vec<Vec<String>> = nodes
            .iter()
            .map(|spec| {
                spec.group
                    .as_deref()
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        let resolve = |name: &str| -> Option<Vec<String>> {
            if node_index.contains_key(name) {
                return Some(vec![name.to_string()]);
            }
            let members: Vec<String> = nodes
                .iter()
                .zip(&groups)
                .filter(|(_, groups)| groups.iter().any(|g| g == name))
                .map(|(spec, _)| spec.name.clone())
                .collect();
            (!members.is_empty()).then_some(members)
        };

        let mut exprs = Vec::with_capacity(nodes.len());
        for spec in &nodes {
            let expr = match spec.content.as_deref().map(str::trim) {
                Some(source) if !source.is_empty() => {
                    ContentExpr::parse(&spec.name, source, &resolve)?
                }
                _ => ContentExpr::empty(),
            };
            exprs.push(expr);
        }

        let is_inline = |name: &str| {
            node_index
                .get(name)
                .is_some_and(|i| nodes[*i].inline || nodes[*i].name == "text")
        };
        let mut node_types = Vec::with_capacity(nodes.len());
        for ((spec, content), groups) in nodes.iter().zip(exprs).zip(groups.iter()) {
            let inline_content = content.start().next_kinds().next().is_some_and(is_inline);
            let allowed_marks = match spec.marks.as_deref() {
                None if inline_content => None,
                None => Some(Vec::new()),
                Some("_") => None,
                Some(list) => {
                    let names: Vec<String> = list.split_whitespace().map(str::to_string).collect();
                    if let Some(unknown) = names.iter().find(|n| !mark_index.contains_key(*n)) {
                        return Err(SchemaError::UnknownMarks {
                            node: spec.name.clone(),
                            name: unknown.clone(),
                        });
                    }
                    Some(names)
                }
            };
            node_types.push(NodeType {
                spec: spec.clone(),
                groups: groups.clone(),
                content,
                inline_content,
                allowed_marks,
            });
        }

        let mut mark_types = Vec::with_capacity(marks.len());
        for (rank, spec) in marks.iter().enumerate() {
            let excluded: Vec<String> = match spec.excludes.as_deref() {
                None => vec![spec.name.clone()],
                Some("_") => marks.iter().map(|m| m.name.clone()).collect(),
                Some(list) => list.split_whitespace().map(str::to_string).collect(),
            };
            if let Some(unknown) = excluded.iter().find(|n| !mark_index.contains_key(*n)) {
                return Err(SchemaError::UnknownExcludes {
                    mark: spec.name.clone(),
                    name: unknown.clone(),
                });
            }
            mark_types.push(MarkType {
                spec: spec.clone(),
                rank,
                excluded,
            });
        }

        Ok(Self {
            nodes: node_types,
            node_index,
            marks: mark_types,
            mark_index,
        })
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.node_index.get(name).map(|i| &self.nodes[*i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.mark_index.get(name).map(|i| &self.marks[*i])
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.iter()
    }

    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        self.marks.iter()
    }

    pub(crate) fn expect_node(&self, name: &str) -> Result<&NodeType, TransactionError> {
        self.node_type(name)
            .ok_or_else(|| TransactionError::UnknownNodeType(name.to_string()))
    }

    pub(crate) fn expect_mark(&self, name: &str) -> Result<&MarkType, TransactionError> {
        self.mark_type(name)
            .ok_or_else(|| TransactionError::UnknownMarkType(name.to_string()))
    }

    /// Whether a node of type `kind` may hold exactly this child sequence.
    pub fn content_matches<'k>(&self, kind: &str, children: impl IntoIterator<Item = &'k str>) -> bool {
        self.node_type(kind)
            .is_some_and(|t| t.content_expr().matches(children))
    }

    pub fn is_textblock(&self, node: &Node) -> bool {
        self.node_type(node.kind()).is_some_and(NodeType::is_textblock)
    }

    pub fn is_block(&self, node: &Node) -> bool {
        self.node_type(node.kind()).is_some_and(NodeType::is_block)
    }

    pub fn is_atom(&self, node: &Node) -> bool {
        !node.is_text() && self.node_type(node.kind()).is_some_and(NodeType::is_atom)
    }

    pub fn node_attrs(&self, kind: &str, given: &Attrs) -> Result<Attrs, TransactionError> {
        let node_type = self.expect_node(kind)?;
        compute_attrs(kind, &node_type.spec.attrs, given)
    }

    pub fn mark(&self, kind: &str, attrs: Attrs) -> Result<Mark, TransactionError> {
        let mark_type = self.expect_mark(kind)?;
        let attrs = compute_attrs(kind, &mark_type.spec.attrs, &attrs)?;
        Ok(Mark {
            kind: kind.to_string(),
            attrs,
        })
    }

    pub fn text(&self, text: impl Into<String>, marks: &[Mark]) -> Node {
        let mut set = Vec::new();
        for mark in marks {
            set = self.add_mark_to_set(&set, mark);
        }
        Node::text_with_marks(text, set)
    }

    /// Builds a node, checking attributes and content.
    pub fn node(
        &self,
        kind: &str,
        attrs: Attrs,
        content: impl IntoIterator<Item = Node>,
    ) -> Result<Node, TransactionError> {
        let node_type = self.expect_node(kind)?;
        let attrs = compute_attrs(kind, &node_type.spec.attrs, &attrs)?;
        let node = if node_type.is_leaf() {
            Node::void(kind, attrs)
        } else {
            Node::element(kind, attrs, content)
        };
        self.check_content(&node)?;
        Ok(node)
    }

    /// Like [`Schema::node`], but generates whatever required children are
    /// missing around `content`, e.g. the paragraph of an empty table cell.
    pub fn create_and_fill(
        &self,
        kind: &str,
        attrs: Attrs,
        content: Vec<Node>,
    ) -> Result<Node, TransactionError> {
        let node_type = self.expect_node(kind)?;
        if node_type.is_leaf() {
            return self.node(kind, attrs, []);
        }
        let kinds: Vec<&str> = content.iter().map(Node::kind).collect();
        let mismatch = || TransactionError::ContentMismatch {
            node: kind.to_string(),
        };
        let fillable = |name: &str| self.is_fillable(name);
        let before = node_type
            .content_match()
            .fill(&kinds, false, fillable)
            .ok_or_else(mismatch)?;
        let matched = node_type
            .content_match()
            .match_kinds(before.iter().map(String::as_str).chain(kinds.iter().copied()))
            .ok_or_else(mismatch)?;
        let after = matched.fill(&[], true, fillable).ok_or_else(mismatch)?;

        let mut children = Vec::with_capacity(before.len() + content.len() + after.len());
        for name in &before {
            children.push(self.create_and_fill(name, Attrs::default(), Vec::new())?);
        }
        children.extend(content);
        for name in &after {
            children.push(self.create_and_fill(name, Attrs::default(), Vec::new())?);
        }
        self.node(kind, attrs, children)
    }

    fn is_fillable(&self, name: &str) -> bool {
        self.node_type(name)
            .is_some_and(|t| !t.is_text() && !t.has_required_attrs())
    }

    /// Wrapper node types (outermost first) that let a parent at `parent`
    /// hold a node of type `target`.
    pub fn find_wrapping(&self, parent: ContentMatch<'_>, target: &str) -> Option<Vec<String>> {
        struct Candidate<'m> {
            matcher: ContentMatch<'m>,
            kind: Option<String>,
            via: Option<usize>,
        }
        let mut arena = vec![Candidate {
            matcher: parent,
            kind: None,
            via: None,
        }];
        let mut seen: Vec<String> = Vec::new();
        let mut cursor = 0;
        while cursor < arena.len() {
            let current = cursor;
            cursor += 1;
            if arena[current].matcher.match_kind(target).is_some() {
                let mut wrappers = Vec::new();
                let mut at = Some(current);
                while let Some(i) = at {
                    if let Some(kind) = &arena[i].kind {
                        wrappers.push(kind.clone());
                    }
                    at = arena[i].via;
                }
                wrappers.reverse();
                return Some(wrappers);
            }
            let matcher = arena[current].matcher;
            let top = arena[current].kind.is_none();
            for kind in matcher.next_kinds() {
                let Some(node_type) = self.node_type(kind) else {
                    continue;
                };
                let completes = matcher.match_kind(kind).is_some_and(ContentMatch::valid_end);
                if node_type.is_leaf()
                    || node_type.has_required_attrs()
                    || seen.iter().any(|s| s == kind)
                    || !(top || completes)
                {
                    continue;
                }
                seen.push(kind.to_string());
                arena.push(Candidate {
                    matcher: node_type.content_match(),
                    kind: Some(kind.to_string()),
                    via: Some(current),
                });
            }
        }
        None
    }

    pub fn add_mark_to_set(&self, set: &[Mark], mark: &Mark) -> Vec<Mark> {
        let incoming = self.mark_type(&mark.kind);
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|m| m.kind != mark.kind && !incoming.is_some_and(|t| t.excludes(&m.kind)))
            .cloned()
            .collect();
        let rank = |kind: &str| self.mark_type(kind).map_or(usize::MAX, MarkType::rank);
        let at = out
            .iter()
            .position(|m| rank(&m.kind) > rank(&mark.kind))
            .unwrap_or(out.len());
        out.insert(at, mark.clone());
        out
    }

    /// Checks a node's direct children: their types against the content
    /// expression and the marks on inline children.
    pub fn check_content(&self, node: &Node) -> Result<(), TransactionError> {
        let node_type = self.expect_node(node.kind())?;
        if node.is_element() == node_type.is_leaf() {
            return Err(TransactionError::ContentMismatch {
                node: node.kind().to_string(),
            });
        }
        if !node_type
            .content_expr()
            .matches(node.content().iter().map(Node::kind))
        {
            return Err(TransactionError::ContentMismatch {
                node: node.kind().to_string(),
            });
        }
        for child in node.content() {
            for mark in child.marks() {
                if !node_type.allows_mark(&mark.kind) {
                    return Err(TransactionError::MarkNotAllowed {
                        mark: mark.kind.clone(),
                        node: node.kind().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Deep validation of a node and everything below it.
    pub fn check_node(&self, node: &Node) -> Result<(), TransactionError> {
        if let Node::Text(text) = node {
            for mark in &text.marks {
                let mark_type = self.expect_mark(&mark.kind)?;
                compute_attrs(&mark.kind, &mark_type.spec.attrs, &mark.attrs)?;
            }
            let normalized = text
                .marks
                .iter()
                .fold(Vec::new(), |set, mark| self.add_mark_to_set(&set, mark));
            if normalized != text.marks {
                let marks = text.marks.iter().map(|m| m.kind.as_str()).collect::<Vec<_>>();
                return Err(TransactionError::InvalidMarkSet {
                    marks: marks.join(", "),
                });
            }
            return Ok(());
        }
        let node_type = self.expect_node(node.kind())?;
        compute_attrs(node.kind(), &node_type.spec.attrs, node.attrs())?;
        self.check_content(node)?;
        for child in node.content() {
            self.check_node(child)?;
        }
        Ok(())
    }

    pub fn check_fragment(&self, fragment: &Fragment) -> Result<(), TransactionError> {
        fragment.iter().try_for_each(|node| self.check_node(node))
    }
}

fn compute_attrs(
    owner: &str,
    defs: &[(String, AttrSpec)],
    given: &Attrs,
) -> Result<Attrs, TransactionError> {
    let invalid = |reason: String| TransactionError::InvalidAttrs {
        node: owner.to_string(),
        reason,
    };
    if let Some(unknown) = given.keys().find(|k| !defs.iter().any(|(name, _)| name == *k)) {
        return Err(invalid(format!("unknown attribute `{unknown}`")));
    }
    let mut attrs = Attrs::new();
    for (name, spec) in defs {
        let value = match (given.get(name), &spec.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => return Err(invalid(format!("missing required attribute `{name}`"))),
        };
        if let Some(validate) = spec.validate {
            validate(&value).map_err(|reason| invalid(format!("`{name}`: {reason}")))?;
        }
        attrs.insert(name.clone(), value);
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn minimal_nodes() -> Vec<NodeSpec> {
        vec![
            NodeSpec::new("doc").content("block+"),
            NodeSpec::new("paragraph").content("inline*").group("block"),
            NodeSpec::new("text").group("inline"),
        ]
    }

    #[test]
    fn unknown_content_reference_fails() {
        let mut nodes = minimal_nodes();
        nodes.push(NodeSpec::new("quote").content("section+").group("block"));
        let err = Schema::define(nodes, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownContent {
                node: "quote".into(),
                name: "section".into()
            }
        );
    }

    #[test]
    fn unknown_excludes_fails() {
        let marks = vec![MarkSpec::new("sub").excludes("sup")];
        let err = Schema::define(minimal_nodes(), marks).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownExcludes { .. }));
    }

    #[test]
    fn duplicate_node_fails() {
        let mut nodes = minimal_nodes();
        nodes.push(NodeSpec::new("paragraph"));
        let err = Schema::define(nodes, Vec::new()).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateNode("paragraph".into()));
    }

    #[test]
    fn missing_attrs_use_defaults_and_required_are_enforced() {
        let mut nodes = minimal_nodes();
        nodes.push(NodeSpec::new("image").inline().group("inline").required_attr("src").attr("alt", Value::Null));
        let schema = Schema::define(nodes, Vec::new()).unwrap();
        let attrs = schema
            .node_attrs("image", &Attrs::from([("src".to_string(), json!("a.png"))]))
            .unwrap();
        assert_eq!(attrs.get("alt"), Some(&Value::Null));
        assert!(schema.node_attrs("image", &Attrs::default()).is_err());
    }

    #[test]
    fn textblock_detection_follows_content() {
        let schema = Schema::define(minimal_nodes(), Vec::new()).unwrap();
        assert!(schema.node_type("paragraph").unwrap().is_textblock());
        assert!(!schema.node_type("doc").unwrap().is_textblock());
        assert!(schema.node_type("text").unwrap().is_inline());
    }
}
