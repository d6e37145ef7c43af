//! Applying steps to documents, and the [`Transform`] builder commands use
//! to assemble multi-step transactions.

use tracing::{debug, trace};

use crate::model::{Attrs, ElementNode, Fragment, Mark, Node};
use crate::ops::{Mapping, Step, Transaction};
use crate::resolve::{NodeRange, ResolvedPos};
use crate::schema::{NodeType, Schema};
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("position {pos} is outside the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },
    #[error("range {from}..{to} crosses a node boundary")]
    CrossesNodeBoundary { from: usize, to: usize },
    #[error("content of `{node}` does not match its schema")]
    ContentMismatch { node: String },
    #[error("no node starts at position {pos}")]
    NotAnElement { pos: usize },
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("unknown mark type `{0}`")]
    UnknownMarkType(String),
    #[error("invalid attributes for `{node}`: {reason}")]
    InvalidAttrs { node: String, reason: String },
    #[error("mark `{mark}` is not allowed in `{node}`")]
    MarkNotAllowed { mark: String, node: String },
    #[error("mark set [{marks}] repeats, excludes or misorders a mark")]
    InvalidMarkSet { marks: String },
}

/// Result of a successfully applied transaction.
#[derive(Debug, Clone)]
pub struct Applied {
    pub doc: Node,
    pub mapping: Mapping,
}

/// Applies every step of `tx` in order. On error the input document is
/// left untouched and nothing is returned.
pub fn apply(doc: &Node, schema: &Schema, tx: &Transaction) -> Result<Node, TransactionError> {
    apply_steps(doc, schema, &tx.steps).map(|applied| applied.doc)
}

pub fn apply_steps(
    doc: &Node,
    schema: &Schema,
    steps: &[Step],
) -> Result<Applied, TransactionError> {
    let mut doc = doc.clone();
    let mut mapping = Mapping::default();
    for (index, step) in steps.iter().enumerate() {
        doc = apply_step(&doc, schema, step).inspect_err(|err| {
            debug!(index, %err, "transaction rejected");
        })?;
        trace!(index, ?step, "step applied");
        mapping.push(step.step_map());
    }
    Ok(Applied { doc, mapping })
}

pub fn apply_step(doc: &Node, schema: &Schema, step: &Step) -> Result<Node, TransactionError> {
    match step {
        Step::Replace { from, to, content } => replace(doc, schema, *from, *to, content),
        Step::SetNodeMarkup { pos, kind, attrs } => {
            set_node_markup(doc, schema, *pos, kind.as_deref(), attrs)
        }
        Step::AddMark { from, to, mark } => {
            check_range(doc, *from, *to)?;
            let mark = schema.mark(&mark.kind, mark.attrs.clone())?;
            let add = |parent: &Node, marks: &[Mark]| -> Option<Vec<Mark>> {
                schema
                    .node_type(parent.kind())
                    .filter(|t| t.allows_mark(&mark.kind))
                    .map(|_| schema.add_mark_to_set(marks, &mark))
            };
            Ok(map_text_marks(doc, *from, *to, &add))
        }
        Step::RemoveMark { from, to, mark } => {
            check_range(doc, *from, *to)?;
            if let Some(kind) = mark {
                schema.expect_mark(kind)?;
            }
            let remove = |_: &Node, marks: &[Mark]| -> Option<Vec<Mark>> {
                Some(
                    marks
                        .iter()
                        .filter(|m| mark.as_ref().is_some_and(|kind| m.kind != *kind))
                        .cloned()
                        .collect(),
                )
            };
            Ok(map_text_marks(doc, *from, *to, &remove))
        }
    }
}

fn check_range(doc: &Node, from: usize, to: usize) -> Result<(), TransactionError> {
    let size = doc.content_size();
    if from > to {
        return Err(TransactionError::InvalidRange { from, to });
    }
    if to > size {
        return Err(TransactionError::PositionOutOfRange { pos: to, size });
    }
    Ok(())
}

fn replace(
    doc: &Node,
    schema: &Schema,
    from: usize,
    to: usize,
    content: &Fragment,
) -> Result<Node, TransactionError> {
    check_range(doc, from, to)?;
    let start = ResolvedPos::resolve(doc, from)?;
    let end = ResolvedPos::resolve(doc, to)?;
    let depth = start.depth();
    if end.depth() != depth || end.start(depth) != start.start(depth) {
        return Err(TransactionError::CrossesNodeBoundary { from, to });
    }
    schema.check_fragment(content)?;

    let parent = start.parent();
    let children = parent
        .content()
        .cut(0, start.parent_offset)
        .append(content)
        .append(&parent.content().cut(end.parent_offset, parent.content_size()));
    let new_parent = parent.with_content(children);
    schema.check_content(&new_parent)?;
    Ok(rebuild(&start, depth, new_parent))
}

fn set_node_markup(
    doc: &Node,
    schema: &Schema,
    pos: usize,
    kind: Option<&str>,
    attrs: &Attrs,
) -> Result<Node, TransactionError> {
    let rpos = ResolvedPos::resolve(doc, pos)?;
    let target = match rpos.node_after() {
        Some(node) if rpos.text_offset() == 0 && !node.is_text() => node,
        _ => return Err(TransactionError::NotAnElement { pos }),
    };
    let new_kind = kind.unwrap_or(target.kind());
    let node_type = schema.expect_node(new_kind)?;
    let attrs = schema.node_attrs(new_kind, attrs)?;
    let replacement = match &target {
        Node::Element(el) if !node_type.is_leaf() => Node::Element(ElementNode {
            kind: new_kind.to_string(),
            attrs,
            children: el.children.clone(),
        }),
        Node::Void(_) if node_type.is_leaf() => Node::void(new_kind, attrs),
        _ => {
            return Err(TransactionError::ContentMismatch {
                node: new_kind.to_string(),
            });
        }
    };
    if kind.is_some() {
        schema.check_content(&replacement)?;
    }

    let depth = rpos.depth();
    let parent = rpos.parent();
    let new_parent =
        parent.with_content(parent.content().replace_child(rpos.index(depth), replacement));
    schema.check_content(&new_parent)?;
    Ok(rebuild(&rpos, depth, new_parent))
}

/// Swaps the ancestor at `depth` for `node`, copying the path above it.
fn rebuild(pos: &ResolvedPos, depth: usize, node: Node) -> Node {
    (0..depth).rev().fold(node, |child, d| {
        let parent = pos.node(d);
        parent.with_content(parent.content().replace_child(pos.index(d), child))
    })
}

type MarkUpdate<'a> = dyn Fn(&Node, &[Mark]) -> Option<Vec<Mark>> + 'a;

/// Rewrites the marks of text inside `from..to` (relative to the content
/// of `node`), splitting text at the range edges.
fn map_text_marks(node: &Node, from: usize, to: usize, update: &MarkUpdate<'_>) -> Node {
    let mut children = Vec::with_capacity(node.child_count());
    let mut changed = false;
    let mut pos = 0;
    for child in node.content() {
        let size = child.node_size();
        let end = pos + size;
        if end <= from || pos >= to {
            children.push(child.clone());
            pos = end;
            continue;
        }
        match child {
            Node::Text(_) => match update(node, child.marks()) {
                Some(marks) => {
                    changed = true;
                    let start = from.saturating_sub(pos);
                    let stop = (to - pos).min(size);
                    children.push(child.cut(0, start));
                    children.push(child.cut(start, stop).with_marks(marks));
                    children.push(child.cut(stop, size));
                }
                None => children.push(child.clone()),
            },
            Node::Element(_) => {
                changed = true;
                children.push(map_text_marks(
                    child,
                    from.saturating_sub(pos + 1),
                    (to - pos - 1).min(child.content_size()),
                    update,
                ));
            }
            Node::Void(_) => children.push(child.clone()),
        }
        pos = end;
    }
    if changed {
        node.with_content(Fragment::from_nodes(children))
    } else {
        node.clone()
    }
}

/// Accumulates steps against a working copy of the document. Every step
/// is validated when added, so later steps see the result of earlier ones.
pub struct Transform<'s> {
    schema: &'s Schema,
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    mapping: Mapping,
}

impl<'s> Transform<'s> {
    pub fn new(schema: &'s Schema, doc: Node) -> Self {
        Self {
            schema,
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            mapping: Mapping::default(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn before(&self) -> &Node {
        &self.before
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransactionError> {
        self.doc = apply_step(&self.doc, self.schema, &step)?;
        self.mapping.push(step.step_map());
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        content: impl Into<Fragment>,
    ) -> Result<&mut Self, TransactionError> {
        self.step(Step::replace(from, to, content))
    }

    pub fn insert(
        &mut self,
        pos: usize,
        content: impl Into<Fragment>,
    ) -> Result<&mut Self, TransactionError> {
        self.replace(pos, pos, content)
    }

    pub fn insert_text(
        &mut self,
        pos: usize,
        text: &str,
        marks: &[Mark],
    ) -> Result<&mut Self, TransactionError> {
        let node = self.schema.text(text, marks);
        self.replace(pos, pos, vec![node])
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransactionError> {
        self.step(Step::add_mark(from, to, mark))
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Option<&str>,
    ) -> Result<&mut Self, TransactionError> {
        self.step(Step::remove_mark(from, to, mark))
    }

    pub fn set_node_markup(
        &mut self,
        pos: usize,
        kind: Option<&str>,
        attrs: Attrs,
    ) -> Result<&mut Self, TransactionError> {
        self.step(Step::set_node_markup(pos, kind, attrs))
    }

    /// Deletes `from..to`, even across block boundaries. Blocks cut by the
    /// range are joined when their types allow it.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self, TransactionError> {
        if from >= to {
            return Ok(self);
        }
        let start = ResolvedPos::resolve(&self.doc, from)?;
        let end = ResolvedPos::resolve(&self.doc, to)?;
        if start.depth() == end.depth() && start.start(start.depth()) == end.start(end.depth()) {
            return self.replace(from, to, Fragment::empty());
        }

        let shared = start.shared_depth(to);
        let left = (start.depth() > shared).then(|| {
            let node = start.node(shared + 1);
            repair(self.schema, node.cut(0, from - start.start(shared + 1)))
        });
        let right = (end.depth() > shared).then(|| {
            let node = end.node(shared + 1);
            repair(
                self.schema,
                node.cut(to - end.start(shared + 1), node.content_size()),
            )
        });
        let range_from = if left.is_some() {
            start.before(shared + 1)
        } else {
            from
        };
        let range_to = if right.is_some() {
            end.after(shared + 1)
        } else {
            to
        };
        let content: Vec<Node> = match (left, right) {
            (Some(left), Some(right)) => match join_nodes(self.schema, &left, &right) {
                Some(joined) => vec![joined],
                None => vec![left, right],
            },
            (left, right) => left.into_iter().chain(right).collect(),
        };
        self.replace(range_from, range_to, content)
    }

    /// Replaces the selection with `node`. Block nodes replace an empty
    /// textblock or split a non-empty one; returns the position before the
    /// inserted node.
    pub fn replace_selection_with(
        &mut self,
        selection: &Selection,
        node: Node,
    ) -> Result<usize, TransactionError> {
        let from = selection.from();
        self.delete_range(from, selection.to())?;
        let schema = self.schema;
        let rpos = ResolvedPos::resolve(&self.doc, from)?;
        let node_type = schema.expect_node(node.kind())?;
        let depth = rpos.depth();
        if node_type.is_inline() || depth == 0 {
            self.insert(from, vec![node])?;
            return Ok(from);
        }

        let parent = rpos.parent().clone();
        let first_try = if schema.is_textblock(&parent) {
            let before = rpos.before(depth);
            let after = rpos.after(depth);
            let offset = rpos.parent_offset;
            let size = parent.content_size();
            if size == 0 {
                self.replace(before, after, vec![node.clone()]).map(|_| before)
            } else if offset == 0 {
                self.insert(before, vec![node.clone()]).map(|_| before)
            } else if offset == size {
                self.insert(after, vec![node.clone()]).map(|_| after)
            } else {
                let left = parent.cut(0, offset);
                let right = parent.cut(offset, size);
                let at = before + left.node_size();
                self.replace(before, after, vec![left, node.clone(), right])
                    .map(|_| at)
            }
        } else {
            self.insert(from, vec![node.clone()]).map(|_| from)
        };
        if first_try.is_ok() {
            return first_try;
        }

        for d in (1..depth).rev() {
            let at = rpos.after(d);
            if self.insert(at, vec![node.clone()]).is_ok() {
                return Ok(at);
            }
        }
        first_try
    }

    /// Wraps the siblings of `range` in `wrappers`, outermost first.
    pub fn wrap(
        &mut self,
        range: &NodeRange,
        wrappers: &[(String, Attrs)],
    ) -> Result<&mut Self, TransactionError> {
        let mut content: Vec<Node> = range.nodes().to_vec();
        for (kind, attrs) in wrappers.iter().rev() {
            content = vec![self.schema.node(kind, attrs.clone(), content)?];
        }
        self.replace(range.start(), range.end(), content)
    }

    /// Moves the siblings of `range` up into the ancestor at `target`,
    /// splitting every node between them around the moved content.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, TransactionError> {
        if target >= range.depth {
            return Err(TransactionError::InvalidRange {
                from: range.start(),
                to: range.end(),
            });
        }
        let mut before: Option<Node> = None;
        let mut after: Option<Node> = None;
        for depth in (target + 1..=range.depth).rev() {
            let node = range.from.node(depth);
            let siblings = node.content().as_slice();
            let (start, end) = if depth == range.depth {
                (range.start_index(), range.end_index())
            } else {
                let index = range.from.index(depth);
                (index, index + 1)
            };

            let mut head = siblings[..start].to_vec();
            head.extend(before.take());
            if !head.is_empty() {
                before = Some(node.with_content(Fragment::from_nodes(head)));
            }
            let mut tail: Vec<Node> = after.take().into_iter().collect();
            tail.extend_from_slice(&siblings[end..]);
            if !tail.is_empty() {
                after = Some(node.with_content(Fragment::from_nodes(tail)));
            }
        }

        let mut content: Vec<Node> = before.into_iter().collect();
        content.extend(range.nodes().iter().cloned());
        content.extend(after);
        let from = range.from.before(target + 1);
        let to = range.from.after(target + 1);
        self.replace(from, to, content)
    }

    /// Converts every textblock touching `from..to` to `kind`. Attributes
    /// the old and new type share are carried over, then `attrs` applied.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        kind: &str,
        attrs: &Attrs,
    ) -> Result<usize, TransactionError> {
        let schema = self.schema;
        let target = schema.expect_node(kind)?;
        if !target.is_textblock() {
            return Err(TransactionError::ContentMismatch {
                node: kind.to_string(),
            });
        }
        let mut blocks = Vec::new();
        self.doc.nodes_between(from, to, |node, pos, _, _| {
            if schema.is_textblock(node) {
                blocks.push((pos, node.clone()));
                return false;
            }
            true
        });
        let count = blocks.len();
        for (pos, block) in blocks.into_iter().rev() {
            self.convert_textblock(pos, &block, target, attrs)?;
        }
        Ok(count)
    }

    fn convert_textblock(
        &mut self,
        pos: usize,
        block: &Node,
        target: &NodeType,
        attrs: &Attrs,
    ) -> Result<(), TransactionError> {
        let schema = self.schema;
        let source = schema.expect_node(block.kind())?;
        let mut merged: Attrs = block
            .attrs()
            .iter()
            .filter(|(name, _)| target.has_attr(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));

        let content_start = pos + 1;
        if target.is_code() && !source.is_code() {
            if block.content().iter().any(|child| !child.marks().is_empty()) {
                self.remove_mark(content_start, content_start + block.content_size(), None)?;
            }
            for (offset, child) in child_offsets(block).into_iter().rev() {
                if !child.is_void() {
                    continue;
                }
                let at = content_start + offset;
                if child.kind() == "hard_break" {
                    self.replace(at, at + 1, vec![Node::text("\n")])?;
                } else {
                    self.replace(at, at + 1, Fragment::empty())?;
                }
            }
            self.set_node_markup(pos, Some(target.name()), merged)?;
        } else if source.is_code() && !target.is_code() {
            self.set_node_markup(pos, Some(target.name()), merged)?;
            if schema.node_type("hard_break").is_some() {
                let breaks: Vec<usize> = block
                    .text_content()
                    .chars()
                    .enumerate()
                    .filter(|(_, ch)| *ch == '\n')
                    .map(|(i, _)| i)
                    .collect();
                for offset in breaks.into_iter().rev() {
                    let at = content_start + offset;
                    let hard_break = schema.node("hard_break", Attrs::default(), [])?;
                    self.replace(at, at + 1, vec![hard_break])?;
                }
            }
        } else {
            self.set_node_markup(pos, Some(target.name()), merged)?;
        }
        Ok(())
    }

    pub fn into_transaction(self) -> Transaction {
        Transaction::new(self.steps)
    }
}

fn child_offsets(node: &Node) -> Vec<(usize, &Node)> {
    let mut offset = 0;
    node.content()
        .iter()
        .map(|child| {
            let at = offset;
            offset += child.node_size();
            (at, child)
        })
        .collect()
}

fn join_nodes(schema: &Schema, left: &Node, right: &Node) -> Option<Node> {
    if !left.is_element() || !right.is_element() {
        return None;
    }
    let textblocks = schema.is_textblock(left) && schema.is_textblock(right);
    if left.kind() != right.kind() && !textblocks {
        return None;
    }
    if schema
        .node_type(left.kind())
        .is_some_and(NodeType::is_isolating)
    {
        return None;
    }
    let mut children = left.content().to_vec();
    let mut rest = right.content().to_vec();
    let joined = match (children.last(), rest.first()) {
        (Some(last), Some(first)) => join_nodes(schema, last, first),
        _ => None,
    };
    if let Some(joined) = joined {
        children.pop();
        children.push(joined);
        rest.remove(0);
    }
    children.extend(rest);
    let node = left.with_content(Fragment::from_nodes(children));
    schema.check_content(&node).ok().map(|_| node)
}

/// Refills a node whose content became incomplete after cutting, e.g. a
/// list item that lost its leading paragraph.
fn repair(schema: &Schema, node: Node) -> Node {
    if !node.is_element() || schema.check_content(&node).is_ok() {
        return node;
    }
    schema
        .create_and_fill(node.kind(), node.attrs().clone(), node.content().to_vec())
        .unwrap_or(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn schema() -> Schema {
        Schema::rich_text()
    }

    #[test]
    fn text_insert_and_delete() {
        let schema = schema();
        let doc = Node::doc([Node::paragraph("hello")]);
        let doc = apply_step(&doc, &schema, &Step::replace(6, 6, vec![Node::text("!")])).unwrap();
        assert_eq!(doc.text_content(), "hello!");
        let doc = apply_step(&doc, &schema, &Step::replace(1, 3, Fragment::empty())).unwrap();
        assert_eq!(doc.text_content(), "llo!");
    }

    #[test]
    fn replace_across_parents_is_rejected() {
        let schema = schema();
        let doc = Node::doc([Node::paragraph("ab"), Node::paragraph("cd")]);
        let err = apply_step(&doc, &schema, &Step::replace(2, 6, Fragment::empty())).unwrap_err();
        assert_eq!(err, TransactionError::CrossesNodeBoundary { from: 2, to: 6 });
    }

    #[test]
    fn delete_range_joins_textblocks() {
        let schema = schema();
        let doc = Node::doc([Node::paragraph("abc"), Node::paragraph("def")]);
        let mut tr = Transform::new(&schema, doc);
        tr.delete_range(2, 7).unwrap();
        assert_eq!(tr.doc().child_count(), 1);
        assert_eq!(tr.doc().text_content(), "aef");
    }

    #[test]
    fn marks_split_text_at_range_edges() {
        let schema = schema();
        let doc = Node::doc([Node::paragraph("abcd")]);
        let doc = apply_step(&doc, &schema, &Step::add_mark(2, 4, Mark::new("bold"))).unwrap();
        let para = doc.child(0).unwrap();
        assert_eq!(para.child_count(), 3);
        assert!(para.child(1).unwrap().has_mark("bold"));
        assert_eq!(para.child(1).unwrap().as_text(), Some("bc"));
    }
}
