use serde::{Deserialize, Serialize};

use crate::model::Node;
use crate::ops::Mapping;
use crate::resolve::ResolvedPos;
use crate::schema::Schema;

/// Either a text range between two inline positions, or a single atomic
/// node (an image, a rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    Text { anchor: usize, head: usize },
    Node { pos: usize },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn node(pos: usize) -> Self {
        Selection::Node { pos }
    }

    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Text { anchor, .. } => anchor,
            Selection::Node { pos } => pos,
        }
    }

    pub fn head(&self) -> usize {
        match *self {
            Selection::Text { head, .. } => head,
            Selection::Node { pos } => pos + 1,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    pub fn is_empty(&self) -> bool {
        matches!(*self, Selection::Text { anchor, head } if anchor == head)
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Selection::Node { .. })
    }

    /// First place a cursor can go.
    pub fn at_start(doc: &Node, schema: &Schema) -> Self {
        Self::near(doc, schema, 0, 1)
    }

    pub fn at_end(doc: &Node, schema: &Schema) -> Self {
        Self::near(doc, schema, doc.content_size(), -1)
    }

    /// Selects from the first to the last cursor position.
    pub fn all(doc: &Node, schema: &Schema) -> Self {
        let blocks = textblocks(doc, schema);
        match (blocks.first(), blocks.last()) {
            (Some(first), Some(last)) => Selection::text(first.0, last.1),
            _ => Self::at_start(doc, schema),
        }
    }

    /// A valid selection as close as possible to `pos`, searching in the
    /// direction of `bias` first.
    pub fn near(doc: &Node, schema: &Schema, pos: usize, bias: i8) -> Self {
        let pos = pos.min(doc.content_size());
        let blocks = textblocks(doc, schema);
        if let Some((start, end)) = blocks.iter().find(|(s, e)| *s <= pos && pos <= *e) {
            return Selection::cursor(pos.clamp(*start, *end));
        }
        let forward = blocks.iter().find(|(start, _)| *start >= pos).map(|b| b.0);
        let backward = blocks.iter().rev().find(|(_, end)| *end <= pos).map(|b| b.1);
        let found = if bias >= 0 {
            forward.or(backward)
        } else {
            backward.or(forward)
        };
        if let Some(found) = found {
            return Selection::cursor(found);
        }
        match first_atom(doc, schema) {
            Some(atom) => Selection::node(atom),
            None => Selection::cursor(0),
        }
    }

    /// Whether every position of the selection is one a cursor or node
    /// selection may occupy in `doc`.
    pub fn is_valid(&self, doc: &Node, schema: &Schema) -> bool {
        match *self {
            Selection::Text { anchor, head } => {
                is_inline_position(doc, schema, anchor) && is_inline_position(doc, schema, head)
            }
            Selection::Node { pos } => {
                pos < doc.content_size()
                    && doc.node_at(pos).is_some_and(|node| schema.is_atom(node))
            }
        }
    }

    /// The selection if valid in `doc`, otherwise the nearest valid one.
    pub fn validate(self, doc: &Node, schema: &Schema) -> Self {
        if self.is_valid(doc, schema) {
            return self;
        }
        if let Selection::Text { anchor, head } = self {
            if anchor == head {
                return Self::near(doc, schema, head, 1);
            }
            let anchor = Self::near(doc, schema, anchor, 1);
            let head = Self::near(doc, schema, head, -1);
            if let (Selection::Text { anchor, .. }, Selection::Text { head, .. }) = (anchor, head) {
                return Selection::text(anchor, head);
            }
        }
        Self::near(doc, schema, self.head(), 1)
    }

    pub fn map(&self, mapping: &Mapping, doc: &Node, schema: &Schema) -> Self {
        let mapped = match *self {
            Selection::Text { anchor, head } => {
                Selection::text(mapping.map(anchor, 1), mapping.map(head, 1))
            }
            Selection::Node { pos } => Selection::node(mapping.map(pos, 1)),
        };
        mapped.validate(doc, schema)
    }

    /// Carries the selection across a structural edit that keeps the
    /// sequence and text of textblocks intact (wrapping, lifting, retyping)
    /// by locating each end as "n-th textblock, offset".
    pub fn remap_by_textblocks(&self, old_doc: &Node, new_doc: &Node, schema: &Schema) -> Self {
        let Selection::Text { anchor, head } = *self else {
            return self.validate(new_doc, schema);
        };
        let old_blocks = textblocks(old_doc, schema);
        let new_blocks = textblocks(new_doc, schema);
        let remap = |pos: usize| -> Option<usize> {
            let index = old_blocks.iter().position(|(s, e)| *s <= pos && pos <= *e)?;
            let (new_start, new_end) = *new_blocks.get(index)?;
            Some((new_start + (pos - old_blocks[index].0)).min(new_end))
        };
        match (remap(anchor), remap(head)) {
            (Some(anchor), Some(head)) => Selection::text(anchor, head),
            _ => self.validate(new_doc, schema),
        }
    }
}

/// Content ranges of all textblocks, in document order.
pub(crate) fn textblocks(doc: &Node, schema: &Schema) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    doc.descendants(|node, pos, _, _| {
        if schema.is_textblock(node) {
            blocks.push((pos + 1, pos + 1 + node.content_size()));
            return false;
        }
        true
    });
    blocks
}

fn first_atom(doc: &Node, schema: &Schema) -> Option<usize> {
    let mut found = None;
    doc.descendants(|node, pos, _, _| {
        if found.is_some() {
            return false;
        }
        if schema.is_atom(node) {
            found = Some(pos);
            return false;
        }
        true
    });
    found
}

fn is_inline_position(doc: &Node, schema: &Schema, pos: usize) -> bool {
    ResolvedPos::resolve(doc, pos).is_ok_and(|rpos| schema.is_textblock(rpos.parent()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attrs;

    #[test]
    fn start_lands_inside_first_textblock() {
        let schema = Schema::rich_text();
        let doc = Node::doc([
            Node::void("horizontal_rule", Attrs::default()),
            Node::paragraph("a"),
        ]);
        assert_eq!(Selection::at_start(&doc, &schema), Selection::cursor(2));
    }

    #[test]
    fn invalid_positions_snap_to_text() {
        let schema = Schema::rich_text();
        let doc = Node::doc([Node::paragraph("ab"), Node::paragraph("cd")]);
        let fixed = Selection::cursor(4).validate(&doc, &schema);
        assert_eq!(fixed, Selection::cursor(5));
    }

    #[test]
    fn node_selection_requires_atom() {
        let schema = Schema::rich_text();
        let doc = Node::doc([
            Node::paragraph("a"),
            Node::void("horizontal_rule", Attrs::default()),
        ]);
        assert!(Selection::node(3).is_valid(&doc, &schema));
        assert!(!Selection::node(0).is_valid(&doc, &schema));
    }
}
