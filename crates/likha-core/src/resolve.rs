use crate::model::{Mark, Node};
use crate::schema::Schema;
use crate::transform::TransactionError;

#[derive(Debug, Clone)]
struct Level {
    node: Node,
    index: usize,
    start: usize,
    child_start: usize,
}

/// A document position together with the chain of ancestors around it.
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pub pos: usize,
    pub parent_offset: usize,
    levels: Vec<Level>,
}

impl ResolvedPos {
    pub fn resolve(doc: &Node, pos: usize) -> Result<Self, TransactionError> {
        let size = doc.content_size();
        if pos > size {
            return Err(TransactionError::PositionOutOfRange { pos, size });
        }
        let mut levels = Vec::new();
        let mut node = doc.clone();
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node
                .content()
                .find_index(parent_offset)
                .ok_or(TransactionError::PositionOutOfRange { pos, size })?;
            let rem = parent_offset - offset;
            let child = node.child(index).cloned();
            levels.push(Level {
                node,
                index,
                start,
                child_start: start + offset,
            });
            if rem == 0 {
                break;
            }
            let Some(child @ Node::Element(_)) = child else {
                break;
            };
            start += offset + 1;
            parent_offset = rem - 1;
            node = child;
        }
        Ok(Self {
            pos,
            parent_offset,
            levels,
        })
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn doc(&self) -> &Node {
        &self.levels[0].node
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.levels[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let inside = depth == self.depth() && self.text_offset() == 0;
        self.index(depth) + usize::from(!inside)
    }

    /// Position at the start of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position before the ancestor at `depth` (`depth > 0`). One level
    /// below the innermost parent this is the position itself.
    pub fn before(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.start(depth) - 1
        }
    }

    pub fn after(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.end(depth) + 1
        }
    }

    /// Offset into the text node the position points into, 0 between
    /// nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.levels[self.depth()].child_start
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let child = parent.child(self.index(self.depth()))?;
        let offset = self.text_offset();
        Some(if offset > 0 {
            child.cut(offset, child.node_size())
        } else {
            child.clone()
        })
    }

    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return self.parent().child(index).map(|child| child.cut(0, offset));
        }
        index
            .checked_sub(1)
            .and_then(|i| self.parent().child(i))
            .cloned()
    }

    /// Marks that text inserted here would get. Non-inclusive marks do not
    /// extend past their end.
    pub fn marks(&self, schema: &Schema) -> Vec<Mark> {
        let parent = self.parent();
        if parent.content_size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return self
                .parent()
                .child(self.index(self.depth()))
                .map(|child| child.marks().to_vec())
                .unwrap_or_default();
        }
        let index = self.index(self.depth());
        let after = parent.child(index);
        let before = index.checked_sub(1).and_then(|i| parent.child(i));
        let (source, other) = match before {
            Some(before) => (before, after),
            None => match after {
                Some(after) => (after, None),
                None => return Vec::new(),
            },
        };
        source
            .marks()
            .iter()
            .filter(|mark| {
                let inclusive = schema.mark_type(&mark.kind).is_none_or(|t| t.inclusive());
                inclusive || other.is_some_and(|o| o.marks().contains(mark))
            })
            .cloned()
            .collect()
    }

    /// Deepest depth whose node contains `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|d| self.start(*d) <= pos && self.end(*d) >= pos)
            .unwrap_or(0)
    }

    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        self.start(depth)
            + node
                .content()
                .iter()
                .take(index)
                .map(Node::node_size)
                .sum::<usize>()
    }

    /// The range of sibling blocks around this position and `other`.
    pub fn block_range(&self, other: &ResolvedPos, schema: &Schema) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, schema);
        }
        let inline = schema.is_textblock(self.parent());
        let top = if inline || self.pos == other.pos {
            self.depth().checked_sub(1)?
        } else {
            self.depth()
        };
        (0..=top)
            .rev()
            .find(|d| other.pos <= self.end(*d))
            .map(|depth| NodeRange {
                from: self.clone(),
                to: other.clone(),
                depth,
            })
    }
}

/// A flat range of siblings inside the node at `depth`.
#[derive(Debug, Clone)]
pub struct NodeRange {
    pub from: ResolvedPos,
    pub to: ResolvedPos,
    pub depth: usize,
}

impl NodeRange {
    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.parent().content().as_slice()[self.start_index()..self.end_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attrs;

    fn doc() -> Node {
        Node::doc([
            Node::paragraph("ab"),
            Node::element(
                "blockquote",
                Attrs::default(),
                [Node::paragraph("cd")],
            ),
        ])
    }

    #[test]
    fn resolves_into_text() {
        let doc = doc();
        let pos = ResolvedPos::resolve(&doc, 2).unwrap();
        assert_eq!(pos.depth(), 1);
        assert_eq!(pos.parent().kind(), "paragraph");
        assert_eq!(pos.parent_offset, 1);
        assert_eq!(pos.text_offset(), 1);
        assert_eq!(pos.start(1), 1);
        assert_eq!(pos.before(1), 0);
        assert_eq!(pos.after(1), 4);
    }

    #[test]
    fn resolves_nested_positions() {
        let doc = doc();
        let pos = ResolvedPos::resolve(&doc, 7).unwrap();
        assert_eq!(pos.depth(), 2);
        assert_eq!(pos.node(1).kind(), "blockquote");
        assert_eq!(pos.parent().text_content(), "cd");
        assert_eq!(pos.before(1), 4);
        assert_eq!(pos.index(0), 1);
    }

    #[test]
    fn between_blocks_has_depth_zero() {
        let doc = doc();
        let pos = ResolvedPos::resolve(&doc, 4).unwrap();
        assert_eq!(pos.depth(), 0);
        assert_eq!(pos.index(0), 1);
        assert_eq!(pos.node_after().map(|n| n.kind().to_string()).as_deref(), Some("blockquote"));
        assert_eq!(pos.node_before().map(|n| n.kind().to_string()).as_deref(), Some("paragraph"));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let doc = doc();
        assert_eq!(
            ResolvedPos::resolve(&doc, 99).unwrap_err(),
            TransactionError::PositionOutOfRange { pos: 99, size: 10 }
        );
    }
}
