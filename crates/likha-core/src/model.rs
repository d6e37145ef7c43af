use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Attrs = BTreeMap<String, Value>;

static EMPTY_ATTRS: Attrs = BTreeMap::new();
static EMPTY_FRAGMENT: LazyLock<Fragment> = LazyLock::new(Fragment::default);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }
}

/// Ordered children of a node.
///
/// Cloning is O(1); edits go through [`Fragment::replace_child`] or build
/// a new fragment, so a previously handed out document never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(Arc<Vec<Node>>);

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a fragment, dropping empty text and joining adjacent text
    /// nodes that carry the same marks.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut out: Vec<Node> = Vec::new();
        for node in nodes {
            if let Node::Text(text) = &node {
                if text.text.is_empty() {
                    continue;
                }
                if let Some(Node::Text(prev)) = out.last_mut() {
                    if prev.marks == text.marks {
                        prev.text.push_str(&text.text);
                        continue;
                    }
                }
            }
            out.push(node);
        }
        Self(Arc::new(out))
    }

    pub fn as_slice(&self) -> &[Node] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.0.as_ref().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.0.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.0.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.last()
    }

    pub fn size(&self) -> usize {
        self.0.iter().map(Node::node_size).sum()
    }

    pub fn text_content(&self) -> String {
        self.0.iter().map(Node::text_content).collect()
    }

    /// Index of the child containing `pos` and the offset at which that
    /// child starts. A position on a child boundary yields the index of
    /// the child after it.
    pub fn find_index(&self, pos: usize) -> Option<(usize, usize)> {
        if pos == 0 {
            return Some((0, 0));
        }
        let mut cur = 0;
        for (index, child) in self.0.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Some((index + 1, end));
                }
                return Some((index, cur));
            }
            cur = end;
        }
        None
    }

    /// Content between two positions; text and elements cut by the range
    /// are trimmed.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size() {
            return self.clone();
        }
        let mut nodes = Vec::new();
        let mut pos = 0;
        for child in self.0.iter() {
            if pos >= to {
                break;
            }
            let size = child.node_size();
            let end = pos + size;
            if end > from {
                let node = if pos >= from && end <= to {
                    child.clone()
                } else {
                    match child {
                        Node::Text(_) => child.cut(from.saturating_sub(pos), (to - pos).min(size)),
                        Node::Element(_) => child.cut(
                            from.saturating_sub(pos + 1),
                            (to - pos - 1).min(child.content_size()),
                        ),
                        Node::Void(_) => child.clone(),
                    }
                };
                nodes.push(node);
            }
            pos = end;
        }
        Fragment::from_nodes(nodes)
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        Fragment::from_nodes(self.iter().chain(other.iter()).cloned())
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.0.clone();
        Arc::make_mut(&mut nodes)[index] = node;
        Fragment(nodes)
    }

    fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F, node_start: usize, parent: &Node)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        let mut pos = 0;
        for (index, child) in self.0.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, index) && child.content_size() > 0
            {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content_size().min(to - start),
                    f,
                    node_start + start,
                    child,
                );
            }
            pos = end;
        }
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: String,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Fragment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// A leaf node: horizontal rule, image, hard break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Node {
    pub fn element(
        kind: impl Into<String>,
        attrs: Attrs,
        children: impl IntoIterator<Item = Node>,
    ) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children: Fragment::from_nodes(children),
        })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn doc(children: impl IntoIterator<Item = Node>) -> Self {
        Node::element("doc", Attrs::default(), children)
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element("paragraph", Attrs::default(), [Node::text(text)])
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Text(_) => "text",
            Node::Void(v) => &v.kind,
        }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            Node::Element(el) => &el.attrs,
            Node::Void(v) => &v.attrs,
            Node::Text(_) => &EMPTY_ATTRS,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs().get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Node::Text(t) => &t.marks,
            _ => &[],
        }
    }

    pub fn has_mark(&self, kind: &str) -> bool {
        self.marks().iter().any(|m| m.kind == kind)
    }

    pub fn content(&self) -> &Fragment {
        match self {
            Node::Element(el) => &el.children,
            _ => &EMPTY_FRAGMENT,
        }
    }

    pub fn child_count(&self) -> usize {
        self.content().child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content().child(index)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Node::Void(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Number of positions the node occupies inside its parent.
    pub fn node_size(&self) -> usize {
        match self {
            Node::Text(t) => t.text.chars().count(),
            Node::Void(_) => 1,
            Node::Element(el) => el.children.size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content().size()
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Void(_) => String::new(),
            Node::Element(el) => el.children.text_content(),
        }
    }

    pub fn same_markup(&self, other: &Node) -> bool {
        self.kind() == other.kind() && self.attrs() == other.attrs() && self.marks() == other.marks()
    }

    /// Copy of an element with new children. Other nodes are returned as is.
    pub fn with_content(&self, children: Fragment) -> Node {
        match self {
            Node::Element(el) => Node::Element(ElementNode {
                kind: el.kind.clone(),
                attrs: el.attrs.clone(),
                children,
            }),
            other => other.clone(),
        }
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        match self {
            Node::Text(t) => Node::text_with_marks(t.text.clone(), marks),
            other => other.clone(),
        }
    }

    /// Part of the node between two offsets into its content (characters
    /// for text).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match self {
            Node::Text(t) => Node::text_with_marks(char_slice(&t.text, from, to), t.marks.clone()),
            Node::Element(el) => self.with_content(el.children.cut(from, to)),
            Node::Void(_) => self.clone(),
        }
    }

    /// The node directly after `pos` (relative to this node's content).
    pub fn node_at(&self, mut pos: usize) -> Option<&Node> {
        let mut node = self;
        loop {
            let (index, offset) = node.content().find_index(pos)?;
            let child = node.child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            node = child;
            pos -= offset + 1;
        }
    }

    /// Calls `f(node, pos, parent, index)` for every descendant overlapping
    /// `from..to`; children are visited only when `f` returns true.
    pub fn nodes_between<F>(&self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.content().nodes_between(from, to, &mut f, 0, self);
    }

    pub fn descendants<F>(&self, f: F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    /// Text between two positions. Elements that directly hold inline
    /// content are separated by `block_separator`; void nodes contribute
    /// `leaf_text(node)`.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: &str,
        leaf_text: impl Fn(&Node) -> String,
    ) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(from, to, |node, pos, _, _| {
            let piece = match node {
                Node::Text(t) => char_slice(&t.text, from.max(pos) - pos, to - pos),
                Node::Void(_) => leaf_text(node),
                Node::Element(_) => String::new(),
            };
            let holds_inline = match node {
                Node::Element(el) => el.children.iter().all(|c| !c.is_element()),
                _ => false,
            };
            if holds_inline && !block_separator.is_empty() {
                if first {
                    first = false;
                } else {
                    text.push_str(block_separator);
                }
            }
            text.push_str(&piece);
            true
        });
        text
    }
}

pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars()
        .skip(from)
        .take(to.saturating_sub(from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Mark {
        Mark::new("bold")
    }

    #[test]
    fn sizes_follow_token_counting() {
        let doc = Node::doc([
            Node::paragraph("héllo"),
            Node::void("horizontal_rule", Attrs::default()),
        ]);
        assert_eq!(doc.child(0).unwrap().node_size(), 7);
        assert_eq!(doc.content_size(), 8);
    }

    #[test]
    fn fragments_join_equal_text_and_drop_empty() {
        let frag = Fragment::from_nodes([
            Node::text("a"),
            Node::text(""),
            Node::text("b"),
            Node::text_with_marks("c", vec![bold()]),
            Node::text_with_marks("d", vec![bold()]),
        ]);
        assert_eq!(frag.child_count(), 2);
        assert_eq!(frag.child(0).unwrap().as_text(), Some("ab"));
        assert_eq!(frag.child(1).unwrap().as_text(), Some("cd"));
    }

    #[test]
    fn cut_splits_text_by_chars() {
        let frag = Fragment::from_nodes([Node::text("ab"), Node::text_with_marks("cd", vec![bold()])]);
        let cut = frag.cut(1, 3);
        assert_eq!(cut.child(0).unwrap().as_text(), Some("b"));
        assert_eq!(cut.child(1).unwrap().as_text(), Some("c"));
    }

    #[test]
    fn clones_share_children() {
        let doc = Node::doc([Node::paragraph("a"), Node::paragraph("b")]);
        let copy = doc.clone();
        let edited = doc.with_content(doc.content().replace_child(1, Node::paragraph("c")));
        assert_eq!(copy.child(1).unwrap().text_content(), "b");
        assert_eq!(edited.child(1).unwrap().text_content(), "c");
        assert!(Arc::ptr_eq(
            &edited.child(0).unwrap().content().0,
            &doc.child(0).unwrap().content().0
        ));
    }

    #[test]
    fn node_at_descends_into_elements() {
        let doc = Node::doc([Node::paragraph("ab"), Node::paragraph("cd")]);
        assert_eq!(doc.node_at(0).map(Node::kind), Some("paragraph"));
        assert_eq!(doc.node_at(1).and_then(Node::as_text), Some("ab"));
        assert_eq!(doc.node_at(4).map(Node::kind), Some("paragraph"));
    }

    #[test]
    fn text_between_separates_blocks() {
        let doc = Node::doc([Node::paragraph("ab"), Node::paragraph("cd")]);
        let text = doc.text_between(0, doc.content_size(), "\n", |_| String::new());
        assert_eq!(text, "ab\ncd");
    }
}
