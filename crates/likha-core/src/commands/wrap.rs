use crate::model::{Attrs, Node};
use crate::ops::Transaction;
use crate::resolve::NodeRange;
use crate::schema::Schema;
use crate::state::EditorState;

use super::{attempt, is_within};

/// Wraps the blocks around the selection in a `kind` node, adding
/// whatever wrappers the content model requires above or below it.
pub fn wrap_in(state: &EditorState, kind: &str, attrs: Attrs) -> Option<Transaction> {
    let schema = &*state.schema;
    let range = selected_range(state)?;
    let (outer, inner) = range_wrapping(schema, &range, kind)?;
    let wrappers: Vec<(String, Attrs)> = outer
        .into_iter()
        .map(|name| (name, Attrs::default()))
        .chain([(kind.to_string(), attrs)])
        .chain(inner.into_iter().map(|name| (name, Attrs::default())))
        .collect();
    let mut tr = state.transform();
    attempt("wrap_in", tr.wrap(&range, &wrappers).map(drop))?;
    let after = state
        .selection
        .remap_by_textblocks(&state.doc, tr.doc(), schema);
    Some(tr.into_transaction().selection_after(after))
}

/// Moves the selected blocks up to the nearest ancestor that can hold
/// them, splitting the nodes in between. Does nothing at the top level,
/// across isolating nodes, or where no ancestor accepts the blocks.
pub fn lift(state: &EditorState) -> Option<Transaction> {
    let schema = &*state.schema;
    let range = selected_range(state)?;
    let target = lift_target(schema, &range)?;
    let mut tr = state.transform();
    attempt("lift", tr.lift(&range, target).map(drop))?;
    let after = state
        .selection
        .remap_by_textblocks(&state.doc, tr.doc(), schema);
    Some(tr.into_transaction().selection_after(after))
}

/// Depth of the closest ancestor whose content expression accepts the
/// nodes of `range` in place of the child they sit in.
fn lift_target(schema: &Schema, range: &NodeRange) -> Option<usize> {
    let moved: Vec<&str> = range.nodes().iter().map(Node::kind).collect();
    for depth in (0..=range.depth).rev() {
        let node = range.from.node(depth);
        let (start, end) = if depth == range.depth {
            (range.start_index(), range.end_index())
        } else {
            let index = range.from.index(depth);
            (index, index + 1)
        };
        let kinds: Vec<&str> = node.content().iter().map(Node::kind).collect();
        if depth < range.depth {
            let replaced = kinds[..start]
                .iter()
                .chain(&moved)
                .chain(&kinds[end..])
                .copied();
            if schema.content_matches(node.kind(), replaced) {
                return Some(depth);
            }
        }
        let isolating = schema
            .node_type(node.kind())
            .is_some_and(|t| t.is_isolating());
        let fits = |kinds: &[&str]| schema.content_matches(node.kind(), kinds.iter().copied());
        let can_cut =
            (start == 0 || fits(&kinds[..start])) && (end == kinds.len() || fits(&kinds[end..]));
        if depth == 0 || isolating || !can_cut {
            return None;
        }
    }
    None
}

/// Lifts out of `kind` when the selection is inside one, otherwise wraps
/// the selection in it.
pub fn toggle_wrap(state: &EditorState, kind: &str, attrs: Attrs) -> Option<Transaction> {
    if is_within(state, kind) {
        lift(state)
    } else {
        wrap_in(state, kind, attrs)
    }
}

pub(crate) fn selected_range(state: &EditorState) -> Option<NodeRange> {
    let from = state.resolve(state.selection.from()).ok()?;
    let to = state.resolve(state.selection.to()).ok()?;
    from.block_range(&to, &state.schema)
}

/// Wrapper types needed outside and inside a `kind` node that replaces
/// the nodes of `range`.
fn range_wrapping(
    schema: &Schema,
    range: &NodeRange,
    kind: &str,
) -> Option<(Vec<String>, Vec<String>)> {
    let parent = range.parent();
    let at = schema.node_type(parent.kind())?.content_match().match_kinds(
        parent
            .content()
            .iter()
            .take(range.start_index())
            .map(Node::kind),
    )?;
    let outer = schema.find_wrapping(at, kind)?;
    let first = range.nodes().first()?;
    let inner = schema.find_wrapping(schema.node_type(kind)?.content_match(), first.kind())?;
    Some((outer, inner))
}
