use serde_json::Value;

use crate::model::{Attrs, Node};
use crate::ops::Transaction;
use crate::state::EditorState;
use crate::transform::{Transform, TransactionError};

use super::attempt;

/// Retypes every textblock the selection touches. Does nothing when they
/// all already have the requested type and attributes, when `kind` is not
/// a textblock, or when one of them cannot take the new type where it
/// stands (a list item must start with a paragraph). Entering a code
/// block drops marks and inline nodes, turning hard breaks into newlines.
/// Leaving one turns newlines back into hard breaks.
pub fn set_block_type(state: &EditorState, kind: &str, attrs: &Attrs) -> Option<Transaction> {
    let schema = &*state.schema;
    let selection = state.selection;
    let (from, to) = (selection.from(), selection.to());
    let mut applicable = false;
    state.doc.nodes_between(from, to, |node, _, _, _| {
        if schema.is_textblock(node) {
            let same = node.kind() == kind
                && attrs.iter().all(|(name, value)| node.attr(name) == Some(value));
            applicable |= !same;
            return false;
        }
        true
    });
    if !applicable {
        return None;
    }
    let mut tr = state.transform();
    attempt("set_block_type", tr.set_block_type(from, to, kind, attrs))?;
    let after = selection.remap_by_textblocks(&state.doc, tr.doc(), schema);
    Some(tr.into_transaction().selection_after(after))
}

/// Turns the textblock around the cursor back into a paragraph when it
/// already is `kind` with `attrs`, otherwise into `kind`.
pub fn toggle_block_type(state: &EditorState, kind: &str, attrs: &Attrs) -> Option<Transaction> {
    if is_block_active(state, kind, attrs) {
        set_block_type(state, "paragraph", &Attrs::default())
    } else {
        set_block_type(state, kind, attrs)
    }
}

/// Whether the innermost block around the selection start is `kind` and
/// carries every attribute in `attrs`.
pub fn is_block_active(state: &EditorState, kind: &str, attrs: &Attrs) -> bool {
    let Ok(rpos) = state.resolve(state.selection.from()) else {
        return false;
    };
    let parent = rpos.parent();
    parent.kind() == kind && attrs.iter().all(|(name, value)| parent.attr(name) == Some(value))
}

/// Whether some ancestor of the selection start is of type `kind`.
pub fn is_within(state: &EditorState, kind: &str) -> bool {
    let Ok(rpos) = state.resolve(state.selection.from()) else {
        return false;
    };
    (1..=rpos.depth()).any(|depth| rpos.node(depth).kind() == kind)
}

/// Whether a node of type `kind` overlaps the selection (ancestors
/// included).
pub fn node_in_selection(state: &EditorState, kind: &str) -> bool {
    let selection = state.selection;
    let mut found = false;
    state
        .doc
        .nodes_between(selection.from(), selection.to(), |node, _, _, _| {
            found |= node.kind() == kind;
            !found
        });
    found
}

/// Attribute of the innermost block around the selection start.
pub fn block_attr(state: &EditorState, name: &str) -> Option<Value> {
    let rpos = state.resolve(state.selection.from()).ok()?;
    rpos.parent().attr(name).cloned()
}

/// Sets attribute `name` on every node overlapping the selection that
/// declares it and passes `filter`, keeping the other attributes.
pub fn set_node_attribute(
    state: &EditorState,
    name: &str,
    value: Value,
    filter: impl Fn(&Node) -> bool,
) -> Option<Transaction> {
    let schema = &*state.schema;
    let selection = state.selection;
    let mut targets = Vec::new();
    state
        .doc
        .nodes_between(selection.from(), selection.to(), |node, pos, _, _| {
            let declares = !node.is_text()
                && schema
                    .node_type(node.kind())
                    .is_some_and(|t| t.has_attr(name));
            if declares && filter(node) {
                targets.push(pos);
            }
            true
        });
    if targets.is_empty() {
        return None;
    }
    let mut tr = state.transform();
    for pos in targets {
        let patch = Attrs::from([(name.to_string(), value.clone())]);
        attempt("set_node_attribute", set_attrs_in(&mut tr, pos, patch))?;
    }
    Some(tr.into_transaction())
}

/// Merges `patch` into the attributes of the node starting at `pos`.
pub fn set_attrs_at(state: &EditorState, pos: usize, patch: Attrs) -> Option<Transaction> {
    let mut tr = state.transform();
    attempt("set_attrs", set_attrs_in(&mut tr, pos, patch))?;
    Some(tr.into_transaction().selection_after(state.selection))
}

fn set_attrs_in(
    tr: &mut Transform<'_>,
    pos: usize,
    patch: Attrs,
) -> Result<(), TransactionError> {
    let node = tr
        .doc()
        .node_at(pos)
        .filter(|node| !node.is_text())
        .ok_or(TransactionError::NotAnElement { pos })?;
    let mut attrs = tr.schema().node_attrs(node.kind(), node.attrs())?;
    attrs.extend(patch);
    tr.set_node_markup(pos, None, attrs)?;
    Ok(())
}
