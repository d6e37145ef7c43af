use crate::model::{Attrs, Fragment, Node};
use crate::ops::Transaction;
use crate::resolve::ResolvedPos;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transform::TransactionError;

use super::attempt;
use super::wrap::selected_range;

const LIST_ITEM: &str = "list_item";

/// Wraps each selected block in a list item inside a new `list_kind`
/// list. A list of the same type directly before or after the range is
/// merged with the new one.
pub fn wrap_in_list(state: &EditorState, list_kind: &str, attrs: Attrs) -> Option<Transaction> {
    let schema = &*state.schema;
    let range = selected_range(state)?;
    let parent = range.parent();
    let (start_index, end_index) = (range.start_index(), range.end_index());
    let (mut start, mut end) = (range.start(), range.end());
    let mut attrs = attrs;
    let mut items = Vec::new();

    if let Some(prev) = start_index
        .checked_sub(1)
        .and_then(|index| parent.child(index))
        .filter(|prev| prev.kind() == list_kind)
    {
        start -= prev.node_size();
        attrs = prev.attrs().clone();
        items.extend(prev.content().iter().cloned());
    }
    for block in range.nodes() {
        let item = attempt(
            "wrap_in_list",
            schema.create_and_fill(LIST_ITEM, Attrs::default(), vec![block.clone()]),
        )?;
        items.push(item);
    }
    if let Some(next) = parent.child(end_index).filter(|next| next.kind() == list_kind) {
        end += next.node_size();
        items.extend(next.content().iter().cloned());
    }

    let mut tr = state.transform();
    let result = schema
        .node(list_kind, attrs, items)
        .and_then(|list| tr.replace(start, end, vec![list]).map(drop));
    attempt("wrap_in_list", result)?;
    let after = state
        .selection
        .remap_by_textblocks(&state.doc, tr.doc(), schema);
    Some(tr.into_transaction().selection_after(after))
}

/// Moves the selected list items out of their list. Items of a nested
/// list become items of the outer list; items of a top-level list are
/// unwrapped into plain blocks, splitting the list around them.
pub fn lift_list_item(state: &EditorState) -> Option<Transaction> {
    let schema = &*state.schema;
    let from = state.resolve(state.selection.from()).ok()?;
    let to = state.resolve(state.selection.to()).ok()?;
    let item_depth = (2..=from.depth())
        .rev()
        .find(|depth| from.node(*depth).kind() == LIST_ITEM)?;
    let list_depth = item_depth - 1;
    let list = from.node(list_depth);
    let first = from.index(list_depth);
    let last = if to.depth() >= item_depth && to.start(list_depth) == from.start(list_depth) {
        to.index(list_depth)
    } else {
        list.child_count() - 1
    };
    let items = list.content().as_slice();
    let (before, lifted, after) = (&items[..first], &items[first..=last], &items[last + 1..]);

    let mut tr = state.transform();
    let nested = list_depth >= 2 && from.node(list_depth - 1).kind() == LIST_ITEM;
    let result = if nested {
        lift_to_outer_list(&from, list_depth, before, lifted, after)
            .and_then(|(start, end, nodes)| tr.replace(start, end, nodes).map(drop))
    } else {
        let mut nodes = Vec::new();
        if !before.is_empty() {
            nodes.push(list.with_content(Fragment::from_nodes(before.to_vec())));
        }
        for item in lifted {
            nodes.extend(item.content().iter().cloned());
        }
        if !after.is_empty() {
            nodes.push(list.with_content(Fragment::from_nodes(after.to_vec())));
        }
        tr.replace(from.before(list_depth), from.after(list_depth), nodes)
            .map(drop)
    };
    attempt("lift_list_item", result)?;
    let after = state
        .selection
        .remap_by_textblocks(&state.doc, tr.doc(), schema);
    Some(tr.into_transaction().selection_after(after))
}

/// Replacement for the outer list item holding the nested list at
/// `list_depth`: the outer item keeps the items before the lifted ones,
/// the lifted items follow it, and the items after them stay nested in
/// the last lifted item.
fn lift_to_outer_list(
    from: &ResolvedPos,
    list_depth: usize,
    before: &[Node],
    lifted: &[Node],
    after: &[Node],
) -> Result<(usize, usize, Vec<Node>), TransactionError> {
    let list = from.node(list_depth);
    let outer_depth = list_depth - 1;
    let outer_item = from.node(outer_depth);
    let index = from.index(outer_depth);

    let mut outer_children = outer_item.content().to_vec();
    if before.is_empty() {
        outer_children.remove(index);
    } else {
        outer_children[index] = list.with_content(Fragment::from_nodes(before.to_vec()));
    }
    let mut nodes = vec![outer_item.with_content(Fragment::from_nodes(outer_children))];

    let mut lifted = lifted.to_vec();
    if !after.is_empty() {
        let last = lifted.pop().ok_or(TransactionError::ContentMismatch {
            node: LIST_ITEM.to_string(),
        })?;
        let mut children = last.content().to_vec();
        children.push(list.with_content(Fragment::from_nodes(after.to_vec())));
        lifted.push(last.with_content(Fragment::from_nodes(children)));
    }
    nodes.extend(lifted);
    Ok((from.before(outer_depth), from.after(outer_depth), nodes))
}

/// Splits the list item around the cursor in two at the cursor. In an
/// empty trailing paragraph the item is lifted out of the list instead.
pub fn split_list_item(state: &EditorState) -> Option<Transaction> {
    let schema = &*state.schema;
    let selection = state.selection;
    if selection.is_node() {
        return None;
    }
    let rpos = state.resolve(selection.from()).ok()?;
    let depth = rpos.depth();
    if depth < 2 || rpos.node(depth - 1).kind() != LIST_ITEM {
        return None;
    }
    let item = rpos.node(depth - 1);
    let index = rpos.index(depth - 1);
    if selection.is_empty()
        && rpos.parent().content_size() == 0
        && index + 1 == item.child_count()
    {
        return lift_list_item(state);
    }

    let mut tr = state.transform();
    attempt(
        "split_list_item",
        tr.delete_range(selection.from(), selection.to()).map(drop),
    )?;
    let rpos = attempt("split_list_item", ResolvedPos::resolve(tr.doc(), selection.from()))?;
    if rpos.depth() != depth {
        return None;
    }
    let item = rpos.node(depth - 1).clone();
    let block = rpos.parent();
    let offset = rpos.parent_offset;
    let head = block.cut(0, offset);
    let tail = block.cut(offset, block.content_size());
    let tail = if tail.kind() == "paragraph" {
        Ok(tail)
    } else {
        schema.node("paragraph", Attrs::default(), tail.content().to_vec())
    };
    let tail = attempt("split_list_item", tail)?;

    let children = item.content().as_slice();
    let mut first = children[..index].to_vec();
    first.push(head);
    let mut second = vec![tail];
    second.extend(children[index + 1..].iter().cloned());
    let first = item.with_content(Fragment::from_nodes(first));
    let second = item.with_content(Fragment::from_nodes(second));

    let item_pos = rpos.before(depth - 1);
    let cursor = item_pos + first.node_size() + 2;
    attempt(
        "split_list_item",
        tr.replace(item_pos, rpos.after(depth - 1), vec![first, second])
            .map(drop),
    )?;
    Some(tr.into_transaction().selection_after(Selection::cursor(cursor)))
}

/// Type of the innermost list around the selection start.
pub fn active_list(state: &EditorState) -> Option<String> {
    let rpos = state.resolve(state.selection.from()).ok()?;
    innermost_list(&rpos).map(|depth| rpos.node(depth).kind().to_string())
}

fn innermost_list(rpos: &ResolvedPos) -> Option<usize> {
    (1..rpos.depth())
        .rev()
        .find(|depth| rpos.node(depth + 1).kind() == LIST_ITEM)
}

/// Lifts the selection out of a `list_kind` list, converts a list of
/// another type into `list_kind`, or wraps the selection in a new list.
pub fn toggle_list(state: &EditorState, list_kind: &str, attrs: Attrs) -> Option<Transaction> {
    let rpos = state.resolve(state.selection.from()).ok()?;
    let Some(list_depth) = innermost_list(&rpos) else {
        return wrap_in_list(state, list_kind, attrs);
    };
    if rpos.node(list_depth).kind() == list_kind {
        return lift_list_item(state);
    }
    let mut tr = state.transform();
    let result = state
        .schema
        .node_attrs(list_kind, &attrs)
        .and_then(|attrs| {
            tr.set_node_markup(rpos.before(list_depth), Some(list_kind), attrs)
                .map(drop)
        });
    attempt("toggle_list", result)?;
    Some(tr.into_transaction())
}
