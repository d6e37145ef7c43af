use crate::model::{Attrs, Mark, Node};
use crate::ops::Transaction;
use crate::schema::Schema;
use crate::state::EditorState;
use crate::transform::{Transform, TransactionError};

use super::attempt;

/// Removes `kind` when every text position of the selection already has
/// it, otherwise adds it to the whole selection. Does nothing on an empty
/// selection.
pub fn toggle_mark(state: &EditorState, kind: &str, attrs: Attrs) -> Option<Transaction> {
    let selection = state.selection;
    if selection.is_empty() {
        return None;
    }
    let (from, to) = (selection.from(), selection.to());
    let schema = &*state.schema;
    let mut has_text = false;
    let mut all = true;
    state.doc.nodes_between(from, to, |node, _, parent, _| {
        if node.is_text() && allows(schema, parent, kind) {
            has_text = true;
            all &= node.has_mark(kind);
        }
        true
    });
    if !has_text {
        return None;
    }
    let mut tr = state.transform();
    let result = if all {
        tr.remove_mark(from, to, Some(kind)).map(drop)
    } else {
        schema
            .mark(kind, attrs)
            .and_then(|mark| tr.add_mark(from, to, mark).map(drop))
    };
    attempt("toggle_mark", result)?;
    Some(tr.into_transaction())
}

/// Adds `mark` to the selected text, replacing a mark of the same type.
pub fn set_mark(state: &EditorState, mark: Mark) -> Option<Transaction> {
    let selection = state.selection;
    if selection.is_empty() {
        return None;
    }
    let mut tr = state.transform();
    let result = state
        .schema
        .mark(&mark.kind, mark.attrs)
        .and_then(|mark| tr.add_mark(selection.from(), selection.to(), mark).map(drop));
    attempt("set_mark", result)?;
    Some(tr.into_transaction())
}

/// Strips `kind` (or every mark) from the selection. With an empty
/// selection, the run of `kind` around the cursor is cleared instead.
pub fn remove_mark(state: &EditorState, kind: Option<&str>) -> Option<Transaction> {
    let selection = state.selection;
    let (from, to) = if selection.is_empty() {
        mark_extent(state, selection.head(), kind?)?
    } else {
        (selection.from(), selection.to())
    };
    let mut tr = state.transform();
    attempt("remove_mark", tr.remove_mark(from, to, kind).map(drop))?;
    Some(tr.into_transaction())
}

/// Whether any text in the selection carries `kind`; for an empty
/// selection, whether typed text would get it.
pub fn is_mark_active(state: &EditorState, kind: &str) -> bool {
    let selection = state.selection;
    if selection.is_empty() {
        return state.selection_marks().iter().any(|m| m.kind == kind);
    }
    let mut active = false;
    state
        .doc
        .nodes_between(selection.from(), selection.to(), |node, _, _, _| {
            active |= node.has_mark(kind);
            !active
        });
    active
}

/// The first mark of type `kind` in the selection, or at the cursor.
pub fn find_mark(state: &EditorState, kind: &str) -> Option<Mark> {
    let selection = state.selection;
    if selection.is_empty() {
        return state.selection_marks().into_iter().find(|m| m.kind == kind);
    }
    let mut found = None;
    state
        .doc
        .nodes_between(selection.from(), selection.to(), |node, _, _, _| {
            if found.is_none() {
                found = node.marks().iter().find(|m| m.kind == kind).cloned();
            }
            found.is_none()
        });
    found
}

/// Removes every mark from the selection and turns the textblocks it
/// touches back into paragraphs.
pub fn clear_formatting(state: &EditorState) -> Option<Transaction> {
    let selection = state.selection;
    let mut tr = state.transform();
    attempt(
        "clear_formatting",
        clear(&mut tr, selection.from(), selection.to()),
    )?;
    if tr.doc() == &state.doc {
        return None;
    }
    let after = selection.remap_by_textblocks(&state.doc, tr.doc(), &state.schema);
    Some(tr.into_transaction().selection_after(after))
}

fn clear(tr: &mut Transform<'_>, from: usize, to: usize) -> Result<(), TransactionError> {
    if from < to {
        tr.remove_mark(from, to, None)?;
    }
    let schema = tr.schema();
    let mut retype = false;
    tr.doc().nodes_between(from, to, |node, _, _, _| {
        if schema.is_textblock(node) {
            retype |= node.kind() != "paragraph";
            return false;
        }
        true
    });
    if retype {
        tr.set_block_type(from, to, "paragraph", &Attrs::default())?;
    }
    Ok(())
}

fn allows(schema: &Schema, parent: &Node, kind: &str) -> bool {
    schema
        .node_type(parent.kind())
        .is_some_and(|t| t.allows_mark(kind))
}

/// Range of the text run carrying `kind` that touches `pos`.
fn mark_extent(state: &EditorState, pos: usize, kind: &str) -> Option<(usize, usize)> {
    let rpos = state.resolve(pos).ok()?;
    let parent = rpos.parent();
    let start = rpos.start(rpos.depth());
    let offset = rpos.parent_offset;
    let mut run: Option<(usize, usize)> = None;
    let mut at = 0;
    for child in parent.content() {
        let end = at + child.node_size();
        if child.has_mark(kind) {
            run = match run {
                Some((run_start, run_end)) if run_end == at => Some((run_start, end)),
                _ => Some((at, end)),
            };
        } else if run.is_some_and(|(_, run_end)| run_end < offset) {
            run = None;
        }
        if let Some((run_start, run_end)) = run {
            if run_start <= offset && offset <= run_end && !child.has_mark(kind) {
                break;
            }
        }
        at = end;
    }
    run.filter(|(run_start, run_end)| *run_start <= offset && offset <= *run_end)
        .map(|(run_start, run_end)| (start + run_start, start + run_end))
}
