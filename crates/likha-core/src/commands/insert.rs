use serde_json::Value;
use tracing::debug;

use crate::model::{Attrs, Node};
use crate::ops::Transaction;
use crate::resolve::ResolvedPos;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transform::TransactionError;

use super::attempt;

/// Replaces the selection with `node`. Inline nodes leave the cursor after
/// them; for blocks the cursor moves to the first text position inside or
/// after the new block. A leaf block that ends up last in its parent gets
/// an empty paragraph after it so the cursor has somewhere to go.
pub fn insert_node(state: &EditorState, node: Node) -> Option<Transaction> {
    let schema = &*state.schema;
    let inline = schema
        .node_type(node.kind())
        .is_some_and(|t| t.is_inline());
    let size = node.node_size();
    let leaf = schema.node_type(node.kind()).is_some_and(|t| t.is_leaf());
    let mut tr = state.transform();
    let pos = attempt(
        "insert_node",
        tr.replace_selection_with(&state.selection, node),
    )?;
    if inline {
        return Some(
            tr.into_transaction()
                .selection_after(Selection::cursor(pos + size)),
        );
    }
    if leaf {
        let end = pos + size;
        let last = ResolvedPos::resolve(tr.doc(), end)
            .map(|rpos| rpos.node_after().is_none())
            .unwrap_or(false);
        if last {
            let trailing = schema
                .node("paragraph", Attrs::default(), [])
                .and_then(|paragraph| tr.insert(end, vec![paragraph]).map(drop));
            if let Err(err) = trailing {
                debug!(%err, "no trailing paragraph after leaf block");
            }
        }
    }
    let selection = Selection::near(tr.doc(), schema, pos + 1, 1);
    Some(tr.into_transaction().selection_after(selection))
}

/// Inserts a `rows` x `cols` table of empty cells. Zero in either
/// dimension is rejected.
pub fn insert_table(state: &EditorState, rows: usize, cols: usize) -> Option<Transaction> {
    if rows == 0 || cols == 0 {
        return None;
    }
    let table = attempt("insert_table", empty_table(&state.schema, rows, cols))?;
    insert_node(state, table)
}

fn empty_table(schema: &Schema, rows: usize, cols: usize) -> Result<Node, TransactionError> {
    let cell = schema.create_and_fill("table_cell", Attrs::default(), Vec::new())?;
    let row = schema.node("table_row", Attrs::default(), vec![cell; cols])?;
    schema.node("table", Attrs::default(), vec![row; rows])
}

pub fn insert_horizontal_rule(state: &EditorState) -> Option<Transaction> {
    let rule = attempt(
        "insert_horizontal_rule",
        state.schema.node("horizontal_rule", Attrs::default(), []),
    )?;
    insert_node(state, rule)
}

pub fn insert_image(
    state: &EditorState,
    src: &str,
    alt: Option<&str>,
    title: Option<&str>,
) -> Option<Transaction> {
    let mut attrs = Attrs::from([("src".to_string(), Value::from(src))]);
    if let Some(alt) = alt {
        attrs.insert("alt".to_string(), Value::from(alt));
    }
    if let Some(title) = title {
        attrs.insert("title".to_string(), Value::from(title));
    }
    let image = attempt("insert_image", state.schema.node("image", attrs, []))?;
    insert_node(state, image)
}

/// Replaces the selection with `text`, carrying the marks in effect at the
/// start of the selection.
pub fn insert_text(state: &EditorState, text: &str) -> Option<Transaction> {
    if text.is_empty() {
        return None;
    }
    let schema = &*state.schema;
    let (from, to) = (state.selection.from(), state.selection.to());
    let rpos = state.resolve(from).ok()?;
    let allowed = schema.node_type(rpos.parent().kind())?;
    let marks: Vec<_> = rpos
        .marks(schema)
        .into_iter()
        .filter(|mark| allowed.allows_mark(&mark.kind))
        .collect();
    let mut tr = state.transform();
    let result = tr
        .delete_range(from, to)
        .and_then(|tr| tr.insert_text(from, text, &marks))
        .map(drop);
    attempt("insert_text", result)?;
    let cursor = Selection::cursor(from + text.chars().count());
    Some(tr.into_transaction().selection_after(cursor))
}

pub fn delete_selection(state: &EditorState) -> Option<Transaction> {
    let selection = state.selection;
    if selection.is_empty() {
        return None;
    }
    let mut tr = state.transform();
    attempt(
        "delete_selection",
        tr.delete_range(selection.from(), selection.to()).map(drop),
    )?;
    let cursor = Selection::near(tr.doc(), &state.schema, selection.from(), -1);
    Some(tr.into_transaction().selection_after(cursor))
}

/// Selection-only transaction spanning the whole document.
pub fn select_all(state: &EditorState) -> Option<Transaction> {
    let all = Selection::all(&state.doc, &state.schema);
    Some(Transaction::new(Vec::new()).selection_after(all))
}
