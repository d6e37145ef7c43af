//! Stateless editing commands. Each reads an [`EditorState`] and either
//! returns the transaction that performs the edit, or `None` when it does
//! not apply to the current selection.

mod block;
mod insert;
mod list;
mod marks;
mod wrap;

use tracing::debug;

pub use block::{
    block_attr, is_block_active, is_within, node_in_selection, set_attrs_at, set_block_type,
    set_node_attribute, toggle_block_type,
};
pub use insert::{
    delete_selection, insert_horizontal_rule, insert_image, insert_node, insert_table,
    insert_text, select_all,
};
pub use list::{active_list, lift_list_item, split_list_item, toggle_list, wrap_in_list};
pub use marks::{
    clear_formatting, find_mark, is_mark_active, remove_mark, set_mark, toggle_mark,
};
pub use wrap::{lift, toggle_wrap, wrap_in};

use crate::transform::TransactionError;

/// Logs why a command could not build its transaction and turns the
/// failure into "not applicable".
pub(crate) fn attempt<T>(command: &str, result: Result<T, TransactionError>) -> Option<T> {
    result
        .inspect_err(|err| debug!(command, %err, "command not applicable"))
        .ok()
}
