use serde_json::{Value, json};

use crate::commands;
use crate::model::{Attrs, Node};
use crate::ops::Transaction;
use crate::plugin::{CommandArgs, CommandError, CommandSpec, Keymap, Plugin};
use crate::state::EditorState;

pub struct HorizontalRulePlugin;

impl Plugin for HorizontalRulePlugin {
    fn name(&self) -> &'static str {
        "horizontalRule"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::insert("insertHorizontalRule", |cx, _| {
                Ok(commands::insert_horizontal_rule(cx.state))
            })
            .description("Insert a horizontal rule.")
            .keywords(["hr", "divider", "rule"]),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new().bind("Mod-_", "insertHorizontalRule")
    }
}

pub struct TablePlugin;

fn dimension(args: &CommandArgs, index: usize, default: usize) -> Result<Option<usize>, CommandError> {
    Ok(match args.opt_i64(index)? {
        None => Some(default),
        Some(n) if n > 0 => usize::try_from(n).ok(),
        Some(_) => None,
    })
}

impl Plugin for TablePlugin {
    fn name(&self) -> &'static str {
        "table"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::insert("insertTable", |cx, args| {
                let rows = dimension(args, 0, cx.config.default_table_rows)?;
                let cols = dimension(args, 1, cx.config.default_table_cols)?;
                let (Some(rows), Some(cols)) = (rows, cols) else {
                    return Ok(None);
                };
                Ok(commands::insert_table(cx.state, rows, cols))
            })
            .description("Insert a table of empty cells.")
            .keywords(["table", "grid"])
            .args_example(json!([3, 3])),
            CommandSpec::query("isInTable", |cx, _| {
                Ok(Value::Bool(commands::is_within(cx.state, "table")))
            }),
            CommandSpec::set_attribute("setCellAttribute", |cx, args| {
                let name = args.str(0)?;
                let value = args.value(1)?;
                Ok(commands::set_node_attribute(cx.state, name, value, |node| {
                    matches!(node.kind(), "table_cell" | "table_header")
                }))
            })
            .args_example(json!(["colspan", 2])),
        ]
    }
}

pub struct ImagePlugin;

/// The image under a node selection, or the one right before the cursor.
fn selected_image(state: &EditorState) -> Option<(usize, Node)> {
    let selection = state.selection;
    if selection.is_node() {
        let node = state.doc.node_at(selection.from())?;
        return (node.kind() == "image").then(|| (selection.from(), node.clone()));
    }
    let rpos = state.resolve(selection.from()).ok()?;
    let before = rpos.node_before()?;
    (before.kind() == "image").then(|| (selection.from() - before.node_size(), before))
}

fn set_image_attrs(state: &EditorState, patch: Attrs) -> Option<Transaction> {
    let (pos, _) = selected_image(state)?;
    commands::set_attrs_at(state, pos, patch)
}

fn image_src(state: &EditorState) -> Value {
    selected_image(state)
        .and_then(|(_, image)| image.attr("src").cloned())
        .unwrap_or(Value::Null)
}

impl Plugin for ImagePlugin {
    fn name(&self) -> &'static str {
        "image"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::insert("insertImage", |cx, args| {
                let src = args.str(0)?;
                if src.is_empty() {
                    return Ok(None);
                }
                Ok(commands::insert_image(
                    cx.state,
                    src,
                    args.opt_str(1)?,
                    args.opt_str(2)?,
                ))
            })
            .description("Insert an image at the cursor.")
            .args_example(json!(["/cat.png", "A cat"])),
            CommandSpec::set_attribute("setImageSize", |cx, args| {
                let mut patch = Attrs::new();
                if let Some(width) = args.opt_number(0)? {
                    patch.insert("width".to_string(), width);
                }
                if let Some(height) = args.opt_number(1)? {
                    patch.insert("height".to_string(), height);
                }
                Ok(set_image_attrs(cx.state, patch))
            })
            .args_example(json!([320, 200])),
            CommandSpec::set_attribute("setImageAlt", |cx, args| {
                let alt = args.str(0)?;
                Ok(set_image_attrs(
                    cx.state,
                    Attrs::from([("alt".to_string(), json!(alt))]),
                ))
            }),
            CommandSpec::query("getImageSrc", |cx, _| Ok(image_src(cx.state))),
            CommandSpec::query("isImageSelected", |cx, _| {
                Ok(Value::Bool(selected_image(cx.state).is_some()))
            }),
        ]
    }
}
