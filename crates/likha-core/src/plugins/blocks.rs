use serde_json::{Value, json};

use crate::commands;
use crate::model::Attrs;
use crate::plugin::{CommandArgs, CommandError, CommandSpec, Keymap, Plugin};
use crate::rich_text::ALIGNMENTS;
use crate::state::EditorState;

use super::attrs;

pub struct HeadingPlugin;

fn heading_level(args: &CommandArgs) -> Result<i64, CommandError> {
    let level = args.i64(0)?;
    if !(1..=6).contains(&level) {
        return Err(args.invalid(format!("heading level must be 1 to 6, got {level}")));
    }
    Ok(level)
}

impl Plugin for HeadingPlugin {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setHeading", |cx, args| {
                let level = heading_level(args)?;
                Ok(commands::set_block_type(
                    cx.state,
                    "heading",
                    &attrs([("level", json!(level))]),
                ))
            })
            .description("Turn the selected blocks into headings.")
            .args_example(json!([2])),
            CommandSpec::set_attribute("setParagraph", |cx, _| {
                Ok(commands::set_block_type(cx.state, "paragraph", &Attrs::default()))
            }),
            CommandSpec::toggle("toggleHeading", |cx, args| {
                let level = heading_level(args)?;
                Ok(commands::toggle_block_type(
                    cx.state,
                    "heading",
                    &attrs([("level", json!(level))]),
                ))
            })
            .args_example(json!([1])),
            CommandSpec::query("isHeadingActive", |cx, args| {
                let wanted = match args.get(0) {
                    Some(_) => attrs([("level", json!(heading_level(args)?))]),
                    None => Attrs::default(),
                };
                Ok(Value::Bool(commands::is_block_active(
                    cx.state, "heading", &wanted,
                )))
            }),
        ]
    }

    fn keymap(&self) -> Keymap {
        (1..=6).fold(Keymap::new(), |keymap, level| {
            keymap.bind_with(format!("Ctrl-Alt-{level}"), "toggleHeading", vec![json!(level)])
        })
    }
}

pub struct BlockquotePlugin;

impl Plugin for BlockquotePlugin {
    fn name(&self) -> &'static str {
        "blockquote"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::toggle("toggleBlockquote", |cx, _| {
                Ok(commands::toggle_wrap(cx.state, "blockquote", Attrs::default()))
            })
            .description("Wrap the selected blocks in a quote, or unwrap them."),
            CommandSpec::query("isBlockquoteActive", |cx, _| {
                Ok(Value::Bool(commands::is_within(cx.state, "blockquote")))
            }),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Ctrl->", "toggleBlockquote")
            .bind("Ctrl-Shift-b", "toggleBlockquote")
    }
}

pub struct CodeBlockPlugin;

fn code_block_attrs(args: &CommandArgs) -> Result<Attrs, CommandError> {
    let language = args.opt_str(0)?.map_or(Value::Null, Value::from);
    Ok(attrs([("language", language)]))
}

impl Plugin for CodeBlockPlugin {
    fn name(&self) -> &'static str {
        "code-block"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setCodeBlock", |cx, args| {
                Ok(commands::set_block_type(
                    cx.state,
                    "code_block",
                    &code_block_attrs(args)?,
                ))
            })
            .description("Turn the selected blocks into a code block.")
            .args_example(json!(["rust"])),
            CommandSpec::toggle("toggleCodeBlock", |cx, args| {
                if commands::node_in_selection(cx.state, "code_block") {
                    return Ok(commands::set_block_type(
                        cx.state,
                        "paragraph",
                        &Attrs::default(),
                    ));
                }
                Ok(commands::set_block_type(
                    cx.state,
                    "code_block",
                    &code_block_attrs(args)?,
                ))
            }),
            CommandSpec::query("isCodeBlockActive", |cx, _| {
                Ok(Value::Bool(commands::node_in_selection(cx.state, "code_block")))
            }),
            CommandSpec::query("getCodeBlockLanguage", |cx, _| {
                if !commands::is_block_active(cx.state, "code_block", &Attrs::default()) {
                    return Ok(Value::Null);
                }
                Ok(commands::block_attr(cx.state, "language").unwrap_or(Value::Null))
            }),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Mod-Alt-c", "toggleCodeBlock")
            .bind("Shift-Ctrl-\\", "toggleCodeBlock")
    }
}

pub struct TextAlignPlugin;

fn align_command(name: &'static str, align: &'static str) -> CommandSpec {
    CommandSpec::set_attribute(name, move |cx, _| {
        Ok(commands::set_node_attribute(
            cx.state,
            "align",
            json!(align),
            |_| true,
        ))
    })
}

fn current_align(state: &EditorState) -> Value {
    commands::block_attr(state, "align").unwrap_or_else(|| json!("left"))
}

impl Plugin for TextAlignPlugin {
    fn name(&self) -> &'static str {
        "text-alignment"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setTextAlign", |cx, args| {
                let align = args.str(0)?;
                if !ALIGNMENTS.contains(&align) {
                    return Err(args.invalid(format!("unknown alignment `{align}`")));
                }
                Ok(commands::set_node_attribute(
                    cx.state,
                    "align",
                    json!(align),
                    |_| true,
                ))
            })
            .description("Align the selected paragraphs and headings.")
            .args_example(json!(["center"])),
            align_command("setAlignLeft", "left"),
            align_command("setAlignCenter", "center"),
            align_command("setAlignRight", "right"),
            align_command("setAlignJustify", "justify"),
            CommandSpec::query("getTextAlign", |cx, _| Ok(current_align(cx.state))),
            CommandSpec::query("isAlignActive", |cx, args| {
                let align = args.str(0)?;
                Ok(Value::Bool(current_align(cx.state) == json!(align)))
            }),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Mod-Shift-l", "setAlignLeft")
            .bind("Mod-Shift-e", "setAlignCenter")
            .bind("Mod-Shift-r", "setAlignRight")
            .bind("Mod-Shift-j", "setAlignJustify")
    }
}
