use serde_json::{Value, json};

use crate::commands;
use crate::model::Mark;
use crate::plugin::{CommandSpec, Plugin};
use crate::state::EditorState;

fn mark_color(state: &EditorState, kind: &str) -> Value {
    commands::find_mark(state, kind)
        .and_then(|mark| mark.attrs.get("color").cloned())
        .unwrap_or(Value::Null)
}

/// Whether a `kind` mark is present, and when `color` is given, whether it
/// has that color.
fn color_active(state: &EditorState, kind: &str, color: Option<&str>) -> bool {
    match (mark_color(state, kind), color) {
        (Value::Null, _) => false,
        (_, None) => true,
        (current, Some(color)) => current == json!(color),
    }
}

pub struct TextColorPlugin;

impl Plugin for TextColorPlugin {
    fn name(&self) -> &'static str {
        "text-color"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setTextColor", |cx, args| {
                let color = args.str(0)?;
                Ok(commands::set_mark(
                    cx.state,
                    Mark::new("text_color").with_attr("color", color),
                ))
            })
            .keywords(["color", "foreground"])
            .args_example(json!(["#ff0000"])),
            CommandSpec::set_attribute("removeTextColor", |cx, _| {
                Ok(commands::remove_mark(cx.state, Some("text_color")))
            }),
            CommandSpec::query("getTextColor", |cx, _| {
                Ok(mark_color(cx.state, "text_color"))
            }),
            CommandSpec::query("isTextColorActive", |cx, args| {
                Ok(Value::Bool(color_active(
                    cx.state,
                    "text_color",
                    args.opt_str(0)?,
                )))
            }),
        ]
    }
}

pub struct HighlightPlugin;

impl Plugin for HighlightPlugin {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setHighlight", |cx, args| {
                let color = args
                    .opt_str(0)?
                    .unwrap_or(cx.config.default_highlight_color.as_str());
                Ok(commands::set_mark(
                    cx.state,
                    Mark::new("highlight").with_attr("color", color),
                ))
            })
            .keywords(["highlight", "background", "marker"])
            .args_example(json!(["yellow"])),
            CommandSpec::set_attribute("removeHighlight", |cx, _| {
                Ok(commands::remove_mark(cx.state, Some("highlight")))
            }),
            CommandSpec::query("getHighlight", |cx, _| Ok(mark_color(cx.state, "highlight"))),
            CommandSpec::query("isHighlightActive", |cx, args| {
                Ok(Value::Bool(color_active(
                    cx.state,
                    "highlight",
                    args.opt_str(0)?,
                )))
            }),
            CommandSpec::toggle("toggleHighlight", |cx, args| {
                let color = args
                    .opt_str(0)?
                    .unwrap_or(cx.config.default_highlight_color.as_str());
                if color_active(cx.state, "highlight", Some(color)) {
                    return Ok(commands::remove_mark(cx.state, Some("highlight")));
                }
                Ok(commands::set_mark(
                    cx.state,
                    Mark::new("highlight").with_attr("color", color),
                ))
            }),
        ]
    }
}
