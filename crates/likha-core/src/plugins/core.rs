use serde_json::{Value, json};

use crate::commands;
use crate::model::Attrs;
use crate::plugin::{CommandSpec, Keymap, Plugin};

/// Basic marks, history, selection and text entry.
pub struct CorePlugin;

fn toggle(name: &'static str, mark: &'static str) -> CommandSpec {
    CommandSpec::toggle(name, move |cx, _| {
        Ok(commands::toggle_mark(cx.state, mark, Attrs::default()))
    })
    .keywords([mark])
}

impl Plugin for CorePlugin {
    fn name(&self) -> &'static str {
        "core"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle("toggleBold", "bold").description("Toggle bold on the selected text."),
            toggle("toggleItalic", "italic").description("Toggle italic on the selected text."),
            toggle("toggleCode", "code").description("Toggle inline code on the selected text."),
            CommandSpec::history("undo", |editor| editor.undo()),
            CommandSpec::history("redo", |editor| editor.redo()),
            CommandSpec::toggle("lift", |cx, _| Ok(commands::lift(cx.state)))
                .description("Move the selected blocks out of their parent."),
            CommandSpec::toggle("selectAll", |cx, _| Ok(commands::select_all(cx.state))),
            CommandSpec::insert("insertText", |cx, args| {
                Ok(commands::insert_text(cx.state, args.str(0)?))
            })
            .args_example(json!(["hello"])),
            CommandSpec::insert("deleteSelection", |cx, _| {
                Ok(commands::delete_selection(cx.state))
            }),
            CommandSpec::query("isActive", |cx, args| {
                let mark = args.str(0)?;
                let known = cx.state.schema.mark_type(mark).is_some();
                Ok(Value::Bool(known && commands::is_mark_active(cx.state, mark)))
            })
            .args_example(json!(["bold"])),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Mod-b", "toggleBold")
            .bind("Mod-i", "toggleItalic")
            .bind("Mod-e", "toggleCode")
            .bind("Mod-z", "undo")
            .bind("Mod-y", "redo")
            .bind("Mod-Shift-z", "redo")
    }
}
