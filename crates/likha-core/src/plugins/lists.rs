use serde_json::Value;

use crate::commands;
use crate::model::Attrs;
use crate::plugin::{CommandSpec, Keymap, Plugin};

fn list_active(name: &'static str, list_kind: &'static str) -> CommandSpec {
    CommandSpec::query(name, move |cx, _| {
        let active = commands::active_list(cx.state).is_some_and(|kind| kind == list_kind);
        Ok(Value::Bool(active))
    })
}

fn toggle_list(name: &'static str, list_kind: &'static str) -> CommandSpec {
    CommandSpec::toggle(name, move |cx, _| {
        Ok(commands::toggle_list(cx.state, list_kind, Attrs::default()))
    })
}

pub struct BulletListPlugin;

impl Plugin for BulletListPlugin {
    fn name(&self) -> &'static str {
        "bulletList"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle_list("toggleBulletList", "bullet_list")
                .description("Wrap the selected blocks in a bullet list, or lift them out.")
                .keywords(["list", "bullet", "ul"]),
            list_active("isBulletListActive", "bullet_list"),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new().bind("Ctrl-Shift-8", "toggleBulletList")
    }
}

pub struct OrderedListPlugin;

impl Plugin for OrderedListPlugin {
    fn name(&self) -> &'static str {
        "orderedList"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle_list("toggleOrderedList", "ordered_list")
                .description("Wrap the selected blocks in a numbered list, or lift them out.")
                .keywords(["list", "numbered", "ol"]),
            list_active("isOrderedListActive", "ordered_list"),
            CommandSpec::toggle("liftListItem", |cx, _| {
                Ok(commands::lift_list_item(cx.state))
            }),
            CommandSpec::insert("splitListItem", |cx, _| {
                Ok(commands::split_list_item(cx.state))
            }),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Ctrl-Shift-9", "toggleOrderedList")
            .bind("Mod-]", "liftListItem")
            .bind("Enter", "splitListItem")
    }
}
