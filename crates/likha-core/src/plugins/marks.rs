use crate::commands;
use crate::model::Attrs;
use crate::plugin::{CommandSpec, Keymap, Plugin};

/// A plugin owning one toggle command for a mark without attributes.
pub struct MarkPlugin {
    name: &'static str,
    mark: &'static str,
    command: &'static str,
    key: &'static str,
}

impl MarkPlugin {
    pub fn underline() -> Self {
        Self {
            name: "underline",
            mark: "underline",
            command: "toggleUnderline",
            key: "Mod-u",
        }
    }

    pub fn strikethrough() -> Self {
        Self {
            name: "strikethrough",
            mark: "strikethrough",
            command: "toggleStrikethrough",
            key: "Mod-Shift-s",
        }
    }

    /// Subscript and superscript exclude each other in the schema, so
    /// toggling one on replaces the other.
    pub fn subscript() -> Self {
        Self {
            name: "subscript",
            mark: "subscript",
            command: "toggleSubscript",
            key: "Mod-,",
        }
    }

    pub fn superscript() -> Self {
        Self {
            name: "superscript",
            mark: "superscript",
            command: "toggleSuperscript",
            key: "Mod-.",
        }
    }
}

impl Plugin for MarkPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mark = self.mark;
        vec![
            CommandSpec::toggle(self.command, move |cx, _| {
                Ok(commands::toggle_mark(cx.state, mark, Attrs::default()))
            })
            .keywords([mark]),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new().bind(self.key, self.command)
    }
}

pub struct ClearFormattingPlugin;

impl Plugin for ClearFormattingPlugin {
    fn name(&self) -> &'static str {
        "clearFormatting"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("clearFormat", |cx, _| {
                Ok(commands::clear_formatting(cx.state))
            })
            .description("Remove every mark and turn the selected blocks into paragraphs.")
            .keywords(["clear", "reset", "plain"]),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new().bind("Mod-\\", "clearFormat")
    }
}
