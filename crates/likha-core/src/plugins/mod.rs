//! Built-in plugins. Each contributes named commands and key bindings on
//! top of the stateless functions in [`crate::commands`].

mod blocks;
mod color;
mod core;
mod insert;
mod link;
mod lists;
mod marks;
mod text;

use serde_json::Value;

use crate::model::Attrs;
use crate::plugin::Plugin;

pub use self::blocks::{BlockquotePlugin, CodeBlockPlugin, HeadingPlugin, TextAlignPlugin};
pub use self::color::{HighlightPlugin, TextColorPlugin};
pub use self::core::CorePlugin;
pub use self::insert::{HorizontalRulePlugin, ImagePlugin, TablePlugin};
pub use self::link::LinkPlugin;
pub use self::lists::{BulletListPlugin, OrderedListPlugin};
pub use self::marks::{ClearFormattingPlugin, MarkPlugin};
pub use self::text::{CharacterCountPlugin, PlaceholderPlugin};

/// The always-present plugin.
pub fn core() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(CorePlugin)]
}

/// Every built-in plugin except [`CorePlugin`].
pub fn rich_text() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(HeadingPlugin),
        Box::new(BulletListPlugin),
        Box::new(OrderedListPlugin),
        Box::new(BlockquotePlugin),
        Box::new(HorizontalRulePlugin),
        Box::new(LinkPlugin),
        Box::new(CodeBlockPlugin),
        Box::new(TextAlignPlugin),
        Box::new(TablePlugin),
        Box::new(ImagePlugin),
        Box::new(TextColorPlugin),
        Box::new(HighlightPlugin),
        Box::new(MarkPlugin::underline()),
        Box::new(MarkPlugin::strikethrough()),
        Box::new(MarkPlugin::subscript()),
        Box::new(MarkPlugin::superscript()),
        Box::new(ClearFormattingPlugin),
        Box::new(CharacterCountPlugin),
        Box::new(PlaceholderPlugin::default()),
    ]
}

fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Attrs {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
