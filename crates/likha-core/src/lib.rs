mod content;
mod editor;
mod model;
mod ops;
mod plugin;
mod resolve;
mod rich_text;
mod schema;
mod selection;
mod serde_value;
mod state;
mod transform;

pub mod commands;
pub mod html;
pub mod plugins;

pub use crate::content::*;
pub use crate::editor::*;
pub use crate::model::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::resolve::*;
pub use crate::rich_text::*;
pub use crate::schema::*;
pub use crate::selection::*;
pub use crate::serde_value::*;
pub use crate::state::*;
pub use crate::transform::*;
