use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::editor::{Editor, EditorConfig};
use crate::ops::Transaction;
use crate::schema::Schema;
use crate::state::EditorState;
use crate::transform::TransactionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("invalid arguments for `{command}`: {reason}")]
    InvalidArgs { command: String, reason: String },
    #[error("unexpected result from `{command}`: {reason}")]
    InvalidResult { command: String, reason: String },
    #[error("transaction rejected: {0}")]
    Rejected(#[from] TransactionError),
}

/// How a command is meant to be used by a host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Flips a mark or node type on or off.
    Toggle,
    /// Rewrites attributes or applies a value to the selection.
    SetAttribute,
    /// Inserts new content at the selection.
    Insert,
    /// Reads the state; never edits.
    Query,
    /// Moves through the undo history.
    History,
}

/// What a command handler can see: the current state and the editor
/// configuration.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub state: &'a EditorState,
    pub config: &'a EditorConfig,
}

/// Positional arguments of one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    command: String,
    values: Vec<Value>,
}

impl CommandArgs {
    pub fn new(command: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            values,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Argument `index`, treating `null` like a missing argument.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|value| !value.is_null())
    }

    pub fn invalid(&self, reason: impl Into<String>) -> CommandError {
        CommandError::InvalidArgs {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }

    pub fn str(&self, index: usize) -> Result<&str, CommandError> {
        self.opt_str(index)?
            .ok_or_else(|| self.invalid(format!("missing string argument {index}")))
    }

    pub fn opt_str(&self, index: usize) -> Result<Option<&str>, CommandError> {
        match self.get(index) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(format!("argument {index} must be a string, got {other}"))),
        }
    }

    pub fn opt_i64(&self, index: usize) -> Result<Option<i64>, CommandError> {
        match self.get(index) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("argument {index} must be an integer, got {value}"))),
        }
    }

    pub fn i64(&self, index: usize) -> Result<i64, CommandError> {
        self.opt_i64(index)?
            .ok_or_else(|| self.invalid(format!("missing integer argument {index}")))
    }

    pub fn opt_number(&self, index: usize) -> Result<Option<Value>, CommandError> {
        match self.get(index) {
            None => Ok(None),
            Some(value @ Value::Number(_)) => Ok(Some(value.clone())),
            Some(other) => Err(self.invalid(format!("argument {index} must be a number, got {other}"))),
        }
    }

    pub fn value(&self, index: usize) -> Result<Value, CommandError> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| self.invalid(format!("missing argument {index}")))
    }
}

pub type EditFn = dyn Fn(CommandContext<'_>, &CommandArgs) -> Result<Option<Transaction>, CommandError>
    + Send
    + Sync;
pub type QueryFn =
    dyn Fn(CommandContext<'_>, &CommandArgs) -> Result<Value, CommandError> + Send + Sync;
pub type HistoryFn = dyn Fn(&mut Editor) -> bool + Send + Sync;

/// The function behind a command name, tagged by what it is allowed to do.
#[derive(Clone)]
pub enum CommandHandler {
    /// Builds a transaction (`None` when not applicable) that the editor
    /// dispatches.
    Edit(Arc<EditFn>),
    Query(Arc<QueryFn>),
    History(Arc<HistoryFn>),
}

#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub kind: CommandKind,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl CommandSpec {
    fn edit(
        name: impl Into<String>,
        kind: CommandKind,
        handler: impl Fn(CommandContext<'_>, &CommandArgs) -> Result<Option<Transaction>, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: CommandHandler::Edit(Arc::new(handler)),
        }
    }

    pub fn toggle(
        name: impl Into<String>,
        handler: impl Fn(CommandContext<'_>, &CommandArgs) -> Result<Option<Transaction>, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::edit(name, CommandKind::Toggle, handler)
    }

    pub fn set_attribute(
        name: impl Into<String>,
        handler: impl Fn(CommandContext<'_>, &CommandArgs) -> Result<Option<Transaction>, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::edit(name, CommandKind::SetAttribute, handler)
    }

    pub fn insert(
        name: impl Into<String>,
        handler: impl Fn(CommandContext<'_>, &CommandArgs) -> Result<Option<Transaction>, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::edit(name, CommandKind::Insert, handler)
    }

    pub fn query(
        name: impl Into<String>,
        handler: impl Fn(CommandContext<'_>, &CommandArgs) -> Result<Value, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Query,
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: CommandHandler::Query(Arc::new(handler)),
        }
    }

    pub fn history(
        name: impl Into<String>,
        handler: impl Fn(&mut Editor) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::History,
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: CommandHandler::History(Arc::new(handler)),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

/// A command invocation bound to a logical shortcut name such as `Mod-b`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub command: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keymap {
    bindings: BTreeMap<String, KeyBinding>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(self, key: impl Into<String>, command: impl Into<String>) -> Self {
        self.bind_with(key, command, Vec::new())
    }

    pub fn bind_with(
        mut self,
        key: impl Into<String>,
        command: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        self.bindings.insert(
            key.into(),
            KeyBinding {
                command: command.into(),
                args,
            },
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&KeyBinding> {
        self.bindings.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyBinding)> {
        self.bindings.iter().map(|(key, binding)| (key.as_str(), binding))
    }

    /// Adds every binding of `other`, replacing existing ones.
    pub fn extend(&mut self, other: Keymap) {
        self.bindings.extend(other.bindings);
    }
}

/// Read access handed to plugins when they are initialised.
#[derive(Clone, Copy)]
pub struct PluginContext<'a> {
    pub schema: &'a Schema,
    pub config: &'a EditorConfig,
    pub state: &'a EditorState,
}

pub trait Plugin: Send + Sync {
    /// Unique key in the registry.
    fn name(&self) -> &'static str;

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    fn keymap(&self) -> Keymap {
        Keymap::default()
    }

    /// Stylesheet the host should install, if any.
    fn styles(&self, _config: &EditorConfig) -> Option<String> {
        None
    }

    /// Called once, after the editor and its view exist.
    fn init(&self, _cx: PluginContext<'_>) {}

    /// Called once, when the editor is torn down.
    fn destroy(&self) {}
}

/// Plugins by name, in registration order, with their merged command
/// table and keymap.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    commands: HashMap<String, CommandSpec>,
    keymap: Keymap,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn Plugin>>) -> Self {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin);
        }
        registry
    }

    /// Only the always-present core commands.
    pub fn core() -> Self {
        Self::new(crate::plugins::core())
    }

    /// Core plus every built-in rich-text plugin.
    pub fn rich_text() -> Self {
        Self::new(crate::plugins::core().into_iter().chain(crate::plugins::rich_text()))
    }

    /// Adds `plugin` unless one with the same name is already registered,
    /// in which case the new one is ignored. Commands and bindings replace
    /// earlier ones with the same name.
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> bool {
        let name = plugin.name();
        if self.plugin(name).is_some() {
            warn!(plugin = name, "plugin is already registered");
            return false;
        }
        for command in plugin.commands() {
            self.commands.insert(command.name.clone(), command);
        }
        self.keymap.extend(plugin.keymap());
        self.plugins.push(plugin);
        true
    }

    pub fn plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.name() == name)
            .map(|plugin| &**plugin)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|plugin| &**plugin)
    }

    pub fn command(&self, name: &str) -> Option<CommandSpec> {
        self.commands.get(name).cloned()
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }
}
