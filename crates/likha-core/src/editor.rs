use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::commands;
use crate::html::{parse_html, serialize_html};
use crate::model::{Attrs, Node};
use crate::ops::Transaction;
use crate::plugin::{
    CommandArgs, CommandContext, CommandError, CommandHandler, Plugin, PluginContext,
    PluginRegistry,
};
use crate::schema::Schema;
use crate::selection::Selection;
use crate::serde_value::{DocumentError, DocumentValue};
use crate::state::EditorState;
use crate::transform::TransactionError;

fn default_max_undo() -> usize {
    200
}

fn default_table_size() -> usize {
    3
}

fn default_highlight_color() -> String {
    "yellow".to_string()
}

fn default_placeholder() -> String {
    "Start writing...".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_max_undo")]
    pub max_undo: usize,
    #[serde(default = "default_table_size")]
    pub default_table_rows: usize,
    #[serde(default = "default_table_size")]
    pub default_table_cols: usize,
    #[serde(default = "default_highlight_color")]
    pub default_highlight_color: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: default_max_undo(),
            default_table_rows: default_table_size(),
            default_table_cols: default_table_size(),
            default_highlight_color: default_highlight_color(),
            placeholder: default_placeholder(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }

    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = default_max_undo();
        }
        if self.default_table_rows == 0 {
            self.default_table_rows = default_table_size();
        }
        if self.default_table_cols == 0 {
            self.default_table_cols = default_table_size();
        }
        self
    }
}

/// The rendering side of the editor. It is told about every new state and
/// never edits the document itself.
pub trait View: Send {
    fn update(&mut self, state: &EditorState);

    fn destroy(&mut self) {}
}

/// A view that renders nothing, for tests and server-side use.
#[derive(Debug, Default)]
pub struct HeadlessView;

impl View for HeadlessView {
    fn update(&mut self, state: &EditorState) {
        trace!(size = state.doc.content_size(), "headless view updated");
    }
}

/// Installs plugin stylesheets in the host. Called at most once per editor.
pub trait PresentationHook: Send {
    fn install_styles(&mut self, css: &str);
}

/// Document and selection at one point of the history.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub doc: Node,
    pub selection: Selection,
}

pub trait History: Send {
    /// Remembers the state before an edit and forgets anything undone.
    fn record(&mut self, before: Snapshot);
    /// Steps back, keeping `current` for redo.
    fn undo(&mut self, current: Snapshot) -> Option<Snapshot>;
    /// Steps forward again, keeping `current` for undo.
    fn redo(&mut self, current: Snapshot) -> Option<Snapshot>;
    fn clear(&mut self);
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
}

/// Undo history made of whole-document snapshots. Documents share
/// structure, so a snapshot costs only the nodes an edit replaced.
#[derive(Debug)]
pub struct SnapshotHistory {
    max_undo: usize,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl SnapshotHistory {
    pub fn new(max_undo: usize) -> Self {
        Self {
            max_undo,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
}

impl History for SnapshotHistory {
    fn record(&mut self, before: Snapshot) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.remove(0);
        }
    }

    fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[derive(Default)]
pub struct EditorBuilder {
    schema: Option<Arc<Schema>>,
    config: EditorConfig,
    content: Option<String>,
    plugins: Vec<Box<dyn Plugin>>,
    view: Option<Box<dyn View>>,
    history: Option<Box<dyn History>>,
    presentation: Option<Box<dyn PresentationHook>>,
}

impl EditorBuilder {
    pub fn schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial content as HTML.
    pub fn content(mut self, html: impl Into<String>) -> Self {
        self.content = Some(html.into());
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Box<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn view(mut self, view: impl View + 'static) -> Self {
        self.view = Some(Box::new(view));
        self
    }

    pub fn history(mut self, history: impl History + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }

    pub fn presentation(mut self, hook: impl PresentationHook + 'static) -> Self {
        self.presentation = Some(Box::new(hook));
        self
    }

    /// Builds the editor: parses the content, registers the core plugin
    /// followed by the given ones, installs their styles, shows the first
    /// state and initialises every plugin.
    pub fn build(self) -> Editor {
        let schema = self
            .schema
            .unwrap_or_else(|| Arc::new(Schema::rich_text()));
        let config = self.config.with_defaults();
        let doc = parse_html(self.content.as_deref().unwrap_or_default(), &schema);
        let state = EditorState::new(schema, doc);

        let mut registry = PluginRegistry::core();
        for plugin in self.plugins {
            registry.register_plugin(plugin);
        }
        let history = self
            .history
            .unwrap_or_else(|| Box::new(SnapshotHistory::new(config.max_undo)));
        let view = self.view.unwrap_or_else(|| Box::new(HeadlessView));

        let mut editor = Editor {
            state,
            registry,
            config,
            view,
            history,
            destroyed: false,
        };
        if let Some(mut hook) = self.presentation {
            let styles: Vec<String> = editor
                .registry
                .plugins()
                .filter_map(|plugin| plugin.styles(&editor.config))
                .collect();
            if !styles.is_empty() {
                hook.install_styles(&styles.join("\n"));
            }
        }
        editor.view.update(&editor.state);
        for plugin in editor.registry.plugins() {
            plugin.init(editor.plugin_context());
        }
        editor
    }
}

pub struct Editor {
    state: EditorState,
    registry: PluginRegistry,
    config: EditorConfig,
    view: Box<dyn View>,
    history: Box<dyn History>,
    destroyed: bool,
}

impl Editor {
    pub fn builder() -> EditorBuilder {
        EditorBuilder::default()
    }

    /// Editor over the rich-text schema with only the core commands.
    pub fn with_core_plugins() -> Self {
        Self::builder().build()
    }

    /// Editor with every built-in plugin registered.
    pub fn with_rich_text_plugins() -> Self {
        Self::builder()
            .plugins(crate::plugins::rich_text())
            .build()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn schema(&self) -> &Schema {
        &self.state.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.state.selection = selection.validate(&self.state.doc, &self.state.schema);
        self.view.update(&self.state);
    }

    /// Applies `tx` to the current state. A rejected transaction leaves the
    /// editor untouched. Transactions that change the document are recorded
    /// in the history unless they opt out.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<(), TransactionError> {
        let next = self
            .state
            .apply(&tx)
            .inspect_err(|err| debug!(source = ?tx.meta.source, %err, "transaction rejected"))?;
        if !tx.is_empty() && tx.meta.add_to_history {
            self.history.record(self.snapshot());
        }
        trace!(steps = tx.steps.len(), source = ?tx.meta.source, "transaction applied");
        self.state = next;
        self.view.update(&self.state);
        Ok(())
    }

    /// Runs a command by name. Edit commands return whether they applied,
    /// queries their value.
    pub fn run_command(&mut self, name: &str, args: Vec<Value>) -> Result<Value, CommandError> {
        let command = self
            .registry
            .command(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        let args = CommandArgs::new(name, args);
        match command.handler {
            CommandHandler::Edit(handler) => {
                let Some(tx) = handler(self.command_context(), &args)? else {
                    return Ok(Value::Bool(false));
                };
                let tx = if tx.meta.source.is_none() {
                    tx.source(name)
                } else {
                    tx
                };
                self.dispatch(tx)?;
                Ok(Value::Bool(true))
            }
            CommandHandler::Query(handler) => handler(self.command_context(), &args),
            CommandHandler::History(handler) => Ok(Value::Bool(handler(self))),
        }
    }

    /// Like [`Editor::run_command`], but never fails: errors are logged and
    /// reported as `false`.
    pub fn execute_command(&mut self, name: &str, args: Vec<Value>) -> Value {
        match self.run_command(name, args) {
            Ok(value) => value,
            Err(CommandError::Rejected(err)) => {
                debug!(command = name, %err, "command rejected");
                Value::Bool(false)
            }
            Err(err) => {
                warn!(command = name, %err, "command failed");
                Value::Bool(false)
            }
        }
    }

    pub fn query<T>(&mut self, name: &str, args: Vec<Value>) -> Result<T, CommandError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_command(name, args)?;
        serde_json::from_value(value).map_err(|err| CommandError::InvalidResult {
            command: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Runs the command bound to the logical shortcut `key`. Returns false
    /// when nothing is bound or the command did not apply.
    pub fn handle_key(&mut self, key: &str) -> bool {
        let Some(binding) = self.registry.keymap().get(key).cloned() else {
            return false;
        };
        if self.registry.command(&binding.command).is_none() {
            warn!(key, command = %binding.command, "key bound to unknown command");
            return false;
        }
        self.execute_command(&binding.command, binding.args)
            .as_bool()
            .unwrap_or(true)
    }

    pub fn get_html(&self) -> String {
        serialize_html(&self.state.doc, &self.state.schema)
    }

    /// Plain text, one line per textblock.
    pub fn get_text(&self) -> String {
        let doc = &self.state.doc;
        doc.text_between(0, doc.content_size(), "\n", |node| {
            if node.kind() == "hard_break" {
                "\n".to_string()
            } else {
                String::new()
            }
        })
    }

    /// Replaces the document with parsed `html`, puts the cursor at the
    /// start and forgets the history.
    pub fn set_content(&mut self, html: &str) {
        let doc = parse_html(html, &self.state.schema);
        self.replace_doc(doc);
    }

    /// Replaces the document with a deserialised one after checking its
    /// envelope and checking the tree against the schema.
    pub fn set_document(&mut self, value: DocumentValue) -> Result<(), DocumentError> {
        let doc = value.into_document()?;
        if doc.kind() != "doc" {
            return Err(TransactionError::ContentMismatch {
                node: doc.kind().to_string(),
            }
            .into());
        }
        self.state.schema.check_node(&doc)?;
        self.replace_doc(doc);
        Ok(())
    }

    pub fn to_value(&self) -> DocumentValue {
        DocumentValue::from_document(self.state.doc.clone())
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.registry.plugin(name)
    }

    /// Registers and initialises `plugin`. Duplicate names are ignored. The
    /// stylesheet of a plugin registered after construction is not
    /// installed.
    pub fn register_plugin(&mut self, plugin: impl Plugin + 'static) -> bool {
        let name = plugin.name();
        if !self.registry.register_plugin(Box::new(plugin)) {
            return false;
        }
        if let Some(plugin) = self.registry.plugin(name) {
            if plugin.styles(&self.config).is_some() {
                debug!(plugin = name, "styles of late plugin not installed");
            }
            plugin.init(self.plugin_context());
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.snapshot()) else {
            return false;
        };
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.snapshot()) else {
            return false;
        };
        self.restore(next);
        true
    }

    pub fn bold(&mut self) -> bool {
        let tx = commands::toggle_mark(&self.state, "bold", Attrs::default());
        self.dispatch_command("bold", tx)
    }

    pub fn italic(&mut self) -> bool {
        let tx = commands::toggle_mark(&self.state, "italic", Attrs::default());
        self.dispatch_command("italic", tx)
    }

    pub fn code(&mut self) -> bool {
        let tx = commands::toggle_mark(&self.state, "code", Attrs::default());
        self.dispatch_command("code", tx)
    }

    /// Whether `mark` is present in the selection. Unknown marks are never
    /// active.
    pub fn is_active(&self, mark: &str) -> bool {
        self.state.schema.mark_type(mark).is_some() && commands::is_mark_active(&self.state, mark)
    }

    /// Tears down every plugin and the view. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for plugin in self.registry.plugins() {
            plugin.destroy();
        }
        self.view.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn command_context(&self) -> CommandContext<'_> {
        CommandContext {
            state: &self.state,
            config: &self.config,
        }
    }

    fn plugin_context(&self) -> PluginContext<'_> {
        PluginContext {
            schema: &self.state.schema,
            config: &self.config,
            state: &self.state,
        }
    }

    fn dispatch_command(&mut self, name: &str, tx: Option<Transaction>) -> bool {
        match tx {
            Some(tx) => self.dispatch(tx.source(name)).is_ok(),
            None => false,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.state.doc.clone(),
            selection: self.state.selection,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state.doc = snapshot.doc;
        self.state.selection = snapshot
            .selection
            .validate(&self.state.doc, &self.state.schema);
        self.view.update(&self.state);
    }

    fn replace_doc(&mut self, doc: Node) {
        self.state = EditorState::new(Arc::clone(&self.state.schema), doc);
        self.history.clear();
        self.view.update(&self.state);
    }
}
