use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use likha_core::plugins::{self, PlaceholderPlugin};
use likha_core::{
    CommandError, CommandKind, CommandSpec, Editor, EditorConfig, EditorState, Keymap, Plugin,
    PluginContext, PluginRegistry, PresentationHook, View,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

#[derive(Default)]
struct Counters {
    init: AtomicUsize,
    destroy: AtomicUsize,
}

struct Probe {
    counters: Arc<Counters>,
}

impl Plugin for Probe {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::query("probeSize", |cx, _| {
                Ok(Value::from(cx.state.doc.content_size()))
            }),
            CommandSpec::toggle("probeNothing", |_, _| Ok(None)),
        ]
    }

    fn keymap(&self) -> Keymap {
        Keymap::new()
            .bind("Mod-p", "probeNothing")
            .bind("Mod-q", "missingCommand")
    }

    fn styles(&self, _config: &EditorConfig) -> Option<String> {
        Some(".probe {}".to_string())
    }

    fn init(&self, cx: PluginContext<'_>) {
        assert_eq!(cx.state.doc.child_count(), 1);
        self.counters.init.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.counters.destroy.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct RecordingHook {
    installed: Arc<Mutex<Vec<String>>>,
}

impl PresentationHook for RecordingHook {
    fn install_styles(&mut self, css: &str) {
        self.installed.lock().unwrap().push(css.to_string());
    }
}

#[derive(Clone, Default)]
struct RecordingView {
    updates: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl View for RecordingView {
    fn update(&mut self, _state: &EditorState) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn lifecycle_hooks_run_once() {
    let counters = Arc::new(Counters::default());
    let hook = RecordingHook::default();
    let view = RecordingView::default();
    let mut editor = Editor::builder()
        .content("<p>Hi</p>")
        .plugin(Probe {
            counters: Arc::clone(&counters),
        })
        .plugin(PlaceholderPlugin::new("Type here"))
        .view(view.clone())
        .presentation(hook.clone())
        .build();

    assert_eq!(counters.init.load(Ordering::SeqCst), 1);
    assert_eq!(view.updates.load(Ordering::SeqCst), 1);
    let installed = hook.installed.lock().unwrap().clone();
    assert_eq!(installed.len(), 1);
    assert!(installed[0].contains(".probe {}"));
    assert!(installed[0].contains(r#"content: "Type here";"#));

    editor.destroy();
    editor.destroy();
    assert!(editor.is_destroyed());
    assert_eq!(counters.destroy.load(Ordering::SeqCst), 1);
    assert_eq!(view.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn no_styles_means_no_install() {
    let hook = RecordingHook::default();
    let _editor = Editor::builder().presentation(hook.clone()).build();

    assert!(hook.installed.lock().unwrap().is_empty());
}

#[test]
fn late_registration_initialises_but_skips_styles() {
    let counters = Arc::new(Counters::default());
    let hook = RecordingHook::default();
    let mut editor = Editor::builder().presentation(hook.clone()).build();

    assert!(editor.register_plugin(Probe {
        counters: Arc::clone(&counters),
    }));
    assert!(!editor.register_plugin(Probe {
        counters: Arc::clone(&counters),
    }));
    assert_eq!(counters.init.load(Ordering::SeqCst), 1);
    assert!(hook.installed.lock().unwrap().is_empty());
    assert!(editor.get_plugin("probe").is_some());
    assert_eq!(editor.query::<usize>("probeSize", vec![]).unwrap(), 2);
}

#[test]
fn unknown_commands_report_false() {
    let mut editor = Editor::with_core_plugins();

    assert_eq!(editor.execute_command("toggleBulletList", vec![]), json!(false));
    assert!(matches!(
        editor.run_command("noSuchCommand", vec![]),
        Err(CommandError::UnknownCommand(name)) if name == "noSuchCommand"
    ));
    assert!(editor.get_plugin("bulletList").is_none());
}

#[test]
fn bad_arguments_are_errors_not_panics() {
    let mut editor = Editor::with_rich_text_plugins();

    assert!(matches!(
        editor.run_command("setHeading", vec![json!("two")]),
        Err(CommandError::InvalidArgs { .. })
    ));
    assert!(matches!(
        editor.run_command("setLink", vec![]),
        Err(CommandError::InvalidArgs { .. })
    ));
    assert!(matches!(
        editor.query::<bool>("getCharacterCount", vec![]),
        Err(CommandError::InvalidResult { .. })
    ));
    assert_eq!(editor.execute_command("setHeading", vec![json!("two")]), json!(false));
}

#[test]
fn keymap_dispatches_bound_commands() {
    let counters = Arc::new(Counters::default());
    let mut editor = Editor::builder()
        .content("<p>Title</p>")
        .plugins(plugins::rich_text())
        .plugin(Probe { counters })
        .build();

    assert!(editor.handle_key("Ctrl-Alt-2"));
    assert_eq!(editor.get_html(), "<h2>Title</h2>");
    assert!(editor.handle_key("Ctrl-Alt-2"));
    assert_eq!(editor.get_html(), "<p>Title</p>");

    assert!(!editor.handle_key("Mod-p"));
    assert!(!editor.handle_key("Mod-q"));
    assert!(!editor.handle_key("Hyper-x"));
}

#[test]
fn registry_tables_describe_commands() {
    let registry = PluginRegistry::rich_text();

    assert!(registry.plugin("core").is_some());
    assert!(registry.plugin("table").is_some());
    let Some(toggle) = registry.command("toggleBulletList") else {
        panic!("expected toggleBulletList");
    };
    assert_eq!(toggle.kind, CommandKind::Toggle);
    assert_eq!(registry.command("insertTable").unwrap().kind, CommandKind::Insert);
    assert_eq!(
        registry.command("setTextAlign").unwrap().kind,
        CommandKind::SetAttribute
    );
    assert_eq!(registry.command("getWordCount").unwrap().kind, CommandKind::Query);
    assert_eq!(registry.command("undo").unwrap().kind, CommandKind::History);
    assert_eq!(
        registry.keymap().get("Mod-b").map(|b| b.command.as_str()),
        Some("toggleBold")
    );
}

#[test]
fn character_and_word_counts() {
    let mut editor = Editor::builder()
        .content("<p>Hello brave</p><p>new world</p>")
        .plugins(plugins::rich_text())
        .build();

    assert_eq!(editor.query::<usize>("getCharacterCount", vec![]).unwrap(), 20);
    assert_eq!(editor.query::<usize>("getWordCount", vec![]).unwrap(), 4);
    assert_eq!(editor.query::<bool>("isEmpty", vec![]).unwrap(), false);

    editor.set_content("");
    assert_eq!(editor.query::<bool>("isEmpty", vec![]).unwrap(), true);
    assert_eq!(editor.query::<usize>("getWordCount", vec![]).unwrap(), 0);
}
