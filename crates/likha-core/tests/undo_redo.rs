use likha_core::plugins;
use likha_core::{
    Editor, EditorConfig, Mark, Node, Selection, Step, Transaction, TransactionError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn editor(html: &str) -> Editor {
    Editor::builder()
        .content(html)
        .plugins(plugins::rich_text())
        .build()
}

#[test]
fn undo_and_redo_restore_document_and_selection() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::text(1, 6));
    assert!(!editor.can_undo());

    assert!(editor.bold());
    assert_eq!(editor.get_html(), "<p><strong>Hello</strong></p>");
    assert!(editor.can_undo());

    assert!(editor.undo());
    assert_eq!(editor.get_html(), "<p>Hello</p>");
    assert_eq!(editor.selection(), Selection::text(1, 6));
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(editor.get_html(), "<p><strong>Hello</strong></p>");
    assert!(!editor.can_redo());
}

#[test]
fn undo_commands_and_keys_go_through_the_history() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::text(1, 6));
    assert!(editor.handle_key("Mod-b"));

    assert_eq!(editor.execute_command("undo", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>Hello</p>");
    assert_eq!(editor.execute_command("undo", vec![]), json!(false));

    assert!(editor.handle_key("Mod-Shift-z"));
    assert_eq!(editor.get_html(), "<p><strong>Hello</strong></p>");
}

#[test]
fn new_edit_drops_the_redo_stack() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::text(1, 6));
    assert!(editor.bold());
    assert!(editor.undo());

    assert!(editor.italic());
    assert!(!editor.can_redo());
    assert_eq!(editor.get_html(), "<p><em>Hello</em></p>");
}

#[test]
fn selection_only_and_opted_out_transactions_are_not_recorded() {
    let mut editor = editor("<p>Hello</p>");

    assert_eq!(editor.execute_command("selectAll", vec![]), json!(true));
    assert_eq!(editor.selection(), Selection::text(1, 6));
    assert!(!editor.can_undo());

    let mut tr = editor.state().transform();
    tr.insert_text(6, "!", &[]).unwrap();
    let tx = tr.into_transaction().without_history();
    editor.dispatch(tx).unwrap();
    assert_eq!(editor.get_html(), "<p>Hello!</p>");
    assert!(!editor.can_undo());

    editor.dispatch(Transaction::new(vec![])).unwrap();
    assert!(!editor.can_undo());
}

#[test]
fn history_depth_is_bounded_by_config() {
    let config = EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    };
    let mut editor = Editor::builder()
        .content("<p></p>")
        .config(config)
        .build();

    for text in ["a", "b", "c"] {
        assert_eq!(
            editor.execute_command("insertText", vec![json!(text)]),
            json!(true)
        );
    }
    assert_eq!(editor.get_html(), "<p>abc</p>");

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.get_html(), "<p>a</p>");
}

#[test]
fn set_content_forgets_history() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::text(1, 6));
    assert!(editor.bold());

    editor.set_content("<h1>Fresh</h1>");
    assert_eq!(editor.get_html(), "<h1>Fresh</h1>");
    assert!(!editor.can_undo());
    assert_eq!(editor.selection(), Selection::cursor(1));
}

#[test]
fn failing_step_rolls_back_the_whole_transaction() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::text(1, 3));
    let tx = Transaction::new(vec![
        Step::add_mark(1, 3, Mark::new("bold")),
        Step::replace(6, 6, vec![Node::text("!")]),
        Step::replace(2, 99, Vec::<Node>::new()),
    ])
    .selection_after(Selection::cursor(1));

    // The insert has already grown the document when the last step fails.
    assert_eq!(
        editor.dispatch(tx),
        Err(TransactionError::PositionOutOfRange { pos: 99, size: 8 })
    );
    assert_eq!(editor.get_html(), "<p>Hello</p>");
    assert_eq!(editor.selection(), Selection::text(1, 3));
    assert!(!editor.can_undo());
}
