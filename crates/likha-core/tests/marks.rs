use likha_core::plugins;
use likha_core::{Editor, Selection};
use pretty_assertions::assert_eq;
use serde_json::json;

fn editor(html: &str) -> Editor {
    Editor::builder()
        .content(html)
        .plugins(plugins::rich_text())
        .build()
}

#[test]
fn link_can_be_toggled_and_removed() {
    let mut editor = editor("<p>Visit our website</p>");
    editor.set_selection(Selection::text(11, 18));

    assert_eq!(editor.execute_command("toggleLink", vec![]), json!(false));
    assert_eq!(
        editor.execute_command("toggleLink", vec![json!("/home"), json!("Home")]),
        json!(true)
    );
    assert_eq!(
        editor.get_html(),
        r#"<p>Visit our <a href="/home" title="Home">website</a></p>"#
    );
    assert_eq!(editor.query::<bool>("isLinkActive", vec![]).unwrap(), true);

    assert_eq!(editor.execute_command("toggleLink", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>Visit our website</p>");
}

#[test]
fn remove_link_at_cursor_clears_the_whole_run() {
    let mut editor = editor(r#"<p>go <a href="/x">there</a> now</p>"#);
    editor.set_selection(Selection::cursor(6));

    assert_eq!(
        editor.query::<Option<String>>("getLinkHref", vec![]).unwrap(),
        Some("/x".to_string())
    );
    assert_eq!(editor.execute_command("removeLink", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>go there now</p>");
}

#[test]
fn set_link_needs_a_selection() {
    let mut editor = editor("<p>text</p>");

    assert_eq!(
        editor.execute_command("setLink", vec![json!("https://example.com")]),
        json!(false)
    );
    assert_eq!(editor.execute_command("setLink", vec![json!("")]), json!(false));
    assert_eq!(editor.get_html(), "<p>text</p>");
}

#[test]
fn text_color_replaces_previous_color() {
    let mut editor = editor("<p>paint</p>");
    editor.set_selection(Selection::text(1, 6));

    assert_eq!(editor.execute_command("setTextColor", vec![json!("red")]), json!(true));
    assert_eq!(editor.execute_command("setTextColor", vec![json!("#00f")]), json!(true));
    assert_eq!(
        editor.get_html(),
        r##"<p><span style="color: #00f">paint</span></p>"##
    );
    assert_eq!(
        editor.query::<Option<String>>("getTextColor", vec![]).unwrap(),
        Some("#00f".to_string())
    );
    assert_eq!(
        editor.query::<bool>("isTextColorActive", vec![json!("red")]).unwrap(),
        false
    );

    assert_eq!(editor.execute_command("removeTextColor", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>paint</p>");
}

#[test]
fn highlight_uses_configured_default_color() {
    let mut editor = editor("<p>note</p>");
    editor.set_selection(Selection::text(1, 5));

    assert_eq!(editor.execute_command("setHighlight", vec![]), json!(true));
    assert_eq!(
        editor.get_html(),
        r#"<p><mark style="background-color: yellow">note</mark></p>"#
    );
    assert_eq!(
        editor.query::<bool>("isHighlightActive", vec![json!("yellow")]).unwrap(),
        true
    );

    assert_eq!(editor.execute_command("toggleHighlight", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>note</p>");
    assert_eq!(
        editor.execute_command("toggleHighlight", vec![json!("pink")]),
        json!(true)
    );
    assert_eq!(
        editor.query::<Option<String>>("getHighlight", vec![]).unwrap(),
        Some("pink".to_string())
    );
}

#[test]
fn clear_format_strips_marks_and_block_types() {
    let mut editor = editor(
        r#"<h2><strong>Big</strong> <a href="/x">news</a></h2><p><em>more</em></p>"#,
    );
    editor.execute_command("selectAll", vec![]);

    assert_eq!(editor.execute_command("clearFormat", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>Big news</p><p>more</p>");
}

#[test]
fn clear_format_on_plain_text_is_not_applicable() {
    let mut editor = editor("<p>plain</p>");
    assert_eq!(editor.execute_command("clearFormat", vec![]), json!(false));

    editor.execute_command("selectAll", vec![]);
    assert_eq!(editor.execute_command("clearFormat", vec![]), json!(false));
    assert!(!editor.can_undo());
}

#[test]
fn is_active_reports_marks_in_selection() {
    let mut editor = editor("<p><strong>bold</strong> plain</p>");
    editor.set_selection(Selection::text(3, 8));

    assert!(editor.is_active("bold"));
    assert_eq!(editor.query::<bool>("isActive", vec![json!("bold")]).unwrap(), true);
    assert!(!editor.is_active("italic"));
    assert!(!editor.is_active("blink"));

    // Part of the range is plain, so the toggle adds bold everywhere.
    assert!(editor.bold());
    assert_eq!(editor.get_html(), "<p><strong>bold pl</strong>ain</p>");
}

#[test]
fn marks_are_rejected_inside_code_blocks() {
    let mut editor = editor("<pre><code>let x;</code></pre>");
    editor.set_selection(Selection::text(1, 4));

    assert!(!editor.bold());
    assert_eq!(editor.get_html(), "<pre><code>let x;</code></pre>");
}
