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
fn toggle_bullet_list_wraps_paragraph() {
    let mut editor = editor("<p>Hello world</p>");

    assert_eq!(editor.execute_command("toggleBulletList", vec![]), json!(true));
    assert!(
        editor
            .get_html()
            .contains("<ul><li><p>Hello world</p></li></ul>")
    );
    assert_eq!(editor.query::<bool>("isBulletListActive", vec![]).unwrap(), true);
}

#[test]
fn toggle_blockquote_lifts_out_of_quote() {
    let mut editor = editor("<blockquote><p>Quote</p></blockquote>");

    assert_eq!(editor.execute_command("toggleBlockquote", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>Quote</p>");
}

#[test]
fn set_code_block_with_language() {
    let mut editor = editor("<p>const x = 1;</p>");

    assert_eq!(
        editor.execute_command("setCodeBlock", vec![json!("javascript")]),
        json!(true)
    );
    assert!(
        editor
            .get_html()
            .contains(r#"<pre><code class="language-javascript">const x = 1;</code></pre>"#)
    );
    assert_eq!(
        editor.query::<Option<String>>("getCodeBlockLanguage", vec![]).unwrap(),
        Some("javascript".to_string())
    );
}

#[test]
fn insert_table_into_empty_document() {
    let mut editor = editor("");

    assert_eq!(
        editor.execute_command("insertTable", vec![json!(2), json!(3)]),
        json!(true)
    );
    let html = editor.get_html();
    assert_eq!(html.matches("<tr>").count(), 2);
    assert_eq!(html.matches("<td>").count(), 6);
    assert_eq!(html.matches("<td><p></p></td>").count(), 6);
    assert_eq!(editor.query::<bool>("isInTable", vec![]).unwrap(), true);
}

#[test]
fn set_link_wraps_selected_word_only() {
    let mut editor = editor("<p>Visit our website</p>");
    // "website" spans 11..18: the paragraph opens at 0, its text at 1.
    editor.set_selection(Selection::text(11, 18));

    assert_eq!(
        editor.execute_command("setLink", vec![json!("https://example.com")]),
        json!(true)
    );
    assert_eq!(
        editor.get_html(),
        r#"<p>Visit our <a href="https://example.com">website</a></p>"#
    );
    assert_eq!(
        editor.query::<Option<String>>("getLinkHref", vec![]).unwrap(),
        Some("https://example.com".to_string())
    );
}

#[test]
fn left_alignment_is_never_serialized() {
    let mut editor = editor(r#"<p style="text-align:center">Text</p>"#);
    assert_eq!(editor.get_html(), r#"<p style="text-align: center">Text</p>"#);

    assert_eq!(
        editor.execute_command("setTextAlign", vec![json!("left")]),
        json!(true)
    );
    assert_eq!(editor.get_html(), "<p>Text</p>");
    assert_eq!(
        editor.query::<String>("getTextAlign", vec![]).unwrap(),
        "left"
    );
}
