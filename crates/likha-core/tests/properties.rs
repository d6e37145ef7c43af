use likha_core::html::{parse_html, serialize_html};
use likha_core::plugins;
use likha_core::{Editor, Schema, Selection};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn editor(html: &str) -> Editor {
    Editor::builder()
        .content(html)
        .plugins(plugins::rich_text())
        .build()
}

#[rstest]
#[case("<p></p>")]
#[case("<h1></h1>")]
#[case("<h4>Title</h4>")]
#[case(r#"<h2 style="text-align: right">Title</h2>"#)]
#[case(r#"<p style="text-align: justify">Body</p>"#)]
#[case("<blockquote><p>Quote</p></blockquote>")]
#[case("<pre><code>let x = 1;</code></pre>")]
#[case(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#)]
#[case("<hr>")]
#[case(r#"<ol start="3"><li><p>three</p></li></ol>"#)]
#[case("<ul><li><p>a</p><ul><li><p>b</p></li></ul></li></ul>")]
#[case(r#"<p><img src="/cat.png" alt="A cat"></p>"#)]
#[case("<p>one<br>two</p>")]
#[case(
    r#"<table><tbody><tr><th><p>h</p></th><td colspan="2"><p>c</p></td></tr></tbody></table>"#
)]
#[case(r#"<p><strong>b</strong><em>i</em><u>u</u><s>s</s><code>c</code></p>"#)]
#[case(r#"<p><a href="/x" title="X">link</a><sub>2</sub><sup>3</sup></p>"#)]
#[case(r#"<p><span style="color: red">red</span><mark style="background-color: yellow">hi</mark></p>"#)]
fn html_round_trip_is_stable(#[case] html: &str) {
    let schema = Schema::rich_text();
    let once = serialize_html(&parse_html(html, &schema), &schema);
    let twice = serialize_html(&parse_html(&once, &schema), &schema);

    assert_eq!(once, html);
    assert_eq!(twice, once);
}

#[rstest]
#[case("bold", "<strong>")]
#[case("italic", "<em>")]
#[case("underline", "<u>")]
#[case("strikethrough", "<s>")]
#[case("code", "<code>")]
fn toggling_a_mark_twice_restores_the_text(#[case] mark: &str, #[case] tag: &str) {
    let command = match mark {
        "bold" => "toggleBold",
        "italic" => "toggleItalic",
        "underline" => "toggleUnderline",
        "strikethrough" => "toggleStrikethrough",
        _ => "toggleCode",
    };
    let mut editor = editor("<p>Hello <em>big</em> world</p>");
    let original = editor.get_html();
    editor.set_selection(Selection::text(1, 14));

    assert_eq!(editor.execute_command(command, vec![]), json!(true));
    assert!(editor.get_html().contains(tag));
    assert!(editor.is_active(mark));

    assert_eq!(editor.execute_command(command, vec![]), json!(true));
    if mark == "italic" {
        assert_eq!(editor.get_html(), "<p>Hello big world</p>");
    } else {
        assert_eq!(editor.get_html(), original);
    }
}

#[test]
fn toggle_mark_on_cursor_does_nothing() {
    let mut editor = editor("<p>Hello</p>");

    assert_eq!(editor.execute_command("toggleBold", vec![]), json!(false));
    assert_eq!(editor.get_html(), "<p>Hello</p>");
}

#[rstest]
#[case("<p>one</p><p>two</p>", 1, 9)]
#[case("<h2>Title</h2><p>body</p>", 2, 2)]
fn wrap_then_lift_restores_blocks(#[case] html: &str, #[case] from: usize, #[case] to: usize) {
    let mut editor = editor(html);
    let original = editor.get_html();
    editor.set_selection(Selection::text(from, to));

    assert_eq!(editor.execute_command("toggleBlockquote", vec![]), json!(true));
    assert!(editor.get_html().starts_with("<blockquote>"));
    assert_eq!(editor.query::<bool>("isBlockquoteActive", vec![]).unwrap(), true);

    assert_eq!(editor.execute_command("lift", vec![]), json!(true));
    assert_eq!(editor.get_html(), original);
}

#[test]
fn lift_climbs_to_the_first_ancestor_that_fits() {
    let mut editor = editor("<blockquote><ul><li><p>x</p></li></ul></blockquote>");
    editor.set_selection(Selection::cursor(4));
    assert_eq!(editor.query::<bool>("isBlockquoteActive", vec![]).unwrap(), true);

    // A paragraph cannot sit in the list, so it lands in the quote.
    assert_eq!(editor.execute_command("toggleBlockquote", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<blockquote><p>x</p></blockquote>");

    assert_eq!(editor.execute_command("lift", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>x</p>");
    assert_eq!(editor.execute_command("lift", vec![]), json!(false));
}

#[test]
fn lift_splits_every_level_it_leaves() {
    let mut editor = editor(
        "<blockquote><p>a</p><blockquote><p>b</p><p>c</p><p>d</p></blockquote><p>e</p></blockquote>",
    );
    // Inside "c", the middle paragraph of the inner quote.
    editor.set_selection(Selection::cursor(9));

    assert_eq!(editor.execute_command("lift", vec![]), json!(true));
    assert_eq!(
        editor.get_html(),
        "<blockquote><p>a</p><blockquote><p>b</p></blockquote><p>c</p><blockquote><p>d</p></blockquote><p>e</p></blockquote>"
    );
}

#[test]
fn lift_stops_at_table_cells() {
    let html = "<table><tbody><tr><td><p>cell</p></td></tr></tbody></table>";
    let mut editor = editor(html);
    editor.set_selection(Selection::cursor(5));

    assert_eq!(editor.execute_command("lift", vec![]), json!(false));
    assert_eq!(editor.get_html(), html);
}

#[test]
fn superscript_replaces_subscript() {
    let mut editor = editor("<p>H2O</p>");
    editor.set_selection(Selection::text(2, 3));

    assert_eq!(editor.execute_command("toggleSubscript", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>H<sub>2</sub>O</p>");

    assert_eq!(editor.execute_command("toggleSuperscript", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>H<sup>2</sup>O</p>");
    assert!(editor.is_active("superscript"));
    assert!(!editor.is_active("subscript"));
}

#[test]
fn toggle_heading_twice_turns_it_off() {
    let mut editor = editor("<p>Title</p>");

    assert_eq!(editor.execute_command("toggleHeading", vec![json!(2)]), json!(true));
    assert_eq!(editor.get_html(), "<h2>Title</h2>");
    assert_eq!(
        editor.query::<bool>("isHeadingActive", vec![json!(2)]).unwrap(),
        true
    );

    assert_eq!(editor.execute_command("toggleHeading", vec![json!(2)]), json!(true));
    assert_eq!(editor.get_html(), "<p>Title</p>");
}

#[test]
fn toggle_heading_switches_levels() {
    let mut editor = editor("<h1>Title</h1>");

    assert_eq!(editor.execute_command("toggleHeading", vec![json!(3)]), json!(true));
    assert_eq!(editor.get_html(), "<h3>Title</h3>");
}

#[test]
fn rejected_commands_leave_the_document_unchanged() {
    let mut editor = editor("<p>Title</p>");

    assert_eq!(editor.execute_command("setHeading", vec![json!(9)]), json!(false));
    assert_eq!(editor.execute_command("setTextAlign", vec![json!("middle")]), json!(false));
    assert_eq!(editor.get_html(), "<p>Title</p>");
    assert!(!editor.can_undo());
}
