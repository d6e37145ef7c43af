use likha_core::{commands, plugins};
use likha_core::{
    Attrs, DocumentError, DocumentValue, Editor, Mark, Node, Selection, Step, Transaction,
    TransactionError,
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
fn horizontal_rule_at_end_gets_a_trailing_paragraph() {
    let mut editor = editor("<p>Hello</p>");
    editor.set_selection(Selection::cursor(6));

    assert!(editor.handle_key("Mod-_"));
    assert_eq!(editor.get_html(), "<p>Hello</p><hr><p></p>");
    assert_eq!(editor.selection(), Selection::cursor(9));
}

#[test]
fn image_insert_and_attributes() {
    let mut editor = editor("<p>ab</p>");
    editor.set_selection(Selection::cursor(2));

    assert_eq!(
        editor.execute_command("insertImage", vec![json!("/cat.png"), json!("A cat")]),
        json!(true)
    );
    assert_eq!(
        editor.get_html(),
        r#"<p>a<img src="/cat.png" alt="A cat">b</p>"#
    );
    assert_eq!(editor.selection(), Selection::cursor(3));
    assert_eq!(editor.query::<bool>("isImageSelected", vec![]).unwrap(), true);
    assert_eq!(
        editor.query::<Option<String>>("getImageSrc", vec![]).unwrap(),
        Some("/cat.png".to_string())
    );

    assert_eq!(
        editor.execute_command("setImageSize", vec![json!(320), json!(200)]),
        json!(true)
    );
    assert_eq!(
        editor.get_html(),
        r#"<p>a<img src="/cat.png" alt="A cat" width="320" height="200">b</p>"#
    );

    editor.set_selection(Selection::node(2));
    assert_eq!(
        editor.execute_command("setImageAlt", vec![json!("Two cats")]),
        json!(true)
    );
    assert!(editor.get_html().contains(r#"alt="Two cats""#));
}

#[test]
fn empty_image_source_is_not_inserted() {
    let mut editor = editor("<p>ab</p>");

    assert_eq!(editor.execute_command("insertImage", vec![json!("")]), json!(false));
    assert_eq!(editor.query::<bool>("isImageSelected", vec![]).unwrap(), false);
    assert_eq!(editor.get_html(), "<p>ab</p>");
}

#[test]
fn table_defaults_come_from_config() {
    let mut editor = editor("");

    assert_eq!(editor.execute_command("insertTable", vec![]), json!(true));
    let html = editor.get_html();
    assert_eq!(html.matches("<tr>").count(), 3);
    assert_eq!(html.matches("<td>").count(), 9);

    assert_eq!(
        editor.execute_command("setCellAttribute", vec![json!("colspan"), json!(2)]),
        json!(true)
    );
    assert_eq!(editor.get_html().matches(r#"<td colspan="2">"#).count(), 1);

    assert_eq!(
        editor.execute_command("insertTable", vec![json!(0), json!(2)]),
        json!(false)
    );
}

#[test]
fn typed_text_takes_the_marks_at_the_cursor() {
    let mut editor = editor("<p><strong>ab</strong></p>");
    editor.set_selection(Selection::cursor(2));

    assert_eq!(editor.execute_command("insertText", vec![json!("X")]), json!(true));
    assert_eq!(editor.get_html(), "<p><strong>aXb</strong></p>");
    assert_eq!(editor.selection(), Selection::cursor(3));
}

#[test]
fn delete_selection_removes_the_range() {
    let mut editor = editor("<p>Hello world</p>");
    editor.set_selection(Selection::text(6, 12));

    assert_eq!(editor.execute_command("deleteSelection", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>Hello</p>");
    assert_eq!(editor.execute_command("deleteSelection", vec![]), json!(false));
}

#[test]
fn code_block_toggles_back_to_paragraph() {
    let mut editor = editor("<p>x = 1</p>");

    assert!(editor.handle_key("Mod-Alt-c"));
    assert_eq!(editor.get_html(), "<pre><code>x = 1</code></pre>");
    assert_eq!(editor.query::<bool>("isCodeBlockActive", vec![]).unwrap(), true);
    assert_eq!(
        editor.query::<Option<String>>("getCodeBlockLanguage", vec![]).unwrap(),
        None
    );

    assert_eq!(editor.execute_command("toggleCodeBlock", vec![]), json!(true));
    assert_eq!(editor.get_html(), "<p>x = 1</p>");
}

#[test]
fn alignment_shortcuts_and_queries() {
    let mut editor = editor("<h1>Title</h1>");

    assert!(editor.handle_key("Mod-Shift-e"));
    assert_eq!(editor.get_html(), r#"<h1 style="text-align: center">Title</h1>"#);
    assert_eq!(
        editor.query::<bool>("isAlignActive", vec![json!("center")]).unwrap(),
        true
    );
    assert_eq!(editor.execute_command("setAlignJustify", vec![]), json!(true));
    assert_eq!(
        editor.query::<String>("getTextAlign", vec![]).unwrap(),
        "justify"
    );
}

#[test]
fn plain_text_has_one_line_per_block() {
    let editor = editor("<p>one<br>two</p><ul><li><p>three</p></li></ul>");

    assert_eq!(editor.get_text(), "one\ntwo\nthree");
}

#[test]
fn document_value_round_trips_through_json() {
    let mut source = editor(r#"<h2>Title</h2><p>Some <em>text</em></p>"#);
    let json = source.to_value().to_json_pretty().unwrap();

    let mut target = editor("");
    target
        .set_document(DocumentValue::from_json_str(&json).unwrap())
        .unwrap();
    assert_eq!(target.get_html(), source.get_html());
    assert_eq!(target.selection(), Selection::cursor(1));

    source.set_content("<p>changed</p>");
    assert_eq!(target.get_html(), r#"<h2>Title</h2><p>Some <em>text</em></p>"#);
}

#[test]
fn invalid_documents_are_refused() {
    let mut editor = editor("<p>keep</p>");

    let loose_text = DocumentValue::from_document(Node::doc([Node::text("loose")]));
    assert!(matches!(
        editor.set_document(loose_text),
        Err(DocumentError::Invalid(TransactionError::ContentMismatch { .. }))
    ));

    let not_a_doc = DocumentValue::from_document(Node::paragraph("p"));
    assert!(editor.set_document(not_a_doc).is_err());
    assert_eq!(editor.get_html(), "<p>keep</p>");
}

#[test]
fn foreign_envelopes_are_refused() {
    let mut editor = editor("<p>keep</p>");
    let doc = Node::doc([Node::paragraph("other")]);

    let mut value = DocumentValue::from_document(doc.clone());
    value.schema = "markdown".to_string();
    assert_eq!(
        editor.set_document(value),
        Err(DocumentError::ForeignSchema("markdown".to_string()))
    );

    let mut value = DocumentValue::from_document(doc);
    value.version = 7;
    assert_eq!(
        editor.set_document(value),
        Err(DocumentError::UnsupportedVersion { found: 7 })
    );
    assert_eq!(editor.get_html(), "<p>keep</p>");
}

#[test]
fn conflicting_mark_sets_are_refused() {
    let mut editor = editor("<p>ab</p>");
    let sub_and_sup = || {
        Node::text_with_marks("x", vec![Mark::new("subscript"), Mark::new("superscript")])
    };

    let insert = Transaction::new(vec![Step::replace(2, 2, vec![sub_and_sup()])]);
    assert!(matches!(
        editor.dispatch(insert),
        Err(TransactionError::InvalidMarkSet { .. })
    ));

    let twice_bold = Node::text_with_marks("x", vec![Mark::new("bold"), Mark::new("bold")]);
    let insert = Transaction::new(vec![Step::replace(2, 2, vec![twice_bold])]);
    assert!(editor.dispatch(insert).is_err());

    let out_of_order = Node::text_with_marks("x", vec![Mark::new("bold"), Mark::new("italic")]);
    let insert = Transaction::new(vec![Step::replace(2, 2, vec![out_of_order])]);
    assert!(editor.dispatch(insert).is_err());
    assert_eq!(editor.get_html(), "<p>ab</p>");

    let paragraph = Node::element("paragraph", Default::default(), [sub_and_sup()]);
    let value = DocumentValue::from_document(Node::doc([paragraph]));
    assert!(matches!(
        editor.set_document(value),
        Err(DocumentError::Invalid(TransactionError::InvalidMarkSet { .. }))
    ));
    assert_eq!(editor.get_html(), "<p>ab</p>");
}

#[test]
fn list_items_keep_their_leading_paragraph() {
    let mut editor = editor("<ul><li><p>item</p></li></ul>");
    editor.set_selection(Selection::cursor(4));

    assert_eq!(editor.execute_command("setHeading", vec![json!(2)]), json!(false));
    assert_eq!(editor.execute_command("setCodeBlock", vec![]), json!(false));
    assert_eq!(editor.get_html(), "<ul><li><p>item</p></li></ul>");
}

#[test]
fn code_blocks_drop_images_and_keep_line_breaks() {
    let mut with_image = editor(r#"<p>a<img src="/x.png">b</p>"#);
    assert_eq!(with_image.execute_command("setCodeBlock", vec![]), json!(true));
    assert_eq!(with_image.get_html(), "<pre><code>ab</code></pre>");

    let mut with_break = editor("<p><em>a</em><br>b</p>");
    assert_eq!(with_break.execute_command("setCodeBlock", vec![]), json!(true));
    assert_eq!(with_break.get_html(), "<pre><code>a\nb</code></pre>");
    assert_eq!(with_break.execute_command("setParagraph", vec![]), json!(true));
    assert_eq!(with_break.get_html(), "<p>a<br>b</p>");
}

#[test]
fn only_textblocks_are_retyped() {
    let mut editor = editor("<table><tbody><tr><td><p>cell</p></td></tr></tbody></table>");
    editor.set_selection(Selection::cursor(5));

    assert!(commands::set_block_type(editor.state(), "table_cell", &Attrs::default()).is_none());
    assert!(commands::set_block_type(editor.state(), "bullet_list", &Attrs::default()).is_none());

    // The paragraph inside the cell is an ordinary textblock.
    assert_eq!(editor.execute_command("setHeading", vec![json!(3)]), json!(true));
    assert_eq!(
        editor.get_html(),
        "<table><tbody><tr><td><h3>cell</h3></td></tr></tbody></table>"
    );
}
