use serde_json::{Value, json};

use crate::commands;
use crate::model::Mark;
use crate::ops::Transaction;
use crate::plugin::{CommandArgs, CommandError, CommandSpec, Plugin};
use crate::state::EditorState;

pub struct LinkPlugin;

fn set_link(state: &EditorState, args: &CommandArgs) -> Result<Option<Transaction>, CommandError> {
    let href = args.str(0)?;
    if href.is_empty() {
        return Err(args.invalid("link target is empty"));
    }
    let mut mark = Mark::new("link").with_attr("href", href);
    if let Some(title) = args.opt_str(1)? {
        mark = mark.with_attr("title", title);
    }
    Ok(commands::set_mark(state, mark))
}

impl Plugin for LinkPlugin {
    fn name(&self) -> &'static str {
        "link"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::set_attribute("setLink", |cx, args| set_link(cx.state, args))
                .description("Link the selected text.")
                .keywords(["link", "url", "href"])
                .args_example(json!(["https://example.com"])),
            CommandSpec::set_attribute("removeLink", |cx, _| {
                Ok(commands::remove_mark(cx.state, Some("link")))
            }),
            CommandSpec::toggle("toggleLink", |cx, args| {
                if commands::is_mark_active(cx.state, "link") {
                    return Ok(commands::remove_mark(cx.state, Some("link")));
                }
                match args.opt_str(0)? {
                    Some(_) => set_link(cx.state, args),
                    None => Ok(None),
                }
            }),
            CommandSpec::query("isLinkActive", |cx, _| {
                Ok(Value::Bool(commands::is_mark_active(cx.state, "link")))
            }),
            CommandSpec::query("getLinkHref", |cx, _| {
                Ok(commands::find_mark(cx.state, "link")
                    .and_then(|mark| mark.attrs.get("href").cloned())
                    .unwrap_or(Value::Null))
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::html::{parse_html, serialize_html};
    use crate::schema::Schema;
    use crate::selection::Selection;

    #[test]
    fn empty_href_is_an_argument_error() {
        let schema = Arc::new(Schema::rich_text());
        let doc = parse_html("<p>text</p>", &schema);
        let state = EditorState::new(schema, doc).with_selection(Selection::text(1, 3));
        let args = CommandArgs::new("setLink", vec![json!("")]);
        assert!(matches!(
            set_link(&state, &args),
            Err(CommandError::InvalidArgs { .. })
        ));
        let args = CommandArgs::new("setLink", vec![json!("/a")]);
        let tx = set_link(&state, &args).unwrap().unwrap();
        let next = state.apply(&tx).unwrap();
        assert_eq!(
            serialize_html(&next.doc, &next.schema),
            r#"<p><a href="/a">te</a>xt</p>"#
        );
    }
}
