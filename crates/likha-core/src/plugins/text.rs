use serde_json::Value;

use crate::editor::EditorConfig;
use crate::model::Node;
use crate::plugin::{CommandSpec, Plugin};

pub struct CharacterCountPlugin;

fn character_count(doc: &Node) -> usize {
    doc.text_content().chars().count()
}

/// Whitespace-separated words; separate blocks never run together.
fn word_count(doc: &Node) -> usize {
    doc.text_between(0, doc.content_size(), " ", |_| " ".to_string())
        .split_whitespace()
        .count()
}

impl Plugin for CharacterCountPlugin {
    fn name(&self) -> &'static str {
        "characterCount"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::query("getCharacterCount", |cx, _| {
                Ok(Value::from(character_count(&cx.state.doc)))
            }),
            CommandSpec::query("getWordCount", |cx, _| {
                Ok(Value::from(word_count(&cx.state.doc)))
            }),
        ]
    }
}

/// Hint text shown while the document is empty. The text defaults to the
/// editor's configured placeholder.
#[derive(Debug, Default)]
pub struct PlaceholderPlugin {
    text: Option<String>,
}

impl PlaceholderPlugin {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

fn is_empty_doc(doc: &Node) -> bool {
    doc.child_count() == 1
        && doc
            .child(0)
            .is_some_and(|block| block.kind() == "paragraph" && block.content_size() == 0)
}

fn css_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            '\n' => quoted.push_str("\\a "),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

impl Plugin for PlaceholderPlugin {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::query("isEmpty", |cx, _| {
            Ok(Value::Bool(is_empty_doc(&cx.state.doc)))
        })]
    }

    fn styles(&self, config: &EditorConfig) -> Option<String> {
        let text = self.text.as_deref().unwrap_or(config.placeholder.as_str());
        Some(format!(
            ".likha-editor p.is-empty:first-child::before {{\n  content: {};\n  color: #aaa;\n  pointer-events: none;\n  position: absolute;\n}}\n",
            css_string(text)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_blocks() {
        let doc = Node::doc([Node::paragraph("one two"), Node::paragraph("three")]);
        assert_eq!(character_count(&doc), 12);
        assert_eq!(word_count(&doc), 3);
    }

    #[test]
    fn placeholder_text_is_quoted() {
        let plugin = PlaceholderPlugin::new(r#"Say "hi""#);
        let css = plugin.styles(&EditorConfig::default()).unwrap();
        assert!(css.contains(r#"content: "Say \"hi\"";"#));
    }
}
