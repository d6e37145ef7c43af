use crate::model::{Fragment, Mark, Node};
use crate::schema::{DomInner, DomSpec, Schema};

/// Renders the content of `doc` as markup.
pub fn serialize_html(doc: &Node, schema: &Schema) -> String {
    let mut out = String::new();
    serialize_fragment(doc.content(), schema, &mut out);
    out
}

/// Renders a fragment, keeping marks shared by adjacent inline nodes open
/// across them.
pub fn serialize_fragment(fragment: &Fragment, schema: &Schema, out: &mut String) {
    let mut active: Vec<(Mark, DomSpec)> = Vec::new();
    for node in fragment {
        let marks = node.marks();
        let keep = active
            .iter()
            .zip(marks)
            .take_while(|((open, _), mark)| open == *mark)
            .count();
        while active.len() > keep {
            if let Some((_, spec)) = active.pop() {
                close_spec(&spec, out);
            }
        }
        for mark in &marks[keep..] {
            let Some(spec) = mark_markup(schema, mark) else {
                continue;
            };
            open_spec(&spec, out);
            active.push((mark.clone(), spec));
        }
        serialize_node(node, schema, out);
    }
    while let Some((_, spec)) = active.pop() {
        close_spec(&spec, out);
    }
}

fn serialize_node(node: &Node, schema: &Schema, out: &mut String) {
    if let Node::Text(text) = node {
        escape_text(&text.text, out);
        return;
    }
    let render = schema
        .node_type(node.kind())
        .and_then(|t| t.spec().to_markup.clone());
    let Some(render) = render else {
        serialize_fragment(node.content(), schema, out);
        return;
    };
    let spec = render(node.attrs());
    open_spec(&spec, out);
    if has_hole(&spec) {
        serialize_fragment(node.content(), schema, out);
    }
    close_spec(&spec, out);
}

fn mark_markup(schema: &Schema, mark: &Mark) -> Option<DomSpec> {
    let render = schema.mark_type(&mark.kind)?.spec().to_markup.clone()?;
    Some(render(&mark.attrs))
}

fn has_hole(spec: &DomSpec) -> bool {
    match &spec.inner {
        DomInner::Empty => false,
        DomInner::Hole => true,
        DomInner::Child(child) => has_hole(child),
    }
}

fn open_spec(spec: &DomSpec, out: &mut String) {
    out.push('<');
    out.push_str(&spec.tag);
    for (name, value) in &spec.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
    if let DomInner::Child(child) = &spec.inner {
        open_spec(child, out);
    }
}

fn close_spec(spec: &DomSpec, out: &mut String) {
    match &spec.inner {
        DomInner::Empty => return,
        DomInner::Child(child) => close_spec(child, out),
        DomInner::Hole => {}
    }
    out.push_str("</");
    out.push_str(&spec.tag);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attrs;

    #[test]
    fn shared_marks_stay_open() {
        let schema = Schema::rich_text();
        let bold = Mark::new("bold");
        let italic = Mark::new("italic");
        let doc = Node::doc([Node::element(
            "paragraph",
            Attrs::default(),
            [
                schema.text("a", &[italic.clone()]),
                schema.text("b", &[bold, italic.clone()]),
                schema.text("c", &[italic]),
            ],
        )]);
        assert_eq!(
            serialize_html(&doc, &schema),
            "<p><em>a<strong>b</strong>c</em></p>"
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let schema = Schema::rich_text();
        let link = Mark::new("link").with_attr("href", "a?x=1&y=\"2\"");
        let doc = Node::doc([Node::element(
            "paragraph",
            Attrs::default(),
            [schema.text("1 < 2", &[link])],
        )]);
        assert_eq!(
            serialize_html(&doc, &schema),
            "<p><a href=\"a?x=1&amp;y=&quot;2&quot;\">1 &lt; 2</a></p>"
        );
    }
}
