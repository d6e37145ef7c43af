//! The built-in rich text schema: basic blocks, lists, tables, images and
//! the formatting marks the bundled plugins operate on.

use serde_json::{Value, json};

use crate::html::DomElement;
use crate::model::Attrs;
use crate::schema::{DomSpec, MarkSpec, NodeSpec, ParseRule, Schema};

pub const ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];

impl Schema {
    /// The schema every editor uses unless the host provides its own.
    pub fn rich_text() -> Self {
        let (nodes, marks) = rich_text_specs();
        Schema::define(nodes, marks).expect("built-in rich text schema is valid")
    }
}

/// Node and mark specs of [`Schema::rich_text`], for hosts that want to
/// extend it before defining their own schema.
pub fn rich_text_specs() -> (Vec<NodeSpec>, Vec<MarkSpec>) {
    (node_specs(), mark_specs())
}

fn node_specs() -> Vec<NodeSpec> {
    let mut heading = NodeSpec::new("heading")
        .content("inline*")
        .group("block")
        .defining()
        .checked_attr("level", 1, check_level)
        .checked_attr("align", "left", check_align);
    for level in 1..=6u64 {
        heading = heading.parse(ParseRule::tag(format!("h{level}")).attrs(move |el| {
            let mut attrs = align_from(el);
            attrs.insert("level".into(), json!(level));
            Some(attrs)
        }));
    }
    let heading = heading.to_markup(|attrs| {
        let level = attrs.get("level").and_then(Value::as_u64).unwrap_or(1);
        with_align(DomSpec::new(format!("h{level}")), attrs)
    });

    vec![
        NodeSpec::new("doc").content("block+"),
        NodeSpec::new("paragraph")
            .content("inline*")
            .group("block")
            .checked_attr("align", "left", check_align)
            .parse(ParseRule::tag("p").attrs(|el| Some(align_from(el))))
            .to_markup(|attrs| with_align(DomSpec::new("p"), attrs)),
        NodeSpec::new("blockquote")
            .content("block+")
            .group("block")
            .defining()
            .parse(ParseRule::tag("blockquote"))
            .to_markup(|_| DomSpec::new("blockquote")),
        NodeSpec::new("horizontal_rule")
            .group("block")
            .parse(ParseRule::tag("hr"))
            .to_markup(|_| DomSpec::empty("hr")),
        heading,
        NodeSpec::new("code_block")
            .content("text*")
            .group("block")
            .marks("")
            .code()
            .defining()
            .attr("language", Value::Null)
            .parse(ParseRule::tag("pre").attrs(|el| {
                let language = code_language(el).map_or(Value::Null, Value::String);
                Some(Attrs::from([("language".to_string(), language)]))
            }))
            .to_markup(|attrs| {
                let code = DomSpec::new("code").attr_opt(
                    "class",
                    attr_text(attrs, "language").map(|lang| format!("language-{lang}")),
                );
                DomSpec::new("pre").wrap(code)
            }),
        NodeSpec::new("text").group("inline"),
        NodeSpec::new("image")
            .inline()
            .group("inline")
            .required_attr("src")
            .attr("alt", Value::Null)
            .attr("title", Value::Null)
            .attr("width", Value::Null)
            .attr("height", Value::Null)
            .parse(ParseRule::tag("img").attrs(|el| {
                let src = el.attr("src")?;
                let text = |name: &str| el.attr(name).map_or(Value::Null, |v| json!(v));
                Some(Attrs::from([
                    ("src".to_string(), json!(src)),
                    ("alt".to_string(), text("alt")),
                    ("title".to_string(), text("title")),
                    ("width".to_string(), dimension(el.attr("width"))),
                    ("height".to_string(), dimension(el.attr("height"))),
                ]))
            }))
            .to_markup(|attrs| {
                DomSpec::empty("img")
                    .attr_opt("src", attr_text(attrs, "src"))
                    .attr_opt("alt", attr_text(attrs, "alt"))
                    .attr_opt("title", attr_text(attrs, "title"))
                    .attr_opt("width", attr_text(attrs, "width"))
                    .attr_opt("height", attr_text(attrs, "height"))
            }),
        NodeSpec::new("hard_break")
            .inline()
            .group("inline")
            .parse(ParseRule::tag("br"))
            .to_markup(|_| DomSpec::empty("br")),
        NodeSpec::new("ordered_list")
            .content("list_item+")
            .group("block")
            .attr("order", 1)
            .parse(ParseRule::tag("ol").attrs(|el| {
                let order = el
                    .attr("start")
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                Some(Attrs::from([("order".to_string(), json!(order))]))
            }))
            .to_markup(|attrs| {
                let order = attrs.get("order").and_then(Value::as_u64).unwrap_or(1);
                DomSpec::new("ol").attr_opt("start", (order != 1).then(|| order.to_string()))
            }),
        NodeSpec::new("bullet_list")
            .content("list_item+")
            .group("block")
            .parse(ParseRule::tag("ul"))
            .to_markup(|_| DomSpec::new("ul")),
        NodeSpec::new("list_item")
            .content("paragraph block*")
            .defining()
            .parse(ParseRule::tag("li"))
            .to_markup(|_| DomSpec::new("li")),
        NodeSpec::new("table")
            .content("table_row+")
            .group("block")
            .isolating()
            .parse(ParseRule::tag("table"))
            .to_markup(|_| DomSpec::new("table").wrap(DomSpec::new("tbody"))),
        NodeSpec::new("table_row")
            .content("(table_cell | table_header)+")
            .parse(ParseRule::tag("tr"))
            .to_markup(|_| DomSpec::new("tr")),
        cell_spec("table_cell", "td"),
        cell_spec("table_header", "th"),
    ]
}

fn cell_spec(name: &str, tag: &'static str) -> NodeSpec {
    NodeSpec::new(name)
        .content("block+")
        .isolating()
        .attr("colspan", 1)
        .attr("rowspan", 1)
        .attr("colwidth", Value::Null)
        .parse(ParseRule::tag(tag).attrs(|el| {
            let span = |name: &str| {
                el.attr(name)
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(1)
            };
            let colwidth = el
                .attr("data-colwidth")
                .map(|widths| {
                    widths
                        .split(',')
                        .filter_map(|w| w.trim().parse::<u64>().ok())
                        .collect::<Vec<_>>()
                })
                .filter(|widths| !widths.is_empty())
                .map_or(Value::Null, |widths| json!(widths));
            Some(Attrs::from([
                ("colspan".to_string(), json!(span("colspan"))),
                ("rowspan".to_string(), json!(span("rowspan"))),
                ("colwidth".to_string(), colwidth),
            ]))
        }))
        .to_markup(move |attrs| {
            let span = |name: &str| {
                attrs
                    .get(name)
                    .and_then(Value::as_u64)
                    .filter(|n| *n != 1)
                    .map(|n| n.to_string())
            };
            let colwidth = attrs.get("colwidth").and_then(Value::as_array).map(|widths| {
                widths
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            });
            DomSpec::new(tag)
                .attr_opt("colspan", span("colspan"))
                .attr_opt("rowspan", span("rowspan"))
                .attr_opt("data-colwidth", colwidth)
        })
}

fn mark_specs() -> Vec<MarkSpec> {
    vec![
        MarkSpec::new("link")
            .required_attr("href")
            .attr("title", Value::Null)
            .non_inclusive()
            .parse(ParseRule::tag("a").attrs(|el| {
                let href = el.attr("href")?;
                let title = el.attr("title").map_or(Value::Null, |t| json!(t));
                Some(Attrs::from([
                    ("href".to_string(), json!(href)),
                    ("title".to_string(), title),
                ]))
            }))
            .to_markup(|attrs| {
                DomSpec::new("a")
                    .attr_opt("href", attr_text(attrs, "href"))
                    .attr_opt("title", attr_text(attrs, "title"))
            }),
        MarkSpec::new("italic")
            .parse(ParseRule::tag("em"))
            .parse(ParseRule::tag("i"))
            .parse(ParseRule::style("font-style").attrs(|el| {
                (el.style("font-style")?.eq_ignore_ascii_case("italic")).then(Attrs::default)
            }))
            .to_markup(|_| DomSpec::new("em")),
        MarkSpec::new("bold")
            .parse(ParseRule::tag("strong"))
            .parse(ParseRule::tag("b"))
            .parse(ParseRule::style("font-weight").attrs(|el| {
                let weight = el.style("font-weight")?;
                let bold = weight.eq_ignore_ascii_case("bold")
                    || weight.eq_ignore_ascii_case("bolder")
                    || weight.parse::<u32>().is_ok_and(|w| w >= 500);
                bold.then(Attrs::default)
            }))
            .to_markup(|_| DomSpec::new("strong")),
        MarkSpec::new("code")
            .parse(ParseRule::tag("code"))
            .to_markup(|_| DomSpec::new("code")),
        MarkSpec::new("underline")
            .parse(ParseRule::tag("u"))
            .parse(ParseRule::style("text-decoration").attrs(|el| {
                el.style("text-decoration")?
                    .contains("underline")
                    .then(Attrs::default)
            }))
            .to_markup(|_| DomSpec::new("u")),
        MarkSpec::new("strikethrough")
            .parse(ParseRule::tag("s"))
            .parse(ParseRule::tag("del"))
            .parse(ParseRule::tag("strike"))
            .parse(ParseRule::style("text-decoration").attrs(|el| {
                el.style("text-decoration")?
                    .contains("line-through")
                    .then(Attrs::default)
            }))
            .to_markup(|_| DomSpec::new("s")),
        MarkSpec::new("subscript")
            .excludes("subscript superscript")
            .parse(ParseRule::tag("sub"))
            .to_markup(|_| DomSpec::new("sub")),
        MarkSpec::new("superscript")
            .excludes("superscript subscript")
            .parse(ParseRule::tag("sup"))
            .to_markup(|_| DomSpec::new("sup")),
        MarkSpec::new("text_color")
            .required_attr("color")
            .parse(ParseRule::style("color").attrs(|el| {
                let color = el.style("color")?;
                Some(Attrs::from([("color".to_string(), json!(color))]))
            }))
            .to_markup(|attrs| {
                DomSpec::new("span").attr_opt(
                    "style",
                    attr_text(attrs, "color").map(|c| format!("color: {c}")),
                )
            }),
        MarkSpec::new("highlight")
            .attr("color", "yellow")
            .parse(ParseRule::tag("mark").attrs(|el| {
                let color = el
                    .style("background-color")
                    .unwrap_or_else(|| "yellow".to_string());
                Some(Attrs::from([("color".to_string(), json!(color))]))
            }))
            .parse(ParseRule::style("background-color").attrs(|el| {
                let color = el.style("background-color")?;
                Some(Attrs::from([("color".to_string(), json!(color))]))
            }))
            .to_markup(|attrs| {
                DomSpec::new("mark").attr_opt(
                    "style",
                    attr_text(attrs, "color").map(|c| format!("background-color: {c}")),
                )
            }),
    ]
}

fn check_level(value: &Value) -> Result<(), String> {
    match value.as_u64() {
        Some(1..=6) => Ok(()),
        _ => Err(format!("heading level must be 1 to 6, got {value}")),
    }
}

fn check_align(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(align) if ALIGNMENTS.contains(&align) => Ok(()),
        _ => Err(format!("unsupported alignment {value}")),
    }
}

fn align_from(el: &DomElement) -> Attrs {
    let align = el
        .style("text-align")
        .map(|a| a.to_ascii_lowercase())
        .filter(|a| ALIGNMENTS.contains(&a.as_str()))
        .unwrap_or_else(|| "left".to_string());
    Attrs::from([("align".to_string(), json!(align))])
}

fn with_align(spec: DomSpec, attrs: &Attrs) -> DomSpec {
    let align = attr_text(attrs, "align").filter(|a| a != "left");
    spec.attr_opt("style", align.map(|a| format!("text-align: {a}")))
}

fn code_language(pre: &DomElement) -> Option<String> {
    if let Some(language) = pre.attr("data-language") {
        return Some(language.to_string());
    }
    let code = pre.child_element("code")?;
    code.classes()
        .find_map(|class| class.strip_prefix("language-"))
        .map(str::to_string)
}

fn dimension(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        None | Some("") => Value::Null,
        Some(raw) => raw.parse::<u64>().map_or_else(|_| json!(raw), |n| json!(n)),
    }
}

/// Attribute rendered as markup text; `null` renders as nothing.
fn attr_text(attrs: &Attrs, name: &str) -> Option<String> {
    match attrs.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_ranks_marks_in_declaration_order() {
        let schema = Schema::rich_text();
        let link = schema.mark_type("link").unwrap();
        let bold = schema.mark_type("bold").unwrap();
        assert!(link.rank() < bold.rank());
        assert!(!link.inclusive());
        assert!(schema.mark_type("subscript").unwrap().excludes("superscript"));
    }

    #[test]
    fn heading_level_is_validated() {
        let schema = Schema::rich_text();
        let bad = Attrs::from([("level".to_string(), json!(7))]);
        assert!(schema.node_attrs("heading", &bad).is_err());
        let ok = Attrs::from([("level".to_string(), json!(3))]);
        assert_eq!(
            schema.node_attrs("heading", &ok).unwrap().get("align"),
            Some(&json!("left"))
        );
    }

    #[test]
    fn code_blocks_reject_marks() {
        let schema = Schema::rich_text();
        let code_block = schema.node_type("code_block").unwrap();
        assert!(code_block.is_textblock());
        assert!(!code_block.allows_mark("bold"));
        assert!(schema.node_type("paragraph").unwrap().allows_mark("bold"));
    }
}
