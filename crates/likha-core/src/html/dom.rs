//! A small tolerant HTML reader.
//!
//! Builds a plain element tree from markup without ever failing: unknown
//! constructs become text, stray end tags are ignored, unclosed elements
//! are closed at the end of input. Comments, doctypes and the bodies of
//! `script`/`style` are skipped.

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "template"];

const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "fieldset",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(DomElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of one property of the inline `style` attribute.
    pub fn style(&self, property: &str) -> Option<String> {
        let style = self.attr("style")?;
        style.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let value = value.trim();
            (name.trim().eq_ignore_ascii_case(property) && !value.is_empty())
                .then(|| value.to_string())
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn child_element(&self, tag: &str) -> Option<&DomElement> {
        self.children.iter().find_map(|child| match child {
            DomNode::Element(el) if el.tag == tag => Some(el),
            _ => None,
        })
    }
}

enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

/// Parses markup into a synthetic `#root` element holding the top-level
/// nodes.
pub fn parse_dom(html: &str) -> DomElement {
    let mut stack = vec![DomElement::new("#root")];
    for token in tokenize(html) {
        match token {
            Token::Text(text) => push_child(&mut stack, DomNode::Text(text)),
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                close_implied(&mut stack, &name);
                let void = self_closing || VOID_TAGS.contains(&name.as_str());
                let el = DomElement {
                    tag: name,
                    attrs,
                    children: Vec::new(),
                };
                if void {
                    push_child(&mut stack, DomNode::Element(el));
                } else {
                    stack.push(el);
                }
            }
            Token::End(name) => {
                if let Some(depth) = stack.iter().rposition(|el| el.tag == name) {
                    if depth > 0 {
                        while stack.len() > depth {
                            pop_into_parent(&mut stack);
                        }
                    }
                }
            }
        }
    }
    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    stack.pop().unwrap_or_else(|| DomElement::new("#root"))
}

fn push_child(stack: &mut [DomElement], node: DomNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn pop_into_parent(stack: &mut Vec<DomElement>) {
    if let Some(el) = stack.pop() {
        push_child(stack, DomNode::Element(el));
    }
}

fn close_implied(stack: &mut Vec<DomElement>, name: &str) {
    if CLOSES_PARAGRAPH.contains(&name) {
        close_open(stack, &["p"], &["table", "td", "th", "button", "caption"]);
    }
    match name {
        "li" => close_open(stack, &["li"], &["ul", "ol"]),
        "td" | "th" => close_open(stack, &["td", "th"], &["tr", "table"]),
        "tr" => close_open(stack, &["tr"], &["table", "tbody", "thead", "tfoot"]),
        _ => {}
    }
}

fn close_open(stack: &mut Vec<DomElement>, tags: &[&str], boundaries: &[&str]) {
    for depth in (1..stack.len()).rev() {
        let tag = stack[depth].tag.as_str();
        if tags.contains(&tag) {
            while stack.len() > depth {
                pop_into_parent(stack);
            }
            return;
        }
        if boundaries.contains(&tag) {
            return;
        }
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..lt])));
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            continue;
        }

        let Some((token, consumed)) = parse_tag(rest) else {
            tokens.push(Token::Text("<".to_string()));
            rest = &rest[1..];
            continue;
        };
        rest = &rest[consumed..];

        if let Token::Start {
            name,
            self_closing: false,
            ..
        } = &token
        {
            if RAW_TEXT_TAGS.contains(&name.as_str()) {
                let close = format!("</{name}");
                rest = match rest.to_ascii_lowercase().find(&close) {
                    Some(start) => rest[start..].find('>').map_or("", |end| &rest[start + end + 1..]),
                    None => "",
                };
                continue;
            }
        }
        tokens.push(token);
    }
    tokens
}

fn parse_tag(input: &str) -> Option<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                self_closing = true;
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == attr_start {
            i += 1;
            continue;
        }
        let attr_name = input[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    let end = start + input[start..].find(quote as char)?;
                    value = decode_entities(&input[start..end]);
                    i = end + 1;
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&input[start..i]);
                }
            }
        }
        if !attrs.iter().any(|(key, _): &(String, String)| *key == attr_name) {
            attrs.push((attr_name, value));
        }
    }

    let token = if closing {
        Token::End(name)
    } else {
        Token::Start {
            name,
            attrs,
            self_closing,
        }
    };
    Some((token, i))
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
