use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::schema::SchemaError;

#[derive(Debug, Clone)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(Vec<String>),
}

/// A compiled content expression such as `"paragraph block*"`.
///
/// Type and group names are resolved when the schema is defined, so the
/// matcher only ever deals with concrete node type names.
#[derive(Debug, Clone)]
pub struct ContentExpr {
    source: String,
    states: Vec<MatchState>,
}

#[derive(Debug, Clone)]
struct MatchState {
    next: Vec<(String, usize)>,
    valid_end: bool,
}

impl ContentExpr {
    pub(crate) fn parse(
        node: &str,
        source: &str,
        resolve: &dyn Fn(&str) -> Option<Vec<String>>,
    ) -> Result<Self, SchemaError> {
        let mut stream = TokenStream {
            node,
            tokens: tokenize(source),
            pos: 0,
            resolve,
        };
        let expr = stream.parse_expr()?;
        if let Some(token) = stream.peek() {
            return Err(stream.err(format!("unexpected token `{token}`")));
        }

        let mut nfa = Nfa::default();
        let start = nfa.node();
        let accept = nfa.compile(&expr, start);
        Ok(Self {
            source: source.to_string(),
            states: nfa.determinize(accept),
        })
    }

    /// The expression of a leaf node: matches only the empty sequence.
    pub(crate) fn empty() -> Self {
        Self {
            source: String::new(),
            states: vec![MatchState {
                next: Vec::new(),
                valid_end: true,
            }],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.states.len() == 1 && self.states[0].next.is_empty()
    }

    pub fn start(&self) -> ContentMatch<'_> {
        ContentMatch {
            expr: self,
            state: 0,
        }
    }

    pub fn matches<'k>(&self, kinds: impl IntoIterator<Item = &'k str>) -> bool {
        self.start()
            .match_kinds(kinds)
            .is_some_and(|end| end.valid_end())
    }
}

/// A position inside a [`ContentExpr`] after some prefix of children was
/// consumed.
#[derive(Debug, Clone, Copy)]
pub struct ContentMatch<'a> {
    expr: &'a ContentExpr,
    state: usize,
}

impl<'a> ContentMatch<'a> {
    pub fn match_kind(self, kind: &str) -> Option<Self> {
        self.expr.states[self.state]
            .next
            .iter()
            .find(|(name, _)| name == kind)
            .map(|(_, state)| Self {
                expr: self.expr,
                state: *state,
            })
    }

    pub fn match_kinds<'k>(self, kinds: impl IntoIterator<Item = &'k str>) -> Option<Self> {
        let mut current = self;
        for kind in kinds {
            current = current.match_kind(kind)?;
        }
        Some(current)
    }

    pub fn valid_end(self) -> bool {
        self.expr.states[self.state].valid_end
    }

    /// Node type names that may follow, in declaration order.
    pub fn next_kinds(self) -> impl Iterator<Item = &'a str> {
        self.expr.states[self.state]
            .next
            .iter()
            .map(|(name, _)| name.as_str())
    }

    /// Shortest sequence of node types that, inserted here, lets `after`
    /// match (and reach a valid end when `to_end` is set). Only types
    /// accepted by `fillable` are generated.
    pub fn fill(
        self,
        after: &[&str],
        to_end: bool,
        fillable: impl Fn(&str) -> bool,
    ) -> Option<Vec<String>> {
        let mut seen = vec![self.state];
        let mut queue = VecDeque::from([(self.state, Vec::<String>::new())]);
        while let Some((state, path)) = queue.pop_front() {
            let here = Self {
                expr: self.expr,
                state,
            };
            if let Some(end) = here.match_kinds(after.iter().copied()) {
                if !to_end || end.valid_end() {
                    return Some(path);
                }
            }
            for (kind, next) in &self.expr.states[state].next {
                if !fillable(kind) || seen.contains(next) {
                    continue;
                }
                seen.push(*next);
                let mut path = path.clone();
                path.push(kind.clone());
                queue.push_back((*next, path));
            }
        }
        None
    }
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in source.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !ch.is_whitespace() {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

struct TokenStream<'a> {
    node: &'a str,
    tokens: Vec<String>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<Vec<String>>,
}

impl TokenStream<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidContent {
            node: self.node.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SchemaError> {
        let mut choices = vec![self.parse_seq()?];
        while self.eat("|") {
            choices.push(self.parse_seq()?);
        }
        Ok(if choices.len() == 1 {
            choices.remove(0)
        } else {
            Expr::Choice(choices)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, SchemaError> {
        let mut items = Vec::new();
        while !matches!(self.peek(), None | Some(")") | Some("|")) {
            items.push(self.parse_postfix()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Seq(items)
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SchemaError> {
        let mut expr = self.parse_atom()?;
        loop {
            expr = if self.eat("+") {
                Expr::Plus(Box::new(expr))
            } else if self.eat("*") {
                Expr::Star(Box::new(expr))
            } else if self.eat("?") {
                Expr::Opt(Box::new(expr))
            } else if self.eat("{") {
                self.parse_range(expr)?
            } else {
                return Ok(expr);
            };
        }
    }

    fn parse_number(&mut self) -> Result<usize, SchemaError> {
        let token = self.peek().unwrap_or_default().to_string();
        let value = token
            .parse::<usize>()
            .map_err(|_| self.err(format!("expected number, got `{token}`")))?;
        self.pos += 1;
        Ok(value)
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, SchemaError> {
        let min = self.parse_number()?;
        let max = if self.eat(",") {
            if self.peek() == Some("}") {
                None
            } else {
                Some(self.parse_number()?)
            }
        } else {
            Some(min)
        };
        if !self.eat("}") {
            return Err(self.err("unclosed brace"));
        }
        if max.is_some_and(|max| max < min) {
            return Err(self.err(format!("empty range {{{min},{max:?}}}")));
        }
        Ok(Expr::Range {
            min,
            max,
            expr: Box::new(expr),
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, SchemaError> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return Err(self.err("missing closing paren"));
            }
            return Ok(expr);
        }
        let Some(token) = self.peek().map(str::to_string) else {
            return Err(self.err("unexpected end of expression"));
        };
        if !token.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
            return Err(self.err(format!("unexpected token `{token}`")));
        }
        self.pos += 1;
        match (self.resolve)(&token) {
            Some(kinds) if !kinds.is_empty() => Ok(Expr::Name(kinds)),
            _ => Err(SchemaError::UnknownContent {
                node: self.node.to_string(),
                name: token,
            }),
        }
    }
}

#[derive(Default)]
struct Nfa {
    edges: Vec<Vec<(Option<String>, usize)>>,
}

impl Nfa {
    fn node(&mut self) -> usize {
        self.edges.push(Vec::new());
        self.edges.len() - 1
    }

    fn edge(&mut self, from: usize, term: Option<&str>, to: usize) {
        self.edges[from].push((term.map(str::to_string), to));
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> usize {
        match expr {
            Expr::Name(kinds) => {
                let to = self.node();
                for kind in kinds {
                    self.edge(from, Some(kind), to);
                }
                to
            }
            Expr::Seq(items) => items
                .iter()
                .fold(from, |current, item| self.compile(item, current)),
            Expr::Choice(choices) => {
                let end = self.node();
                for choice in choices {
                    let out = self.compile(choice, from);
                    self.edge(out, None, end);
                }
                end
            }
            Expr::Star(inner) => {
                let anchor = self.node();
                self.edge(from, None, anchor);
                let out = self.compile(inner, anchor);
                self.edge(out, None, anchor);
                anchor
            }
            Expr::Plus(inner) => {
                let once = self.compile(inner, from);
                self.compile(&Expr::Star(inner.clone()), once)
            }
            Expr::Opt(inner) => {
                let end = self.node();
                self.edge(from, None, end);
                let out = self.compile(inner, from);
                self.edge(out, None, end);
                end
            }
            Expr::Range { min, max, expr } => {
                let mut current = from;
                for _ in 0..*min {
                    current = self.compile(expr, current);
                }
                match max {
                    None => self.compile(&Expr::Star(expr.clone()), current),
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(current, None, next);
                            let out = self.compile(expr, current);
                            self.edge(out, None, next);
                            current = next;
                        }
                        current
                    }
                }
            }
        }
    }

    fn closure(&self, set: &mut BTreeSet<usize>) {
        let mut stack: Vec<usize> = set.iter().copied().collect();
        while let Some(state) = stack.pop() {
            for (term, to) in &self.edges[state] {
                if term.is_none() && set.insert(*to) {
                    stack.push(*to);
                }
            }
        }
    }

    fn determinize(&self, accept: usize) -> Vec<MatchState> {
        let mut start = BTreeSet::from([0]);
        self.closure(&mut start);

        let mut seen: HashMap<BTreeSet<usize>, usize> = HashMap::from([(start.clone(), 0)]);
        let mut queue = vec![start];
        let mut states = Vec::new();
        let mut cursor = 0;
        while cursor < queue.len() {
            let set = queue[cursor].clone();
            cursor += 1;

            let mut grouped: Vec<(String, BTreeSet<usize>)> = Vec::new();
            for &state in &set {
                for (term, to) in &self.edges[state] {
                    let Some(term) = term else {
                        continue;
                    };
                    match grouped.iter_mut().find(|(name, _)| name == term) {
                        Some((_, targets)) => {
                            targets.insert(*to);
                        }
                        None => grouped.push((term.clone(), BTreeSet::from([*to]))),
                    }
                }
            }

            let mut next = Vec::with_capacity(grouped.len());
            for (term, mut targets) in grouped {
                self.closure(&mut targets);
                let id = match seen.get(&targets) {
                    Some(id) => *id,
                    None => {
                        let id = queue.len();
                        seen.insert(targets.clone(), id);
                        queue.push(targets);
                        id
                    }
                };
                next.push((term, id));
            }
            states.push(MatchState {
                next,
                valid_end: set.contains(&accept),
            });
        }
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(name: &str) -> Option<Vec<String>> {
        match name {
            "block" => Some(vec!["paragraph".into(), "heading".into()]),
            "inline" => Some(vec!["text".into(), "image".into()]),
            "paragraph" | "heading" | "text" | "image" | "table_row" | "table_cell"
            | "table_header" => Some(vec![name.to_string()]),
            _ => None,
        }
    }

    fn parse(source: &str) -> ContentExpr {
        ContentExpr::parse("test", source, &resolver).unwrap()
    }

    #[test]
    fn star_accepts_empty_and_repeats() {
        let expr = parse("inline*");
        assert!(expr.matches([]));
        assert!(expr.matches(["text", "image", "text"]));
        assert!(!expr.matches(["paragraph"]));
    }

    #[test]
    fn sequence_requires_leading_type() {
        let expr = parse("paragraph block*");
        assert!(expr.matches(["paragraph"]));
        assert!(expr.matches(["paragraph", "heading", "paragraph"]));
        assert!(!expr.matches(["heading"]));
        assert!(!expr.matches([]));
    }

    #[test]
    fn choice_inside_plus() {
        let expr = parse("(table_cell | table_header)+");
        assert!(expr.matches(["table_header", "table_cell"]));
        assert!(!expr.matches([]));
    }

    #[test]
    fn bounded_range() {
        let expr = parse("paragraph{1,2}");
        assert!(!expr.matches([]));
        assert!(expr.matches(["paragraph"]));
        assert!(expr.matches(["paragraph", "paragraph"]));
        assert!(!expr.matches(["paragraph", "paragraph", "paragraph"]));
    }

    #[test]
    fn fill_picks_first_declared_type() {
        let expr = parse("block+");
        let filled = expr.start().fill(&[], true, |_| true).unwrap();
        assert_eq!(filled, vec!["paragraph".to_string()]);
    }

    #[test]
    fn fill_before_trailing_content() {
        let expr = parse("paragraph block*");
        let filled = expr.start().fill(&["heading"], true, |_| true).unwrap();
        assert_eq!(filled, vec!["paragraph".to_string()]);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = ContentExpr::parse("test", "widget+", &resolver).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownContent {
                node: "test".into(),
                name: "widget".into()
            }
        );
    }

    #[test]
    fn unbalanced_parens_are_rejected() {
        let err = ContentExpr::parse("test", "(paragraph", &resolver).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidContent { .. }));
    }
}
