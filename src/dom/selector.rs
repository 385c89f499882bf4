//! CSS selector subset.
//!
//! Supported: type (`div`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`,
//! `[attr^=value]`, the descendant combinator (whitespace), and comma lists.
//! That covers every selector the delegator and pages use.

use std::str::FromStr;

use super::{DomError, NodeId};

/// Read access to element data, implemented by the document arena.
pub(crate) trait ElementTree {
    /// Tag and attributes, or `None` for text/unknown nodes.
    fn element(&self, id: NodeId) -> Option<(&str, &[(String, String)])>;
    fn parent_of(&self, id: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        let attr = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let present: Vec<&str> = attr("class").unwrap_or("").split_ascii_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|m| match (&m.op, attr(&m.name)) {
            (_, None) => false,
            (AttrOp::Exists, Some(_)) => true,
            (AttrOp::Equals(v), Some(actual)) => actual == v,
            (AttrOp::Prefix(v), Some(actual)) => actual.starts_with(v.as_str()),
        })
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    /// Alternatives of the comma list; each is a descendant chain, outermost first.
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let invalid = |reason: &str| DomError::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in split_outside_brackets(source, |c| c == ',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty selector"));
            }
            let mut chain = Vec::new();
            for token in split_outside_brackets(part, |c| c.is_ascii_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                chain.push(parse_compound(token).map_err(|reason| invalid(&reason))?);
            }
            alternatives.push(chain);
        }
        if alternatives.is_empty() {
            return Err(invalid("empty selector"));
        }

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn matches_in(&self, tree: &impl ElementTree, id: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|chain| chain_matches(chain, tree, id))
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn chain_matches(chain: &[Compound], tree: &impl ElementTree, id: NodeId) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    let Some((tag, attrs)) = tree.element(id) else {
        return false;
    };
    if !last.matches(tag, attrs) {
        return false;
    }

    // Descendant combinator only, so matching each remaining compound
    // against the nearest qualifying ancestor is exact.
    let mut cursor = tree.parent_of(id);
    for compound in ancestors.iter().rev() {
        loop {
            let Some(node) = cursor else { return false };
            cursor = tree.parent_of(node);
            if let Some((tag, attrs)) = tree.element(node) {
                if compound.matches(tag, attrs) {
                    break;
                }
            }
        }
    }
    true
}

fn split_outside_brackets(input: &str, is_sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 && is_sep(c) => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let chars: Vec<char> = token.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| c.is_ascii_alphabetic()) {
        compound.tag = Some(take_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let ident = take_ident(&chars, &mut pos);
                if ident.is_empty() {
                    return Err("expected id after `#`".into());
                }
                compound.id = Some(ident);
            }
            '.' => {
                pos += 1;
                let ident = take_ident(&chars, &mut pos);
                if ident.is_empty() {
                    return Err("expected class after `.`".into());
                }
                compound.classes.push(ident);
            }
            '[' => {
                pos += 1;
                compound.attrs.push(parse_attr(&chars, &mut pos)?);
            }
            other => return Err(format!("unexpected `{other}`")),
        }
    }

    Ok(compound)
}

fn parse_attr(chars: &[char], pos: &mut usize) -> Result<AttrMatch, String> {
    let name = take_ident(chars, pos);
    if name.is_empty() {
        return Err("expected attribute name".into());
    }

    let op = match chars.get(*pos) {
        Some(']') => {
            *pos += 1;
            return Ok(AttrMatch {
                name,
                op: AttrOp::Exists,
            });
        }
        Some('=') => {
            *pos += 1;
            AttrOp::Equals(String::new())
        }
        Some('^') if chars.get(*pos + 1) == Some(&'=') => {
            *pos += 2;
            AttrOp::Prefix(String::new())
        }
        _ => return Err(format!("malformed attribute selector for `{name}`")),
    };

    let value = match chars.get(*pos) {
        Some(&q) if q == '"' || q == '\'' => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != q {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err("unterminated quoted value".into());
            }
            let value: String = chars[start..*pos].iter().collect();
            *pos += 1;
            value
        }
        _ => take_ident(chars, pos),
    };

    if chars.get(*pos) != Some(&']') {
        return Err("expected `]`".into());
    }
    *pos += 1;

    let op = match op {
        AttrOp::Equals(_) => AttrOp::Equals(value),
        AttrOp::Prefix(_) => AttrOp::Prefix(value),
        AttrOp::Exists => AttrOp::Exists,
    };
    Ok(AttrMatch { name, op })
}
