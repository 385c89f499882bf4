//! HTML parsing (via `tl`) and escaping.

use super::{Document, DomError, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements serialized without a closing tag.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Decode the character references templates actually produce.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let name = &rest[1..end];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    let code = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        name.strip_prefix('#').and_then(|dec| dec.parse().ok())
                    };
                    code.and_then(char::from_u32)
                }
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
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

/// Parse an HTML fragment into detached nodes owned by `doc`.
///
/// Whitespace-only text between tags is dropped; comments are skipped.
pub(crate) fn parse_fragment(doc: &Document, html: &str) -> Result<Vec<NodeId>, DomError> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|e| DomError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();

    let mut roots = Vec::new();
    for handle in dom.children() {
        if let Some(node) = convert(doc, *handle, parser)? {
            roots.push(node);
        }
    }
    Ok(roots)
}

fn convert(
    doc: &Document,
    handle: tl::NodeHandle,
    parser: &tl::Parser,
) -> Result<Option<NodeId>, DomError> {
    let Some(node) = handle.get(parser) else {
        return Ok(None);
    };

    match node {
        tl::Node::Tag(tag) => {
            let tag_name = tag.name().as_utf8_str().to_lowercase();
            let element = doc.create_element(&tag_name);

            for (key, value) in tag.attributes().iter() {
                let key: &str = key.as_ref();
                let value = value.map(|v| decode_entities(&v)).unwrap_or_default();
                doc.set_attribute(element, &key.to_lowercase(), &value)?;
            }

            for child in tag.children().top().iter() {
                if let Some(child) = convert(doc, *child, parser)? {
                    doc.append_child(element, child)?;
                }
            }
            Ok(Some(element))
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            if text.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(doc.create_text(&decode_entities(&text))))
            }
        }
        tl::Node::Comment(_) => Ok(None),
    }
}
