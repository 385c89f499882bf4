//! String strategy.

use std::fmt::{self, Write};

use crate::dom::{escape_attr, escape_text, Document, DomError, NodeId};

/// Replace the children of `container` with the parsed `html`.
///
/// The markup is parsed before anything is removed, so a parse failure leaves
/// the previous paint intact. Returns the number of top-level nodes painted.
pub fn paint_html(document: &Document, container: NodeId, html: &str) -> Result<usize, DomError> {
    Ok(document.set_inner_html(container, html)?.len())
}

/// Escaping string builder for templates.
///
/// `push_text`/`push_attr` escape; `push_raw` trusts its input.
#[derive(Debug, Default, Clone)]
pub struct Html {
    buf: String,
}

impl Html {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_raw(&mut self, markup: &str) -> &mut Self {
        self.buf.push_str(markup);
        self
    }

    pub fn push_text(&mut self, text: impl fmt::Display) -> &mut Self {
        self.buf.push_str(&escape_text(&text.to_string()));
        self
    }

    /// ` name="value"`, escaped.
    pub fn push_attr(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        let _ = write!(self.buf, " {name}=\"{}\"", escape_attr(&value.to_string()));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Display for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_escapes() {
        let mut html = Html::new();
        html.push_raw("<a")
            .push_attr("title", "\"quoted\"")
            .push_raw(">")
            .push_text("<b>")
            .push_raw("</a>");
        assert_eq!(html.as_str(), "<a title=\"&quot;quoted&quot;\">&lt;b&gt;</a>");
    }

    #[test]
    fn test_paint_replaces_children() {
        let doc = Document::new();
        let root = doc.body();
        paint_html(&doc, root, "<p>old</p>").unwrap();
        let old = doc.children(root)[0];

        assert_eq!(paint_html(&doc, root, "<p>new</p><p>more</p>").unwrap(), 2);
        assert!(!doc.exists(old));
        assert_eq!(doc.text_content(root), "newmore");
    }
}
