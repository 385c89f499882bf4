//! Renderer - turning template output into DOM.
//!
//! Two strategies, picked per render by the [`View`] a template returns:
//!
//! - [`View::Html`]: the string is parsed and the container's children are
//!   replaced wholesale ([`paint_html`]). Simple; repaints everything.
//! - [`View::Tree`]: a [`VNode`] tree is reconciled against the previous one
//!   ([`Reconciler`]). Nodes matched by key at the same path keep their DOM
//!   identity (focus, input value); unmatched ones are torn down and their
//!   hook cleanups run.

mod hooks;
mod html;
mod reconcile;
mod vnode;

pub use hooks::{Hooks, StateSetter};
pub use html::{paint_html, Html};
pub use reconcile::{PatchStats, Reconciler};
pub use vnode::{component, fragment, h, text, VComponent, VElement, VNode};

/// What a template produces.
pub enum View {
    Html(String),
    Tree(VNode),
}

impl View {
    pub fn empty() -> Self {
        View::Html(String::new())
    }
}

impl From<String> for View {
    fn from(html: String) -> Self {
        View::Html(html)
    }
}

impl From<&str> for View {
    fn from(html: &str) -> Self {
        View::Html(html.to_string())
    }
}

impl From<Html> for View {
    fn from(html: Html) -> Self {
        View::Html(html.into_string())
    }
}

impl From<VNode> for View {
    fn from(tree: VNode) -> Self {
        View::Tree(tree)
    }
}

impl From<VElement> for View {
    fn from(element: VElement) -> Self {
        View::Tree(element.into())
    }
}
