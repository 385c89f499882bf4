//! In-memory DOM.
//!
//! A small arena document standing in for the browser DOM: elements, text
//! nodes, attributes, a `value` property, focus, bubbling event dispatch, a
//! CSS selector subset and HTML (de)serialization. Everything the render core
//! needs from `document`, and nothing else.

mod document;
mod event;
mod html;
mod selector;

use thiserror::Error;

pub use document::{Document, ListenerId, NodeId, WeakDocument};
pub use event::{Event, EventFlags};
pub use html::{escape_attr, escape_text, is_void_element};
pub use selector::Selector;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("cannot insert {child:?} under {parent:?}: it is an ancestor")]
    Hierarchy { parent: NodeId, child: NodeId },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("HTML parse error: {0}")]
    Parse(String),
}
