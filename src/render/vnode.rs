//! Virtual nodes.

use std::fmt;
use std::rc::Rc;

use crate::dom::Event;

use super::hooks::Hooks;

pub type ListenerFn = Rc<dyn Fn(&Event)>;
pub type RenderFn = Rc<dyn Fn(&Hooks) -> VNode>;

/// A node of the virtual tree.
#[derive(Clone)]
pub enum VNode {
    Text(String),
    Element(VElement),
    Component(VComponent),
    Fragment(Vec<VNode>),
}

impl VNode {
    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element(e) => e.key.as_deref(),
            VNode::Component(c) => c.key.as_deref(),
            VNode::Text(_) | VNode::Fragment(_) => None,
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Text(t) => f.debug_tuple("Text").field(t).finish(),
            VNode::Element(e) => e.fmt(f),
            VNode::Component(c) => f
                .debug_struct("Component")
                .field("name", &c.name)
                .field("key", &c.key)
                .finish(),
            VNode::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
        }
    }
}

/// An element with attributes, directly bound listeners and children.
#[derive(Clone)]
pub struct VElement {
    pub(crate) tag: String,
    pub(crate) key: Option<String>,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) listeners: Vec<(String, ListenerFn)>,
    pub(crate) children: Vec<VNode>,
}

impl VElement {
    pub fn key(mut self, key: impl fmt::Display) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
        self
    }

    /// Set `name` only when `condition` holds (boolean attributes).
    pub fn attr_if(self, condition: bool, name: &str, value: impl fmt::Display) -> Self {
        if condition { self.attr(name, value) } else { self }
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Bind `handler` to `event_type` on this element.
    pub fn on(mut self, event_type: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let handler: ListenerFn = Rc::new(handler);
        self.listeners.push((event_type.to_string(), handler));
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, content: impl fmt::Display) -> Self {
        self.child(VNode::Text(content.to_string()))
    }
}

impl fmt::Debug for VElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("key", &self.key)
            .field("attrs", &self.attrs)
            .field("listeners", &self.listeners.len())
            .field("children", &self.children)
            .finish()
    }
}

/// A function component with its own hook state.
#[derive(Clone)]
pub struct VComponent {
    pub(crate) name: String,
    pub(crate) key: Option<String>,
    pub(crate) render: RenderFn,
}

impl VComponent {
    pub fn key(mut self, key: impl fmt::Display) -> Self {
        self.key = Some(key.to_string());
        self
    }
}

impl From<VElement> for VNode {
    fn from(element: VElement) -> Self {
        VNode::Element(element)
    }
}

impl From<VComponent> for VNode {
    fn from(component: VComponent) -> Self {
        VNode::Component(component)
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::Text(text)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::Text(text.to_string())
    }
}

/// Start an element.
pub fn h(tag: &str) -> VElement {
    VElement {
        tag: tag.to_ascii_lowercase(),
        key: None,
        attrs: Vec::new(),
        listeners: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(content: impl fmt::Display) -> VNode {
    VNode::Text(content.to_string())
}

pub fn fragment(children: impl IntoIterator<Item = VNode>) -> VNode {
    VNode::Fragment(children.into_iter().collect())
}

/// A function component. `render` runs on every reconcile of its parent and
/// whenever one of its state setters changes a value.
pub fn component(name: &str, render: impl Fn(&Hooks) -> VNode + 'static) -> VComponent {
    VComponent {
        name: name.to_string(),
        key: None,
        render: Rc::new(render),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_replaces_duplicate_attrs() {
        let el = h("DIV").attr("class", "a").attr("class", "b").key(3);
        assert_eq!(el.tag, "div");
        assert_eq!(el.attrs, vec![("class".to_string(), "b".to_string())]);
        assert_eq!(el.key.as_deref(), Some("3"));
    }
}
