//! Document - the node arena.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::html::{self, escape_attr, escape_text, is_void_element};
use super::selector::{ElementTree, Selector};
use super::{DomError, Event};

/// Handle to a node in a [`Document`].
///
/// Arena slots are reused once a node is released; the generation makes a
/// stale handle miss instead of reaching the slot's new occupant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self { index, generation: 0 }
    }
}

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Event)>;

enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        /// Live `value` property (inputs); falls back to the attribute.
        value: Option<String>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(ListenerId, String, Listener)>,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

struct DocumentInner {
    slots: Vec<Slot>,
    /// Released slot indices, reused before the arena grows.
    free: Vec<usize>,
    root: NodeId,
    focused: Option<NodeId>,
    next_listener: u64,
}

impl DocumentInner {
    fn node(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
            .ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
            .ok_or(DomError::UnknownNode(id))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Empty the slot and retire its generation.
    fn free_slot(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index) else { return };
        if slot.generation != id.generation || slot.data.is_none() {
            return;
        }
        slot.data = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).ok().and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) -> Result<(), DomError> {
        if !matches!(self.node(parent)?.kind, NodeKind::Element { .. }) {
            return Err(DomError::NotAnElement(parent));
        }
        if self.contains(child, parent) {
            return Err(DomError::Hierarchy { parent, child });
        }
        self.detach(child)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let position = before
            .and_then(|b| siblings.iter().position(|c| *c == b))
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn collect_descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        if let Ok(node) = self.node(root) {
            for child in &node.children {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.write_text(*child, out);
                }
            }
        }
    }
}

impl ElementTree for DocumentInner {
    fn element(&self, id: NodeId) -> Option<(&str, &[(String, String)])> {
        match &self.node(id).ok()?.kind {
            NodeKind::Element { tag, attrs, .. } => Some((tag.as_str(), attrs.as_slice())),
            NodeKind::Text(_) => None,
        }
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }
}

// =============================================================================
// Document
// =============================================================================

/// Shared handle to the document arena.
///
/// Every method borrows the arena only for its own duration, and listeners run
/// with no borrow held, so handlers are free to mutate the document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

/// Weak counterpart of [`Document`].
#[derive(Clone)]
pub struct WeakDocument(Weak<RefCell<DocumentInner>>);

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with an empty `<body>` root.
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::default(),
            focused: None,
            next_listener: 0,
        };
        inner.root = inner.push(NodeKind::Element {
            tag: "body".into(),
            attrs: Vec::new(),
            value: None,
        });
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().root
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle, for listeners stored inside the document itself.
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument(Rc::downgrade(&self.inner))
    }

    // -------------------------------------------------------------------------
    // CREATION
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: None,
        })
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner.borrow_mut().push(NodeKind::Text(text.to_string()))
    }

    /// Parse `html` into detached nodes.
    pub fn parse_fragment(&self, html: &str) -> Result<Vec<NodeId>, DomError> {
        html::parse_fragment(self, html)
    }

    /// Free `id` and its whole subtree, including listeners.
    pub fn release(&self, id: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if id == inner.root {
            return Err(DomError::Hierarchy { parent: id, child: id });
        }
        inner.detach(id)?;
        let mut doomed = vec![id];
        inner.collect_descendants(id, &mut doomed);
        for node in &doomed {
            if inner.focused == Some(*node) {
                inner.focused = None;
            }
            inner.free_slot(*node);
        }
        Ok(())
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.inner.borrow().node(id).is_ok()
    }

    /// Number of live nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().slots.iter().filter(|s| s.data.is_some()).count()
    }

    /// Slots in the arena, live or free.
    pub fn arena_len(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    // -------------------------------------------------------------------------
    // NODE DATA
    // -------------------------------------------------------------------------

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.inner.borrow().element(id).map(|(tag, _)| tag.to_string())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.inner.borrow().element(id).is_some()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let inner = self.inner.borrow();
        let (_, attrs) = inner.element(id)?;
        attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .element(id)
            .map(|(_, attrs)| attrs.to_vec())
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.node_mut(id)?.kind {
            NodeKind::Element { attrs, .. } => {
                match attrs.iter_mut().find(|(k, _)| k == name) {
                    Some((_, v)) => *v = value.to_string(),
                    None => attrs.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            NodeKind::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) -> Result<bool, DomError> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.node_mut(id)?.kind {
            NodeKind::Element { attrs, .. } => {
                let before = attrs.len();
                attrs.retain(|(k, _)| k != name);
                Ok(attrs.len() != before)
            }
            NodeKind::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    /// The live `value` property, or the `value` attribute if never set.
    pub fn value(&self, id: NodeId) -> Option<String> {
        let inner = self.inner.borrow();
        match &inner.node(id).ok()?.kind {
            NodeKind::Element { value: Some(v), .. } => Some(v.clone()),
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == "value")
                .map(|(_, v)| v.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_value(&self, id: NodeId, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.node_mut(id)?.kind {
            NodeKind::Element { value: slot, .. } => {
                *slot = Some(value.to_string());
                Ok(())
            }
            NodeKind::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// Data of a text node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match &self.inner.borrow().node(id).ok()?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn set_text(&self, id: NodeId, text: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.node_mut(id)?.kind {
            NodeKind::Text(data) => {
                *data = text.to_string();
                Ok(())
            }
            NodeKind::Element { .. } => Err(DomError::NotAnElement(id)),
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().write_text(id, &mut out);
        out
    }

    // -------------------------------------------------------------------------
    // TREE
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().parent_of(id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.inner.borrow_mut().attach(parent, child, None)
    }

    /// Insert `child` before `reference`, or append if `reference` is `None`
    /// or not a child of `parent`.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.inner.borrow_mut().attach(parent, child, reference)
    }

    /// Detach `id` from its parent, keeping it alive.
    pub fn remove(&self, id: NodeId) -> Result<(), DomError> {
        self.inner.borrow_mut().detach(id)
    }

    /// Make `children` the exact, ordered child list of `parent`.
    ///
    /// Nodes already under `parent` keep their identity; previous children not
    /// in the list are detached (not released).
    pub fn set_children(&self, parent: NodeId, children: &[NodeId]) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        for child in inner.node(parent)?.children.clone() {
            if !children.contains(&child) {
                inner.detach(child)?;
            }
        }
        for child in children {
            inner.attach(parent, *child, None)?;
        }
        Ok(())
    }

    /// Release every child of `parent`.
    pub fn clear_children(&self, parent: NodeId) -> Result<(), DomError> {
        for child in self.children(parent) {
            self.release(child)?;
        }
        Ok(())
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().contains(ancestor, node)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.contains(inner.root, id)
    }

    // -------------------------------------------------------------------------
    // SELECTORS
    // -------------------------------------------------------------------------

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches_in(&*self.inner.borrow(), id)
    }

    /// Nearest inclusive ancestor matching `selector`. Text nodes start the
    /// search at their parent.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if selector.matches_in(&*inner, current) {
                return Some(current);
            }
            cursor = inner.parent_of(current);
        }
        None
    }

    /// Descendants of `root` (exclusive) matching `selector`, in document order.
    pub fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut all = Vec::new();
        inner.collect_descendants(root, &mut all);
        all.into_iter()
            .filter(|id| selector.matches_in(&*inner, *id))
            .collect()
    }

    pub fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.query_selector_all(root, selector).into_iter().next()
    }

    /// Parse `css` and query. Mostly a test and page convenience.
    pub fn find(&self, root: NodeId, css: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector(root, &Selector::parse(css)?))
    }

    pub fn find_all(&self, root: NodeId, css: &str) -> Result<Vec<NodeId>, DomError> {
        Ok(self.query_selector_all(root, &Selector::parse(css)?))
    }

    // -------------------------------------------------------------------------
    // FOCUS
    // -------------------------------------------------------------------------

    pub fn focus(&self, id: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(id)?;
        inner.focused = Some(id);
        Ok(())
    }

    pub fn blur(&self) {
        self.inner.borrow_mut().focused = None;
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.borrow().focused
    }

    // -------------------------------------------------------------------------
    // SERIALIZATION
    // -------------------------------------------------------------------------

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().write_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if let Ok(node) = inner.node(id) {
            for child in &node.children {
                inner.write_html(*child, &mut out);
            }
        }
        out
    }

    /// Replace the children of `id` with the parsed `html`.
    ///
    /// Parsing happens before anything is removed: on a parse error the
    /// previous children stay in place.
    pub fn set_inner_html(&self, id: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        let fresh = self.parse_fragment(html)?;
        self.clear_children(id)?;
        for node in &fresh {
            self.append_child(id, *node)?;
        }
        Ok(fresh)
    }

    // -------------------------------------------------------------------------
    // EVENTS
    // -------------------------------------------------------------------------

    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        listener: impl Fn(&Event) + 'static,
    ) -> Result<ListenerId, DomError> {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        let listener: Listener = Rc::new(listener);
        inner
            .node_mut(node)?
            .listeners
            .push((id, event_type.to_string(), listener));
        Ok(id)
    }

    /// Returns whether a listener was removed.
    pub fn remove_event_listener(&self, node: NodeId, listener: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Ok(data) = inner.node_mut(node) else {
            return false;
        };
        let before = data.listeners.len();
        data.listeners.retain(|(id, _, _)| *id != listener);
        data.listeners.len() != before
    }

    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.listeners.iter().filter(|(_, t, _)| t == event_type).count())
            .unwrap_or(0)
    }

    /// Listeners across the whole arena.
    pub fn total_listener_count(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter_map(|s| s.data.as_ref())
            .map(|n| n.listeners.len())
            .sum()
    }

    /// Dispatch `event` at its target and bubble it to the root.
    ///
    /// Returns the event so callers can inspect `default_prevented`.
    pub fn dispatch_event(&self, event: Event) -> Event {
        let path: Vec<NodeId> = {
            let inner = self.inner.borrow();
            let mut path = Vec::new();
            let mut cursor = Some(event.target());
            while let Some(node) = cursor {
                path.push(node);
                if !event.bubbles() {
                    break;
                }
                cursor = inner.parent_of(node);
            }
            path
        };

        for node in path {
            let listeners: Vec<Listener> = {
                let inner = self.inner.borrow();
                match inner.node(node) {
                    Ok(data) => data
                        .listeners
                        .iter()
                        .filter(|(_, t, _)| t == event.event_type())
                        .map(|(_, _, l)| l.clone())
                        .collect(),
                    Err(_) => continue,
                }
            };

            event.set_current_target(node);
            for listener in listeners {
                listener(&event);
                if event.is_immediate_stopped() {
                    break;
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    /// Dispatch a `click` at `target`.
    pub fn click(&self, target: NodeId) -> Event {
        self.dispatch_event(Event::new("click", target))
    }

    /// Set the value of `target` and dispatch `input`.
    pub fn input(&self, target: NodeId, value: &str) -> Result<Event, DomError> {
        self.set_value(target, value)?;
        Ok(self.dispatch_event(Event::new("input", target)))
    }

    /// Set the value of `target` and dispatch `change`.
    pub fn change(&self, target: NodeId, value: &str) -> Result<Event, DomError> {
        self.set_value(target, value)?;
        Ok(self.dispatch_event(Event::new("change", target)))
    }

    /// Dispatch a `keydown` for `key` at `target`.
    pub fn key_down(&self, target: NodeId, key: &str) -> Event {
        self.dispatch_event(Event::key(target, key))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn el(doc: &Document, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = doc.create_element(tag);
        for (k, v) in attrs {
            doc.set_attribute(id, k, v).unwrap();
        }
        doc.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_tree_building_and_serialization() {
        let doc = Document::new();
        let body = doc.body();
        let div = el(&doc, body, "div", &[("class", "card"), ("title", "a\"b")]);
        let text = doc.create_text("1 < 2");
        doc.append_child(div, text).unwrap();
        el(&doc, div, "br", &[]);

        assert_eq!(
            doc.inner_html(body),
            "<div class=\"card\" title=\"a&quot;b\">1 &lt; 2<br></div>"
        );
        assert_eq!(doc.text_content(body), "1 < 2");
        assert!(doc.is_connected(text));
    }

    #[test]
    fn test_append_moves_and_rejects_cycles() {
        let doc = Document::new();
        let body = doc.body();
        let a = el(&doc, body, "div", &[]);
        let b = el(&doc, body, "div", &[]);

        doc.append_child(b, a).unwrap();
        assert_eq!(doc.children(body), vec![b]);
        assert_eq!(doc.parent(a), Some(b));

        assert_eq!(
            doc.append_child(a, b),
            Err(DomError::Hierarchy { parent: a, child: b })
        );
    }

    #[test]
    fn test_set_children_preserves_identity() {
        let doc = Document::new();
        let ul = el(&doc, doc.body(), "ul", &[]);
        let one = el(&doc, ul, "li", &[]);
        let two = el(&doc, ul, "li", &[]);
        let three = el(&doc, ul, "li", &[]);

        doc.set_children(ul, &[three, one]).unwrap();
        assert_eq!(doc.children(ul), vec![three, one]);
        assert_eq!(doc.parent(two), None);
        assert!(doc.exists(two));
    }

    #[test]
    fn test_release_frees_subtree() {
        let doc = Document::new();
        let div = el(&doc, doc.body(), "div", &[]);
        let input = el(&doc, div, "input", &[]);
        doc.focus(input).unwrap();
        doc.add_event_listener(input, "click", |_| {}).unwrap();

        doc.release(div).unwrap();
        assert!(!doc.exists(div));
        assert!(!doc.exists(input));
        assert_eq!(doc.active_element(), None);
        assert_eq!(doc.total_listener_count(), 0);
    }

    #[test]
    fn test_released_slots_are_reused() {
        let doc = Document::new();
        let list = el(&doc, doc.body(), "ul", &[]);
        for round in 0..20 {
            doc.set_inner_html(list, "<li>one</li><li>two</li><li>three</li>").unwrap();
            if round == 0 {
                assert_eq!(doc.node_count(), 8);
            }
        }
        assert_eq!(doc.node_count(), 8);
        assert!(doc.arena_len() <= 14, "arena grew to {}", doc.arena_len());
    }

    #[test]
    fn test_stale_id_misses_reused_slot() {
        let doc = Document::new();
        let old = doc.create_element("div");
        doc.release(old).unwrap();
        let new = doc.create_element("span");

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(!doc.exists(old));
        assert_eq!(doc.tag_name(new).as_deref(), Some("span"));
        assert!(matches!(doc.set_attribute(old, "id", "x"), Err(DomError::UnknownNode(_))));
    }

    #[test]
    fn test_closest_and_query() {
        let doc = Document::new();
        let card = el(&doc, doc.body(), "div", &[("class", "product-card"), ("data-product-id", "7")]);
        let button = el(&doc, card, "button", &[("class", "add-to-cart-btn")]);
        let label = doc.create_text("Add");
        doc.append_child(button, label).unwrap();

        let sel = Selector::parse("[data-product-id]").unwrap();
        assert_eq!(doc.closest(label, &sel), Some(card));
        assert_eq!(doc.find(doc.body(), ".add-to-cart-btn").unwrap(), Some(button));
        assert_eq!(doc.find_all(doc.body(), "div, button").unwrap(), vec![card, button]);
    }

    #[test]
    fn test_set_inner_html_replaces_children() {
        let doc = Document::new();
        let root = el(&doc, doc.body(), "main", &[]);
        doc.set_inner_html(root, "<p>one</p>").unwrap();
        let first = doc.children(root)[0];

        doc.set_inner_html(root, "<p>two</p><p>three</p>").unwrap();
        assert!(!doc.exists(first));
        assert_eq!(doc.inner_html(root), "<p>two</p><p>three</p>");
    }

    #[test]
    fn test_value_property_shadows_attribute() {
        let doc = Document::new();
        let input = el(&doc, doc.body(), "input", &[("value", "1")]);
        assert_eq!(doc.value(input).as_deref(), Some("1"));

        doc.set_value(input, "5").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("5"));
        assert_eq!(doc.attribute(input, "value").as_deref(), Some("1"));
    }

    #[test]
    fn test_dispatch_bubbles_and_stops() {
        let doc = Document::new();
        let outer = el(&doc, doc.body(), "div", &[]);
        let inner = el(&doc, outer, "button", &[]);
        let log = Rc::new(RefCell::new(Vec::new()));

        for (node, name) in [(doc.body(), "body"), (outer, "outer"), (inner, "inner")] {
            let log = log.clone();
            doc.add_event_listener(node, "click", move |e| {
                log.borrow_mut().push((name, e.current_target()));
            })
            .unwrap();
        }

        doc.click(inner);
        assert_eq!(
            *log.borrow(),
            vec![("inner", inner), ("outer", outer), ("body", doc.body())]
        );

        log.borrow_mut().clear();
        doc.add_event_listener(outer, "click", |e| e.stop_propagation())
            .unwrap();
        doc.click(inner);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_listener_may_mutate_document() {
        let doc = Document::new();
        let button = el(&doc, doc.body(), "button", &[]);
        let doc_c = doc.clone();
        doc.add_event_listener(button, "click", move |e| {
            doc_c.set_attribute(e.target(), "data-clicked", "yes").unwrap();
        })
        .unwrap();

        let event = doc.click(button);
        assert!(!event.default_prevented());
        assert_eq!(doc.attribute(button, "data-clicked").as_deref(), Some("yes"));
    }
}
