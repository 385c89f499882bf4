//! Tree strategy - keyed reconciliation against the live DOM.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::dom::{Document, DomError, ListenerId, NodeId};
use crate::reactive::Runtime;

use super::hooks::{HookStore, Hooks};
use super::vnode::{VComponent, VElement, VNode};

/// What one patch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub created: usize,
    pub reused: usize,
    pub removed: usize,
}

/// A virtual node after fragment splicing.
enum Flat {
    Text(String),
    Element(VElement),
    Component(VComponent),
}

fn flatten(nodes: Vec<VNode>, out: &mut Vec<Flat>) {
    for node in nodes {
        match node {
            VNode::Text(t) => out.push(Flat::Text(t)),
            VNode::Element(e) => out.push(Flat::Element(e)),
            VNode::Component(c) => out.push(Flat::Component(c)),
            VNode::Fragment(children) => flatten(children, out),
        }
    }
}

/// The identity a node is matched by: its explicit key, or its position and
/// kind among its siblings.
fn slot_key(node: &Flat, index: usize) -> String {
    match node {
        Flat::Element(VElement { key: Some(k), .. }) | Flat::Component(VComponent { key: Some(k), .. }) => {
            format!("key:{k}")
        }
        Flat::Text(_) => format!("{index}:#text"),
        Flat::Element(e) => format!("{index}:{}", e.tag),
        Flat::Component(c) => format!("{index}:<{}>", c.name),
    }
}

/// The record of what is currently painted.
enum Mounted {
    Text {
        slot: String,
        node: NodeId,
        text: String,
    },
    Element {
        slot: String,
        node: NodeId,
        tag: String,
        attrs: Vec<(String, String)>,
        listeners: Vec<ListenerId>,
        children: Vec<Mounted>,
    },
    Component {
        slot: String,
        name: String,
        hooks: Rc<HookStore>,
        children: Vec<Mounted>,
    },
}

impl Mounted {
    fn slot(&self) -> &str {
        match self {
            Mounted::Text { slot, .. } | Mounted::Element { slot, .. } | Mounted::Component { slot, .. } => slot,
        }
    }

    fn compatible(&self, next: &Flat) -> bool {
        match (self, next) {
            (Mounted::Text { .. }, Flat::Text(_)) => true,
            (Mounted::Element { tag, .. }, Flat::Element(e)) => *tag == e.tag,
            (Mounted::Component { name, .. }, Flat::Component(c)) => *name == c.name,
            _ => false,
        }
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        match self {
            Mounted::Text { node, .. } | Mounted::Element { node, .. } => out.push(*node),
            Mounted::Component { children, .. } => {
                for child in children {
                    child.collect_nodes(out);
                }
            }
        }
    }
}

fn dom_nodes(list: &[Mounted]) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(list.len());
    for mounted in list {
        mounted.collect_nodes(&mut out);
    }
    out
}

// =============================================================================
// Reconciler
// =============================================================================

/// Keeps the children of `container` in sync with successive virtual trees.
pub struct Reconciler {
    document: Document,
    container: NodeId,
    runtime: Runtime,
    rerender: Rc<dyn Fn()>,
    mounted: Vec<Mounted>,
}

impl Reconciler {
    /// `rerender` is what hook state setters call to request a new patch.
    pub fn new(document: Document, container: NodeId, runtime: Runtime, rerender: Rc<dyn Fn()>) -> Self {
        Self {
            document,
            container,
            runtime,
            rerender,
            mounted: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Top-level DOM nodes currently painted.
    pub fn root_nodes(&self) -> Vec<NodeId> {
        dom_nodes(&self.mounted)
    }

    /// Bring the container in line with `tree`.
    ///
    /// On error everything painted is torn down (hook cleanups included) and
    /// the reconciler is left empty, so the next patch starts fresh.
    pub fn patch(&mut self, tree: VNode) -> Result<PatchStats, DomError> {
        let old = std::mem::take(&mut self.mounted);
        let mut pass = Pass {
            document: &self.document,
            runtime: &self.runtime,
            rerender: &self.rerender,
            stats: PatchStats::default(),
        };
        let list = pass.diff_children(old, vec![tree])?;
        if let Err(err) = self.document.set_children(self.container, &dom_nodes(&list)) {
            for mounted in list {
                pass.remove(mounted);
            }
            return Err(err);
        }
        self.mounted = list;

        debug!(
            created = pass.stats.created,
            reused = pass.stats.reused,
            removed = pass.stats.removed,
            "tree patched"
        );
        Ok(pass.stats)
    }

    /// Remove everything painted, running hook cleanups. Returns the number
    /// of mounted records removed.
    pub fn teardown(&mut self) -> usize {
        let old = std::mem::take(&mut self.mounted);
        let mut pass = Pass {
            document: &self.document,
            runtime: &self.runtime,
            rerender: &self.rerender,
            stats: PatchStats::default(),
        };
        for mounted in old {
            pass.remove(mounted);
        }
        pass.stats.removed
    }
}

struct Pass<'a> {
    document: &'a Document,
    runtime: &'a Runtime,
    rerender: &'a Rc<dyn Fn()>,
    stats: PatchStats,
}

impl Pass<'_> {
    /// On error, both the unconsumed `old` records and the ones already
    /// built are removed before returning.
    fn diff_children(&mut self, old: Vec<Mounted>, next: Vec<VNode>) -> Result<Vec<Mounted>, DomError> {
        let mut flat = Vec::with_capacity(next.len());
        flatten(next, &mut flat);

        let mut by_slot: HashMap<String, usize> = HashMap::with_capacity(old.len());
        for (i, mounted) in old.iter().enumerate() {
            by_slot.insert(mounted.slot().to_string(), i);
        }
        let mut old: Vec<Option<Mounted>> = old.into_iter().map(Some).collect();

        let mut out = Vec::with_capacity(flat.len());
        let mut seen = std::collections::HashSet::with_capacity(flat.len());
        for (index, node) in flat.into_iter().enumerate() {
            let mut slot = slot_key(&node, index);
            if !seen.insert(slot.clone()) {
                warn!(slot = %slot, "duplicate key among siblings");
                slot = format!("{slot}@{index}");
                seen.insert(slot.clone());
            }

            let previous = by_slot.get(&slot).and_then(|&i| old[i].take());
            let result = match previous {
                Some(prev) if prev.compatible(&node) => self.update(prev, node),
                Some(prev) => {
                    self.remove(prev);
                    self.create(node, slot)
                }
                None => self.create(node, slot),
            };
            match result {
                Ok(mounted) => out.push(mounted),
                Err(err) => {
                    for mounted in out.into_iter().chain(old.into_iter().flatten()) {
                        self.remove(mounted);
                    }
                    return Err(err);
                }
            }
        }

        for leftover in old.into_iter().flatten() {
            self.remove(leftover);
        }
        Ok(out)
    }

    fn create(&mut self, node: Flat, slot: String) -> Result<Mounted, DomError> {
        self.stats.created += 1;
        match node {
            Flat::Text(text) => {
                let node = self.document.create_text(&text);
                Ok(Mounted::Text { slot, node, text })
            }
            Flat::Element(element) => {
                let node = self.document.create_element(&element.tag);
                let listeners = match self.init_element(node, &element) {
                    Ok(listeners) => listeners,
                    Err(err) => {
                        self.release(node);
                        return Err(err);
                    }
                };
                let children = match self.diff_children(Vec::new(), element.children) {
                    Ok(children) => children,
                    Err(err) => {
                        self.release(node);
                        return Err(err);
                    }
                };
                let painted = dom_nodes(&children);
                self.settle_element(
                    Mounted::Element {
                        slot,
                        node,
                        tag: element.tag,
                        attrs: element.attrs,
                        listeners,
                        children,
                    },
                    node,
                    &painted,
                )
            }
            Flat::Component(component) => {
                let hooks = HookStore::new(&component.name, self.runtime.clone(), self.rerender.clone());
                let output = render_component(&component, &hooks);
                let children = match self.diff_children(Vec::new(), vec![output]) {
                    Ok(children) => children,
                    Err(err) => {
                        hooks.teardown();
                        return Err(err);
                    }
                };
                Ok(Mounted::Component {
                    slot,
                    name: component.name,
                    hooks,
                    children,
                })
            }
        }
    }

    fn update(&mut self, prev: Mounted, node: Flat) -> Result<Mounted, DomError> {
        self.stats.reused += 1;
        match (prev, node) {
            (Mounted::Text { slot, node, text }, Flat::Text(next)) => {
                if text != next {
                    if let Err(err) = self.document.set_text(node, &next) {
                        self.release(node);
                        return Err(err);
                    }
                }
                Ok(Mounted::Text { slot, node, text: next })
            }
            (
                Mounted::Element {
                    slot,
                    node,
                    tag,
                    attrs,
                    listeners,
                    children,
                },
                Flat::Element(element),
            ) => {
                let listeners = match self.refresh_element(node, &attrs, listeners, &element) {
                    Ok(listeners) => listeners,
                    Err(err) => {
                        self.remove(Mounted::Element {
                            slot,
                            node,
                            tag,
                            attrs,
                            listeners: Vec::new(),
                            children,
                        });
                        return Err(err);
                    }
                };
                let children = match self.diff_children(children, element.children) {
                    Ok(children) => children,
                    Err(err) => {
                        self.release(node);
                        return Err(err);
                    }
                };
                let painted = dom_nodes(&children);
                self.settle_element(
                    Mounted::Element {
                        slot,
                        node,
                        tag,
                        attrs: element.attrs,
                        listeners,
                        children,
                    },
                    node,
                    &painted,
                )
            }
            (
                Mounted::Component {
                    slot,
                    name,
                    hooks,
                    children,
                },
                Flat::Component(component),
            ) => {
                let output = render_component(&component, &hooks);
                let children = match self.diff_children(children, vec![output]) {
                    Ok(children) => children,
                    Err(err) => {
                        hooks.teardown();
                        return Err(err);
                    }
                };
                Ok(Mounted::Component {
                    slot,
                    name,
                    hooks,
                    children,
                })
            }
            (prev, node) => {
                // compatible() rules this out; recover by replacing.
                self.stats.reused -= 1;
                let slot = prev.slot().to_string();
                self.remove(prev);
                self.create(node, slot)
            }
        }
    }

    fn init_element(&self, node: NodeId, element: &VElement) -> Result<Vec<ListenerId>, DomError> {
        for (name, value) in &element.attrs {
            self.document.set_attribute(node, name, value)?;
            if name == "value" {
                self.document.set_value(node, value)?;
            }
        }
        self.bind(node, element)
    }

    fn refresh_element(
        &self,
        node: NodeId,
        attrs: &[(String, String)],
        listeners: Vec<ListenerId>,
        element: &VElement,
    ) -> Result<Vec<ListenerId>, DomError> {
        for (name, value) in &element.attrs {
            let unchanged = attrs.iter().any(|(k, v)| k == name && v == value);
            if unchanged {
                continue;
            }
            self.document.set_attribute(node, name, value)?;
            // Only a changed `value` overwrites what the user typed.
            if name == "value" {
                self.document.set_value(node, value)?;
            }
        }
        for (name, _) in attrs {
            if !element.attrs.iter().any(|(k, _)| k == name) {
                self.document.remove_attribute(node, name)?;
            }
        }

        // Handlers are fresh closures every render: release, rebind.
        for listener in listeners {
            self.document.remove_event_listener(node, listener);
        }
        self.bind(node, element)
    }

    /// Attach the painted children, or tear the whole record down.
    fn settle_element(&mut self, mounted: Mounted, node: NodeId, painted: &[NodeId]) -> Result<Mounted, DomError> {
        match self.document.set_children(node, painted) {
            Ok(()) => Ok(mounted),
            Err(err) => {
                self.remove(mounted);
                Err(err)
            }
        }
    }

    fn remove(&mut self, mounted: Mounted) {
        self.stats.removed += 1;
        match mounted {
            Mounted::Text { node, .. } => self.release(node),
            Mounted::Element { node, children, .. } => {
                for child in children {
                    self.remove(child);
                }
                self.release(node);
            }
            Mounted::Component { hooks, children, .. } => {
                hooks.teardown();
                for child in children {
                    self.remove(child);
                }
            }
        }
    }

    fn release(&self, node: NodeId) {
        if let Err(err) = self.document.release(node) {
            debug!(%err, "node already released");
        }
    }

    fn bind(&self, node: NodeId, element: &VElement) -> Result<Vec<ListenerId>, DomError> {
        element
            .listeners
            .iter()
            .map(|(event_type, handler)| {
                let handler = handler.clone();
                self.document
                    .add_event_listener(node, event_type, move |event| handler(event))
            })
            .collect()
    }
}

fn render_component(component: &VComponent, hooks: &Rc<HookStore>) -> VNode {
    hooks.begin();
    (component.render)(&Hooks::new(hooks.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Cleanup;
    use crate::render::vnode::{component, fragment, h, text};
    use std::cell::{Cell, RefCell};

    struct Fixture {
        doc: Document,
        root: NodeId,
        rt: Runtime,
        rerenders: Rc<Cell<u32>>,
        reconciler: Reconciler,
    }

    fn fixture() -> Fixture {
        let doc = Document::new();
        let root = doc.create_element("main");
        doc.append_child(doc.body(), root).unwrap();
        let rt = Runtime::new();
        let rerenders = Rc::new(Cell::new(0));
        let counter = rerenders.clone();
        let reconciler = Reconciler::new(
            doc.clone(),
            root,
            rt.clone(),
            Rc::new(move || counter.set(counter.get() + 1)),
        );
        Fixture { doc, root, rt, rerenders, reconciler }
    }

    fn list(keys: &[&str]) -> VNode {
        h("ul")
            .children(keys.iter().map(|k| h("li").key(*k).text(*k)))
            .into()
    }

    #[test]
    fn test_initial_patch_paints_tree() {
        let mut f = fixture();
        let stats = f
            .reconciler
            .patch(h("div").class("card").child(h("span").text("hi")).into())
            .unwrap();

        assert_eq!(f.doc.inner_html(f.root), "<div class=\"card\"><span>hi</span></div>");
        assert_eq!(stats.created, 3);
        assert_eq!(stats.removed, 0);
    }

    #[test]
    fn test_keyed_reorder_preserves_identity() {
        let mut f = fixture();
        f.reconciler.patch(list(&["a", "b", "c"])).unwrap();
        let ul = f.doc.children(f.root)[0];
        let before = f.doc.children(ul);

        f.reconciler.patch(list(&["c", "a"])).unwrap();
        let after = f.doc.children(ul);

        assert_eq!(after, vec![before[2], before[0]]);
        assert!(!f.doc.exists(before[1]));
        assert_eq!(f.doc.text_content(ul), "ca");
    }

    #[test]
    fn test_fragments_are_spliced() {
        let mut f = fixture();
        f.reconciler
            .patch(fragment([text("a"), fragment([h("b").text("b").into()]), text("c")]))
            .unwrap();
        assert_eq!(f.doc.inner_html(f.root), "a<b>b</b>c");
        assert_eq!(f.reconciler.root_nodes().len(), 3);
    }

    #[test]
    fn test_focus_and_typed_value_survive_rerender() {
        let mut f = fixture();
        let view = |label: &str| -> VNode {
            h("form")
                .child(h("label").text(label))
                .child(h("input").id("qty").attr("value", "1"))
                .into()
        };

        f.reconciler.patch(view("first")).unwrap();
        let input = f.doc.find(f.root, "#qty").unwrap().unwrap();
        f.doc.focus(input).unwrap();
        f.doc.set_value(input, "7").unwrap();

        f.reconciler.patch(view("second")).unwrap();
        assert_eq!(f.doc.find(f.root, "#qty").unwrap(), Some(input));
        assert_eq!(f.doc.active_element(), Some(input));
        assert_eq!(f.doc.value(input).as_deref(), Some("7"));
        assert_eq!(f.doc.text_content(f.root), "second");
    }

    #[test]
    fn test_changed_value_attribute_overwrites_property() {
        let mut f = fixture();
        f.reconciler.patch(h("input").attr("value", "1").into()).unwrap();
        let input = f.doc.children(f.root)[0];
        f.doc.set_value(input, "9").unwrap();

        f.reconciler.patch(h("input").attr("value", "2").into()).unwrap();
        assert_eq!(f.doc.value(input).as_deref(), Some("2"));
    }

    #[test]
    fn test_listeners_do_not_accumulate() {
        let mut f = fixture();
        let clicks = Rc::new(Cell::new(0));

        for _ in 0..5 {
            let clicks = clicks.clone();
            f.reconciler
                .patch(h("button").on("click", move |_| clicks.set(clicks.get() + 1)).into())
                .unwrap();
        }
        assert_eq!(f.doc.total_listener_count(), 1);

        let button = f.doc.children(f.root)[0];
        f.doc.click(button);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_removed_attributes_are_cleared() {
        let mut f = fixture();
        f.reconciler.patch(h("button").attr("disabled", "").into()).unwrap();
        f.reconciler.patch(h("button").into()).unwrap();
        let button = f.doc.children(f.root)[0];
        assert_eq!(f.doc.attribute(button, "disabled"), None);
    }

    #[test]
    fn test_tag_change_replaces_node() {
        let mut f = fixture();
        f.reconciler.patch(h("p").into()).unwrap();
        let p = f.doc.children(f.root)[0];
        let stats = f.reconciler.patch(h("div").into()).unwrap();
        assert!(!f.doc.exists(p));
        assert_eq!(stats.created, 1);
        assert_eq!(stats.removed, 1);
    }

    #[test]
    fn test_component_state_and_effect_lifecycle() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let setter_slot = Rc::new(RefCell::new(None));

        let counter = {
            let log = log.clone();
            let setter_slot = setter_slot.clone();
            move || {
                let log = log.clone();
                let setter_slot = setter_slot.clone();
                component("Counter", move |hooks| {
                    let (count, set_count) = hooks.use_state(|| 0u32);
                    *setter_slot.borrow_mut() = Some(set_count);
                    let log = log.clone();
                    hooks.use_effect((), move || {
                        log.borrow_mut().push("mounted".into());
                        let log = log.clone();
                        Some(Box::new(move || log.borrow_mut().push("unmounted".into())) as Cleanup)
                    });
                    h("span").text(count).into()
                })
            }
        };

        f.reconciler.patch(h("div").child(counter()).into()).unwrap();
        f.rt.flush_microtasks();
        assert_eq!(*log.borrow(), vec!["mounted"]);

        let set_count = setter_slot.borrow().clone().unwrap();
        set_count.set(3);
        assert_eq!(f.rerenders.get(), 1);

        f.reconciler.patch(h("div").child(counter()).into()).unwrap();
        f.rt.flush_microtasks();
        assert_eq!(f.doc.text_content(f.root), "3");
        assert_eq!(*log.borrow(), vec!["mounted"], "empty deps: effect runs once");

        f.reconciler.patch(h("div").into()).unwrap();
        assert_eq!(*log.borrow(), vec!["mounted", "unmounted"]);
    }

    #[test]
    fn test_failed_patch_tears_down_and_recovers() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let view = |label: &str| -> VNode {
            let log = log.clone();
            h("div")
                .child(component("Watcher", move |hooks| {
                    let log = log.clone();
                    hooks.use_effect((), move || {
                        let log = log.clone();
                        Some(Box::new(move || log.borrow_mut().push("cleanup".into())) as Cleanup)
                    });
                    h("span").text("watching").into()
                }))
                .child(h("p").text(label))
                .into()
        };

        f.reconciler.patch(view("first")).unwrap();
        f.rt.flush_microtasks();

        // Pull a painted node out from under the reconciler.
        let p = f.doc.find(f.root, "p").unwrap().unwrap();
        let label = f.doc.children(p)[0];
        f.doc.release(label).unwrap();

        let result = f.reconciler.patch(view("second"));
        assert!(matches!(result, Err(DomError::UnknownNode(_))));
        assert_eq!(*log.borrow(), vec!["cleanup"]);
        assert!(f.reconciler.is_empty());
        assert!(f.doc.children(f.root).is_empty());

        f.reconciler.patch(view("third")).unwrap();
        assert_eq!(f.doc.text_content(f.root), "watchingthird");
    }

    #[test]
    fn test_teardown_empties_container() {
        let mut f = fixture();
        f.reconciler.patch(list(&["a", "b"])).unwrap();
        assert!(f.reconciler.teardown() > 0);
        assert!(f.doc.children(f.root).is_empty());
        assert!(f.reconciler.is_empty());
    }
}
