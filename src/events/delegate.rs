//! EventDelegator - one root listener per event type, many registrations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::dom::{Document, DomError, Event, ListenerId, NodeId, Selector, WeakDocument};
use crate::reactive::Cleanup;

/// Identifies the component a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

/// Receives the event and the element that matched the selector.
pub type DelegateHandler = Rc<dyn Fn(&Event, NodeId)>;

struct Registration {
    id: u64,
    selector: Selector,
    owner: OwnerId,
    /// The owner's mount point; events outside it are ignored.
    scope: NodeId,
    handler: DelegateHandler,
}

struct TypeEntry {
    listener: ListenerId,
    registrations: Vec<Registration>,
}

#[derive(Default)]
struct DelegatorInner {
    types: BTreeMap<String, TypeEntry>,
    next_id: u64,
}

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

/// Routes events bubbling to `root` to registered `(selector, owner, handler)`
/// triples.
///
/// # Invariants
///
/// 1. At most one real listener per event type exists on `root`.
/// 2. That listener exists exactly while its type has at least one
///    registration.
/// 3. A handler only sees events whose target and matched element both lie
///    inside its owner's scope.
#[derive(Clone)]
pub struct EventDelegator {
    document: Document,
    root: NodeId,
    inner: Rc<RefCell<DelegatorInner>>,
}

impl EventDelegator {
    pub fn new(document: Document, root: NodeId) -> Self {
        Self {
            document,
            root,
            inner: Rc::new(RefCell::new(DelegatorInner::default())),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Register `handler` for `event_type` events whose target has an
    /// inclusive ancestor matching `selector` within `scope`.
    ///
    /// The returned cleanup removes this registration only.
    pub fn register(
        &self,
        event_type: &str,
        selector: &str,
        owner: OwnerId,
        scope: NodeId,
        handler: impl Fn(&Event, NodeId) + 'static,
    ) -> Result<Cleanup, DomError> {
        let selector = Selector::parse(selector)?;

        let needs_listener = !self.inner.borrow().types.contains_key(event_type);
        if needs_listener {
            let weak_inner = Rc::downgrade(&self.inner);
            let weak_doc = self.document.downgrade();
            let listener = self.document.add_event_listener(self.root, event_type, move |event| {
                dispatch(&weak_inner, &weak_doc, event);
            })?;
            self.inner.borrow_mut().types.insert(
                event_type.to_string(),
                TypeEntry {
                    listener,
                    registrations: Vec::new(),
                },
            );
            trace!(event_type, "delegated listener attached");
        }

        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            if let Some(entry) = inner.types.get_mut(event_type) {
                entry.registrations.push(Registration {
                    id,
                    selector,
                    owner,
                    scope,
                    handler: Rc::new(handler),
                });
            }
            id
        };

        let weak_inner = Rc::downgrade(&self.inner);
        let weak_doc = self.document.downgrade();
        let root = self.root;
        let event_type = event_type.to_string();
        Ok(Box::new(move || {
            let Some(inner) = weak_inner.upgrade() else { return };
            let mut inner = inner.borrow_mut();
            if let Some(entry) = inner.types.get_mut(&event_type) {
                entry.registrations.retain(|r| r.id != id);
            }
            prune_empty(&mut inner, &weak_doc, root);
        }))
    }

    /// Remove every registration of `owner`, across all event types.
    /// Returns how many were removed.
    pub fn unregister_owner(&self, owner: OwnerId) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut removed = 0;
        for entry in inner.types.values_mut() {
            let before = entry.registrations.len();
            entry.registrations.retain(|r| r.owner != owner);
            removed += before - entry.registrations.len();
        }
        prune_empty(&mut inner, &self.document.downgrade(), self.root);
        removed
    }

    pub fn registration_count(&self) -> usize {
        self.inner
            .borrow()
            .types
            .values()
            .map(|e| e.registrations.len())
            .sum()
    }

    pub fn registrations_for(&self, owner: OwnerId) -> usize {
        self.inner
            .borrow()
            .types
            .values()
            .flat_map(|e| e.registrations.iter())
            .filter(|r| r.owner == owner)
            .count()
    }

    /// Event types that currently have a root listener.
    pub fn listener_types(&self) -> Vec<String> {
        self.inner.borrow().types.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().types.is_empty()
    }
}

fn prune_empty(inner: &mut DelegatorInner, document: &WeakDocument, root: NodeId) {
    let empty: Vec<String> = inner
        .types
        .iter()
        .filter(|(_, e)| e.registrations.is_empty())
        .map(|(t, _)| t.clone())
        .collect();

    for event_type in empty {
        if let Some(entry) = inner.types.remove(&event_type) {
            if let Some(document) = document.upgrade() {
                document.remove_event_listener(root, entry.listener);
            }
            trace!(event_type, "delegated listener detached");
        }
    }
}

fn dispatch(inner: &Weak<RefCell<DelegatorInner>>, document: &WeakDocument, event: &Event) {
    let (Some(inner), Some(document)) = (inner.upgrade(), document.upgrade()) else {
        return;
    };

    // Snapshot: handlers may register or unregister while we iterate.
    let candidates: Vec<(u64, Selector, NodeId, DelegateHandler)> = {
        let inner = inner.borrow();
        let Some(entry) = inner.types.get(event.event_type()) else {
            return;
        };
        entry
            .registrations
            .iter()
            .map(|r| (r.id, r.selector.clone(), r.scope, r.handler.clone()))
            .collect()
    };

    let target = event.target();
    for (id, selector, scope, handler) in candidates {
        if event.is_immediate_stopped() {
            break;
        }
        // Unregistered by an earlier handler of this dispatch.
        let live = inner
            .borrow()
            .types
            .get(event.event_type())
            .is_some_and(|e| e.registrations.iter().any(|r| r.id == id));
        if !live {
            continue;
        }
        let Some(matched) = document.closest(target, &selector) else {
            continue;
        };
        if document.contains(scope, target) && document.contains(scope, matched) {
            handler(event, matched);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Fixture {
        doc: Document,
        delegator: EventDelegator,
        scope: NodeId,
        button: NodeId,
        outside: NodeId,
    }

    fn fixture() -> Fixture {
        let doc = Document::new();
        let body = doc.body();
        let scope = doc.create_element("section");
        doc.append_child(body, scope).unwrap();
        doc.set_inner_html(
            scope,
            r#"<div class="product-card" data-product-id="42"><button class="add-to-cart-btn"><span>Add</span></button></div>"#,
        )
        .unwrap();
        let button = doc.find(scope, "button").unwrap().unwrap();

        let outside = doc.create_element("div");
        doc.set_attribute(outside, "data-product-id", "99").unwrap();
        doc.append_child(body, outside).unwrap();

        let delegator = EventDelegator::new(doc.clone(), body);
        Fixture { doc, delegator, scope, button, outside }
    }

    #[test]
    fn test_single_root_listener_per_type() {
        let f = fixture();
        let owner = OwnerId(1);
        let _a = f.delegator.register("click", ".add-to-cart-btn", owner, f.scope, |_, _| {}).unwrap();
        let _b = f.delegator.register("click", "[data-product-id]", owner, f.scope, |_, _| {}).unwrap();
        let _c = f.delegator.register("change", "select", owner, f.scope, |_, _| {}).unwrap();

        assert_eq!(f.doc.listener_count(f.doc.body(), "click"), 1);
        assert_eq!(f.doc.listener_count(f.doc.body(), "change"), 1);
        assert_eq!(f.delegator.registration_count(), 3);
        assert_eq!(f.delegator.listener_types(), vec!["change", "click"]);
    }

    #[test]
    fn test_listener_removed_only_when_last_registration_goes() {
        let f = fixture();
        let hits = Rc::new(Cell::new(0));

        let h1 = hits.clone();
        let first = f
            .delegator
            .register("click", "button", OwnerId(1), f.scope, move |_, _| h1.set(h1.get() + 1))
            .unwrap();
        let h2 = hits.clone();
        let second = f
            .delegator
            .register("click", "button", OwnerId(2), f.scope, move |_, _| h2.set(h2.get() + 10))
            .unwrap();

        first();
        assert_eq!(f.doc.listener_count(f.doc.body(), "click"), 1);
        f.doc.click(f.button);
        assert_eq!(hits.get(), 10);

        second();
        assert_eq!(f.doc.listener_count(f.doc.body(), "click"), 0);
        assert!(f.delegator.is_empty());
        f.doc.click(f.button);
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn test_handler_receives_matched_element() {
        let f = fixture();
        let seen = Rc::new(RefCell::new(None));
        let seen_c = seen.clone();
        let doc = f.doc.clone();
        let _c = f
            .delegator
            .register("click", "[data-product-id]", OwnerId(1), f.scope, move |_, matched| {
                *seen_c.borrow_mut() = doc.attribute(matched, "data-product-id");
            })
            .unwrap();

        let span = f.doc.find(f.scope, "span").unwrap().unwrap();
        f.doc.click(span);
        assert_eq!(seen.borrow().as_deref(), Some("42"));
    }

    #[test]
    fn test_events_outside_scope_are_ignored() {
        let f = fixture();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _c = f
            .delegator
            .register("click", "[data-product-id]", OwnerId(1), f.scope, move |_, _| h.set(h.get() + 1))
            .unwrap();

        f.doc.click(f.outside);
        assert_eq!(hits.get(), 0);
        f.doc.click(f.button);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_unregister_owner_removes_all_types() {
        let f = fixture();
        let _a = f.delegator.register("click", "button", OwnerId(1), f.scope, |_, _| {}).unwrap();
        let _b = f.delegator.register("change", "select", OwnerId(1), f.scope, |_, _| {}).unwrap();
        let _c = f.delegator.register("click", "button", OwnerId(2), f.scope, |_, _| {}).unwrap();

        assert_eq!(f.delegator.unregister_owner(OwnerId(1)), 2);
        assert_eq!(f.delegator.registrations_for(OwnerId(1)), 0);
        assert_eq!(f.delegator.listener_types(), vec!["click"]);
        assert_eq!(f.doc.listener_count(f.doc.body(), "change"), 0);
    }

    #[test]
    fn test_invalid_selector_is_rejected_without_listener() {
        let f = fixture();
        let result = f.delegator.register("click", "[broken", OwnerId(1), f.scope, |_, _| {});
        assert!(result.is_err());
        assert!(f.delegator.is_empty());
        assert_eq!(f.doc.listener_count(f.doc.body(), "click"), 0);
    }

    #[test]
    fn test_handler_unregistered_mid_dispatch_is_skipped() {
        let f = fixture();
        let hits = Rc::new(Cell::new(0));

        let delegator = f.delegator.clone();
        let _first = f
            .delegator
            .register("click", "button", OwnerId(1), f.scope, move |_, _| {
                delegator.unregister_owner(OwnerId(2));
            })
            .unwrap();
        let h = hits.clone();
        let _second = f
            .delegator
            .register("click", "button", OwnerId(2), f.scope, move |_, _| h.set(h.get() + 1))
            .unwrap();

        f.doc.click(f.button);
        assert_eq!(hits.get(), 0);
        assert_eq!(f.delegator.registration_count(), 1);
    }
}
