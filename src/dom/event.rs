//! DOM events.

use std::cell::Cell;

use super::NodeId;

bitflags::bitflags! {
    /// Dispatch state of an [`Event`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFlags: u8 {
        const BUBBLES = 1 << 0;
        const DEFAULT_PREVENTED = 1 << 1;
        const PROPAGATION_STOPPED = 1 << 2;
        const IMMEDIATE_STOPPED = 1 << 3;
    }
}

/// An event travelling from its target up to the document root.
///
/// Listeners receive `&Event`; the flags live in `Cell`s so a listener can
/// call [`prevent_default`](Event::prevent_default) through a shared reference.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: Cell<NodeId>,
    flags: Cell<EventFlags>,
    key: Option<String>,
}

impl Event {
    /// A bubbling event of `event_type` aimed at `target`.
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            current_target: Cell::new(target),
            flags: Cell::new(EventFlags::BUBBLES),
            key: None,
        }
    }

    /// A `keydown` carrying `key` (e.g. "Enter").
    pub fn key(target: NodeId, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new("keydown", target)
        }
    }

    /// Disable bubbling (focus/blur style events).
    pub fn non_bubbling(self) -> Self {
        self.flags.set(self.flags.get() - EventFlags::BUBBLES);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listener is currently running.
    pub fn current_target(&self) -> NodeId {
        self.current_target.get()
    }

    pub(crate) fn set_current_target(&self, node: NodeId) {
        self.current_target.set(node);
    }

    pub fn key_name(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn flags(&self) -> EventFlags {
        self.flags.get()
    }

    pub fn bubbles(&self) -> bool {
        self.flags.get().contains(EventFlags::BUBBLES)
    }

    pub fn prevent_default(&self) {
        self.insert(EventFlags::DEFAULT_PREVENTED);
    }

    pub fn default_prevented(&self) -> bool {
        self.flags.get().contains(EventFlags::DEFAULT_PREVENTED)
    }

    pub fn stop_propagation(&self) {
        self.insert(EventFlags::PROPAGATION_STOPPED);
    }

    pub fn stop_immediate_propagation(&self) {
        self.insert(EventFlags::PROPAGATION_STOPPED | EventFlags::IMMEDIATE_STOPPED);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.flags.get().contains(EventFlags::PROPAGATION_STOPPED)
    }

    pub fn is_immediate_stopped(&self) -> bool {
        self.flags.get().contains(EventFlags::IMMEDIATE_STOPPED)
    }

    fn insert(&self, flag: EventFlags) {
        self.flags.set(self.flags.get() | flag);
    }
}
