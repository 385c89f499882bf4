//! Emitter - the plain pub/sub primitive.

use std::cell::RefCell;
use std::rc::Rc;

use super::Cleanup;

struct EmitterInner<T> {
    listeners: Vec<(u64, Rc<dyn Fn(&T)>)>,
    next_id: u64,
}

/// Subscribe/notify-all channel for events that are not state (route
/// changes, toast lifecycle, cart mutations).
///
/// Listeners run synchronously in subscription order.
pub struct Emitter<T> {
    inner: Rc<RefCell<EmitterInner<T>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns the unsubscribe function.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Cleanup {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let listener: Rc<dyn Fn(&T)> = Rc::new(listener);
            inner.listeners.push((id, listener));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Notify every listener registered at the time of the call that is
    /// still registered when its turn comes.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(u64, Rc<dyn Fn(&T)>)> = self.inner.borrow().listeners.clone();
        for (id, listener) in snapshot {
            let live = self.inner.borrow().listeners.iter().any(|(lid, _)| *lid == id);
            if live {
                listener(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.inner.borrow_mut().listeners.clear();
    }
}
