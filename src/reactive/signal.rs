//! Signal - the observable state cell.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::effect::{Observer, Source};
use super::runtime::Runtime;
use super::Cleanup;

enum Subscriber<T> {
    /// Registered implicitly by a read during a tracked run.
    Observer { id: u64, observer: Weak<Observer> },
    /// Registered explicitly through [`Signal::subscribe`].
    Callback { id: u64, callback: Rc<dyn Fn(&T)> },
}

impl<T> Subscriber<T> {
    fn id(&self) -> u64 {
        match self {
            Subscriber::Observer { id, .. } | Subscriber::Callback { id, .. } => *id,
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Subscriber::Observer { observer, .. } => observer
                .upgrade()
                .is_some_and(|o| !o.is_disposed()),
            Subscriber::Callback { .. } => true,
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Observer { id, observer } => Subscriber::Observer {
                id: *id,
                observer: observer.clone(),
            },
            Subscriber::Callback { id, callback } => Subscriber::Callback {
                id: *id,
                callback: callback.clone(),
            },
        }
    }
}

struct SignalInner<T> {
    runtime: Runtime,
    value: RefCell<T>,
    subscribers: RefCell<Vec<Subscriber<T>>>,
    /// Bumped by every notification pass.
    epoch: Cell<u64>,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, observer_id: u64) {
        self.subscribers
            .borrow_mut()
            .retain(|s| s.id() != observer_id);
    }
}

// =============================================================================
// Signal
// =============================================================================

/// An observable value cell.
///
/// Reads inside an effect (or a component render) subscribe the running
/// observer. Writes notify every subscriber synchronously, in the order they
/// subscribed, but only when the new value differs from the old one.
///
/// Writing to a signal from inside one of its own subscribers re-enters the
/// notification loop; nothing here detects cycles.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub(crate) fn new(runtime: Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                runtime,
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                epoch: Cell::new(0),
            }),
        }
    }

    /// Current value. Subscribes the active observer, if any.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Current value without subscribing.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the value. Subscribes the active observer, if any.
    ///
    /// `f` must not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Replace the value. Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }

    /// Modify a copy of the value and write it back. Notifies only if the
    /// result differs from the previous value.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.inner.value.borrow().clone();
        f(&mut next);
        self.set(next)
    }

    /// Subscribe explicitly. The callback receives the new value after every
    /// change until the returned cleanup runs.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Cleanup {
        let id = self.inner.runtime.next_id();
        self.inner.subscribers.borrow_mut().push(Subscriber::Callback {
            id,
            callback: Rc::new(callback),
        });

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.is_alive())
            .count()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    fn track(&self) {
        let Some(observer) = self.inner.runtime.current_observer() else {
            return;
        };

        let mut subscribers = self.inner.subscribers.borrow_mut();
        if subscribers.iter().any(|s| s.id() == observer.id) {
            return;
        }
        subscribers.push(Subscriber::Observer {
            id: observer.id,
            observer: Rc::downgrade(&observer),
        });
        drop(subscribers);

        let source: Rc<dyn Source> = self.inner.clone();
        observer.add_source(Rc::downgrade(&source));
    }

    fn notify(&self) {
        let epoch = self.inner.epoch.get().wrapping_add(1);
        self.inner.epoch.set(epoch);

        // Snapshot so subscribers may (un)subscribe while being notified.
        let snapshot: Vec<Subscriber<T>> = self.inner.subscribers.borrow().clone();
        let needs_value = snapshot
            .iter()
            .any(|s| matches!(s, Subscriber::Callback { .. }));
        let value = needs_value.then(|| self.get_untracked());

        for subscriber in snapshot {
            // A nested write already delivered a newer value to everyone.
            if self.inner.epoch.get() != epoch {
                break;
            }
            match subscriber {
                Subscriber::Observer { observer, .. } => {
                    if let Some(observer) = observer.upgrade() {
                        observer.execute();
                    }
                }
                Subscriber::Callback { id, callback } => {
                    // Skip callbacks removed by an earlier subscriber in this pass
                    let still_subscribed = self
                        .inner
                        .subscribers
                        .borrow()
                        .iter()
                        .any(|s| s.id() == id);
                    if let (true, Some(value)) = (still_subscribed, value.as_ref()) {
                        callback(value);
                    }
                }
            }
        }

        self.inner.subscribers.borrow_mut().retain(|s| s.is_alive());
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}
