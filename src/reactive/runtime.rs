//! Runtime - the tracking context and microtask queue.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::effect::{Effect, Observer};
use super::signal::Signal;

// =============================================================================
// Runtime
// =============================================================================

/// Explicit reactive context.
///
/// Cloning a `Runtime` yields another handle to the same context. Cells and
/// effects created from one runtime only track each other.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

#[derive(Default)]
pub(crate) struct RuntimeInner {
    /// Observer stack. `None` entries mark untracked sections.
    observers: RefCell<Vec<Option<Rc<Observer>>>>,
    microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    flushing: Cell<bool>,
    next_id: Cell<u64>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observable cell owned by this runtime.
    pub fn signal<T: Clone + PartialEq + 'static>(&self, value: T) -> Signal<T> {
        Signal::new(self.clone(), value)
    }

    /// Create an effect. It runs once immediately and again whenever a cell it
    /// read during its previous run changes.
    pub fn effect(&self, f: impl Fn() + 'static) -> Effect {
        Effect::new(self.clone(), f)
    }

    /// Run `f` without registering reads on the active observer.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.observers.borrow_mut().push(None);
        let result = f();
        self.inner.observers.borrow_mut().pop();
        result
    }

    /// Whether a tracked computation is currently running.
    pub fn is_tracking(&self) -> bool {
        matches!(self.inner.observers.borrow().last(), Some(Some(_)))
    }

    pub(crate) fn current_observer(&self) -> Option<Rc<Observer>> {
        self.inner.observers.borrow().last().cloned().flatten()
    }

    pub(crate) fn push_observer(&self, observer: Rc<Observer>) {
        self.inner.observers.borrow_mut().push(Some(observer));
    }

    pub(crate) fn pop_observer(&self) {
        self.inner.observers.borrow_mut().pop();
    }

    pub(crate) fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    // -------------------------------------------------------------------------
    // MICROTASKS
    // -------------------------------------------------------------------------

    /// Queue `task` to run at the next [`flush_microtasks`](Self::flush_microtasks).
    ///
    /// Used for work that must happen after the current render has committed
    /// but before the next input event is handled.
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Drain the microtask queue, including tasks queued while draining.
    ///
    /// Returns the number of tasks run. A nested call while a flush is in
    /// progress returns 0; the outer flush picks up the new tasks.
    pub fn flush_microtasks(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let mut ran = 0;
        loop {
            let task = self.inner.microtasks.borrow_mut().pop_front();
            let Some(task) = task else { break };
            task();
            ran += 1;
        }
        self.inner.flushing.set(false);
        ran
    }

    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("depth", &self.inner.observers.borrow().len())
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microtasks_run_in_order() {
        let rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            rt.queue_microtask(move || log.borrow_mut().push(i));
        }
        assert_eq!(rt.pending_microtasks(), 3);
        assert!(log.borrow().is_empty());

        assert_eq!(rt.flush_microtasks(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_microtask_queued_during_flush_runs_same_flush() {
        let rt = Runtime::new();
        let hits = Rc::new(Cell::new(0));

        let rt_inner = rt.clone();
        let hits_outer = hits.clone();
        rt.queue_microtask(move || {
            hits_outer.set(hits_outer.get() + 1);
            let hits_inner = hits_outer.clone();
            rt_inner.queue_microtask(move || hits_inner.set(hits_inner.get() + 10));
        });

        assert_eq!(rt.flush_microtasks(), 2);
        assert_eq!(hits.get(), 11);
        assert_eq!(rt.pending_microtasks(), 0);
    }

    #[test]
    fn test_untrack_hides_observer() {
        let rt = Runtime::new();
        assert!(!rt.is_tracking());

        let rt_clone = rt.clone();
        let seen = Rc::new(Cell::new((false, false)));
        let seen_clone = seen.clone();
        let _effect = rt.effect(move || {
            let tracked = rt_clone.is_tracking();
            let untracked = rt_clone.untrack(|| rt_clone.is_tracking());
            seen_clone.set((tracked, untracked));
        });

        assert_eq!(seen.get(), (true, false));
    }
}
