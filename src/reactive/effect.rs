//! Effects - auto-tracking computations.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::runtime::Runtime;

/// Something an observer can be subscribed to.
pub(crate) trait Source {
    fn unsubscribe(&self, observer_id: u64);
}

// =============================================================================
// Observer
// =============================================================================

/// The tracked side of a subscription: a callback plus the cells it read
/// during its last run.
pub(crate) struct Observer {
    pub(crate) id: u64,
    runtime: Runtime,
    run: Box<dyn Fn()>,
    sources: RefCell<Vec<Weak<dyn Source>>>,
    disposed: Cell<bool>,
}

impl Observer {
    /// Re-run the callback with this observer as the active one.
    ///
    /// Previous dependencies are dropped first so that branches not taken on
    /// this run stop triggering it.
    pub(crate) fn execute(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        self.clear_sources();
        self.runtime.push_observer(self.clone());
        (self.run)();
        self.runtime.pop_observer();
    }

    pub(crate) fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.borrow_mut().push(source);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn clear_sources(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }

    fn dispose(&self) {
        self.disposed.set(true);
        self.clear_sources();
    }
}

// =============================================================================
// Effect
// =============================================================================

/// Handle to a running effect. Dropping the handle disposes the effect.
pub struct Effect {
    observer: Rc<Observer>,
}

impl Effect {
    pub(crate) fn new(runtime: Runtime, f: impl Fn() + 'static) -> Self {
        let observer = Rc::new(Observer {
            id: runtime.next_id(),
            runtime,
            run: Box::new(f),
            sources: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        });
        observer.execute();
        Self { observer }
    }

    /// Run again now, re-collecting dependencies. No-op once disposed.
    pub fn run(&self) {
        self.observer.execute();
    }

    /// Stop the effect and unsubscribe it from every cell it read.
    pub fn dispose(&self) {
        self.observer.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.observer.is_disposed()
    }

    /// Number of cells read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.observer
            .sources
            .borrow()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.observer.dispose();
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.observer.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_runs_immediately() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let _effect = rt.effect(move || runs_clone.set(runs_clone.get() + 1));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_effect_recollects_dependencies() {
        let rt = Runtime::new();
        let use_a = rt.signal(true);
        let a = rt.signal(1);
        let b = rt.signal(10);
        let seen = Rc::new(Cell::new(0));

        let (use_a_c, a_c, b_c, seen_c) = (use_a.clone(), a.clone(), b.clone(), seen.clone());
        let effect = rt.effect(move || {
            let v = if use_a_c.get() { a_c.get() } else { b_c.get() };
            seen_c.set(v);
        });
        assert_eq!(effect.dependency_count(), 2);

        // b is not a dependency yet
        b.set(11);
        assert_eq!(seen.get(), 1);

        use_a.set(false);
        assert_eq!(seen.get(), 11);

        // a dropped out of the dependency set
        a.set(2);
        assert_eq!(seen.get(), 11);
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_stops_notifications() {
        let rt = Runtime::new();
        let count = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        let (count_c, runs_c) = (count.clone(), runs.clone());
        let effect = rt.effect(move || {
            count_c.get();
            runs_c.set(runs_c.get() + 1);
        });

        count.set(1);
        assert_eq!(runs.get(), 2);

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(count.subscriber_count(), 0);

        count.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_drop_disposes() {
        let rt = Runtime::new();
        let count = rt.signal(0);
        let count_c = count.clone();
        let effect = rt.effect(move || {
            count_c.get();
        });
        assert_eq!(count.subscriber_count(), 1);
        drop(effect);
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn test_manual_run_keeps_tracking() {
        let rt = Runtime::new();
        let count = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        let (count_c, runs_c) = (count.clone(), runs.clone());
        let effect = rt.effect(move || {
            count_c.get();
            runs_c.set(runs_c.get() + 1);
        });
        effect.run();
        assert_eq!(runs.get(), 2);
        assert_eq!(count.subscriber_count(), 1);

        count.set(1);
        assert_eq!(runs.get(), 3);

        effect.dispose();
        effect.run();
        assert_eq!(runs.get(), 3);
    }
}
