//! Hook state for function components.
//!
//! Hooks are identified by call order within one component instance, so a
//! component must call the same hooks in the same order on every render.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;

use crate::reactive::{Cleanup, Runtime};

struct EffectSlot {
    deps: Box<dyn Any>,
    cleanup: Rc<RefCell<Option<Cleanup>>>,
}

/// Per-instance hook storage, owned by the reconciler's mounted record.
pub(crate) struct HookStore {
    name: String,
    runtime: Runtime,
    rerender: Rc<dyn Fn()>,
    states: RefCell<Vec<Rc<dyn Any>>>,
    effects: RefCell<Vec<EffectSlot>>,
    state_cursor: Cell<usize>,
    effect_cursor: Cell<usize>,
    alive: Rc<Cell<bool>>,
}

impl HookStore {
    pub(crate) fn new(name: &str, runtime: Runtime, rerender: Rc<dyn Fn()>) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            runtime,
            rerender,
            states: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
            state_cursor: Cell::new(0),
            effect_cursor: Cell::new(0),
            alive: Rc::new(Cell::new(true)),
        })
    }

    pub(crate) fn begin(&self) {
        self.state_cursor.set(0);
        self.effect_cursor.set(0);
    }

    /// Run every effect cleanup; pending effects of this instance are skipped.
    pub(crate) fn teardown(&self) {
        self.alive.set(false);
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for slot in effects {
            if let Some(cleanup) = slot.cleanup.borrow_mut().take() {
                cleanup();
            }
        }
        self.states.borrow_mut().clear();
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Handed to a function component's render closure.
pub struct Hooks {
    store: Rc<HookStore>,
}

impl Hooks {
    pub(crate) fn new(store: Rc<HookStore>) -> Self {
        Self { store }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.store.runtime
    }

    /// Local state. `init` runs on the first render only.
    pub fn use_state<T: Clone + PartialEq + 'static>(
        &self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let index = self.store.state_cursor.get();
        self.store.state_cursor.set(index + 1);

        let existing = self
            .store
            .states
            .borrow()
            .get(index)
            .cloned()
            .and_then(|slot| slot.downcast::<RefCell<T>>().ok());

        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = Rc::new(RefCell::new(init()));
                let erased: Rc<dyn Any> = slot.clone();
                let mut states = self.store.states.borrow_mut();
                if index < states.len() {
                    warn!(component = %self.store.name, index, "hook order changed, state reset");
                    states[index] = erased;
                } else {
                    states.push(erased);
                }
                slot
            }
        };

        let value = slot.borrow().clone();
        (
            value,
            StateSetter {
                slot,
                rerender: self.store.rerender.clone(),
            },
        )
    }

    /// Run `effect` after the current render commits, on the first render and
    /// whenever `deps` differs from the previous render's (`PartialEq`).
    ///
    /// The cleanup it returns runs before the next invocation and when the
    /// component is torn down.
    pub fn use_effect<D, F>(&self, deps: D, effect: F)
    where
        D: PartialEq + 'static,
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        let index = self.store.effect_cursor.get();
        self.store.effect_cursor.set(index + 1);

        let mut effects = self.store.effects.borrow_mut();
        let cleanup = match effects.get_mut(index) {
            Some(slot) => {
                if slot.deps.downcast_ref::<D>() == Some(&deps) {
                    return;
                }
                let deps: Box<dyn Any> = Box::new(deps);
                slot.deps = deps;
                slot.cleanup.clone()
            }
            None => {
                let cleanup = Rc::new(RefCell::new(None));
                effects.push(EffectSlot {
                    deps: Box::new(deps),
                    cleanup: cleanup.clone(),
                });
                cleanup
            }
        };
        drop(effects);

        let alive = self.store.alive.clone();
        self.store.runtime.queue_microtask(move || {
            if !alive.get() {
                return;
            }
            let previous = cleanup.borrow_mut().take();
            if let Some(previous) = previous {
                previous();
            }
            let next = effect();
            *cleanup.borrow_mut() = next;
        });
    }
}

/// Writes one `use_state` slot and asks the owning component to re-render.
pub struct StateSetter<T> {
    slot: Rc<RefCell<T>>,
    rerender: Rc<dyn Fn()>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            rerender: self.rerender.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    /// Store `value`; re-renders only if it changed.
    pub fn set(&self, value: T) {
        {
            let mut slot = self.slot.borrow_mut();
            if *slot == value {
                return;
            }
            *slot = value;
        }
        (self.rerender)();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.slot.borrow().clone();
        f(&mut next);
        self.set(next);
    }

    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}
