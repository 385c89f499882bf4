//! Reactive core - observable cells, dependency tracking, effects, pub/sub.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). The [`Runtime`] is an
//! explicit context object: it owns the "current observer" stack used for
//! auto-tracking and the microtask queue used for deferred effects.
//!
//! # Invariants
//!
//! 1. A subscriber is registered on a cell at most once.
//! 2. Subscribers are notified synchronously, in subscription order.
//! 3. Writing a value equal to the current one is a no-op.
//! 4. An effect re-collects its dependencies on every run.
//!
//! # Example
//!
//! ```ignore
//! use spark_shop::reactive::Runtime;
//!
//! let rt = Runtime::new();
//! let count = rt.signal(0);
//!
//! let c = count.clone();
//! let effect = rt.effect(move || println!("count = {}", c.get()));
//!
//! count.set(1); // prints "count = 1"
//! effect.dispose();
//! count.set(2); // prints nothing
//! ```

mod effect;
mod emitter;
mod runtime;
mod signal;

pub use effect::Effect;
pub use emitter::Emitter;
pub use runtime::Runtime;
pub use signal::Signal;

/// A deferred release action (unsubscribe, unbind, teardown).
pub type Cleanup = Box<dyn FnOnce()>;

/// Run a list of cleanups in registration order.
pub fn run_cleanups(cleanups: Vec<Cleanup>) {
    for cleanup in cleanups {
        cleanup();
    }
}
