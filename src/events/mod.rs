//! Event delegation.
//!
//! Components never bind listeners on the nodes they paint (those nodes are
//! thrown away on every string repaint). They register `(selector, handler)`
//! pairs here instead, and one real listener per event type at the root
//! routes events to them.

mod delegate;

pub use delegate::{DelegateHandler, EventDelegator, OwnerId};
