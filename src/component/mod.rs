//! Component nodes: a template bound to state, props and a mount point.
//!
//! A mounted component renders inside an [`Effect`](crate::reactive::Effect),
//! so every signal its template reads (its own state, the cart, a resource)
//! schedules the next render when it changes. Each render:
//!
//! 1. releases what the previous render attached (bindings, cleanups, child
//!    components),
//! 2. runs the template; a failure goes to the [`ErrorBoundary`],
//! 3. paints the [`View`](crate::render::View) with the matching strategy,
//! 4. attaches the new render's bindings and mounts its children.
//!
//! Bindings declared on the [`Component`] itself live from mount to destroy.

mod boundary;
mod node;

pub use boundary::{ErrorBoundary, RenderError, RenderFailure};
pub use node::{Component, Lifecycle, MountHandle, Mounted, Scope, ViewCx};

use crate::dom::{Document, NodeId};
use crate::events::EventDelegator;
use crate::reactive::Runtime;

/// Everything a component needs from its surroundings.
#[derive(Clone)]
pub struct Host {
    document: Document,
    delegator: EventDelegator,
    runtime: Runtime,
    boundary: ErrorBoundary,
}

impl Host {
    /// Delegation is rooted at `document.body()`.
    pub fn new(document: Document, runtime: Runtime) -> Self {
        let delegator = EventDelegator::new(document.clone(), document.body());
        Self {
            document,
            delegator,
            runtime,
            boundary: ErrorBoundary::default(),
        }
    }

    pub fn with_boundary(mut self, boundary: ErrorBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn delegator(&self) -> &EventDelegator {
        &self.delegator
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }

    /// A fresh `<div>` appended to the body, for mounting at the top level.
    pub fn create_root(&self, id: &str) -> Result<NodeId, crate::dom::DomError> {
        let root = self.document.create_element("div");
        self.document.set_attribute(root, "id", id)?;
        self.document.append_child(self.document.body(), root)?;
        Ok(root)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("document", &self.document)
            .field("registrations", &self.delegator.registration_count())
            .finish()
    }
}
