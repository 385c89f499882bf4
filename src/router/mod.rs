//! Client-side routing.
//!
//! [`MemoryHistory`] is the session history (push, replace, popstate);
//! [`RoutePattern`] compiles `/product/:id` style patterns; [`Router`]
//! ties them to the component layer, mounting one page at a time into the
//! layout's outlet.

mod history;
mod pattern;
#[allow(clippy::module_inception)]
mod router;

pub use history::{Location, MemoryHistory};
pub use pattern::{Params, RoutePattern};
pub use router::{RouteChange, RouteMatch, Router, RouterBuilder, RouterState, WeakRouter, NOT_FOUND_PATTERN};
pub(crate) use router::join_base;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
