//! # spark-shop
//!
//! A shopping-mall front end on a small reactive component core.
//!
//! ## Architecture
//!
//! State lives in [`Signal`]s. A component's template runs inside an effect,
//! so every signal it reads subscribes it; a write re-runs the template and
//! the renderer repaints the component's subtree. Events reach components
//! through one delegated listener per event type.
//!
//! ```text
//! signal write → template effect → renderer (HTML string | keyed tree) → DOM
//!                                                   ↑
//!                     delegated event → handler ────┘
//! ```
//!
//! ## Modules
//!
//! - [`reactive`] - Signals, effects, emitters and the microtask queue
//! - [`dom`] - In-memory document with CSS selectors and event dispatch
//! - [`events`] - Event delegation by selector
//! - [`render`] - String and virtual tree strategies, hooks
//! - [`component`] - Component lifecycle, bindings, error boundary
//! - [`router`] - History, route patterns and the page router
//! - [`store`] - Cart, toasts, search parameters, storage backends
//! - [`api`] - Product API, static catalog and fetch resources
//! - [`app`] - The storefront pages and [`App`]

pub mod api;
pub mod app;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod logging;
pub mod reactive;
pub mod render;
pub mod router;
pub mod store;

// Re-export commonly used items
pub use reactive::{Cleanup, Effect, Emitter, Runtime, Signal};

pub use dom::{Document, DomError, Event, NodeId, Selector};

pub use events::{EventDelegator, OwnerId};

pub use render::{component, fragment, h, text, Html, View, VNode};

pub use component::{Component, ErrorBoundary, Host, MountHandle, Mounted, RenderError, Scope, ViewCx};

pub use router::{Location, MemoryHistory, RouteError, RouteMatch, Router};

pub use store::{
    CartEntry, CartEvent, CartStore, FileStorage, MemoryStorage, PageLimit, SearchParams, SortOrder,
    Storage, StorageError, ToastKind, ToastQueue,
};

pub use api::{FetchError, FetchState, Product, ProductApi, Resource, StaticCatalog};

pub use app::{App, AppContext};

pub use config::ShopConfig;
pub use error::{Result, ShopError};
