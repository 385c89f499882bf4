//! Crate-level error type.

use thiserror::Error;

use crate::api::FetchError;
use crate::component::RenderError;
use crate::config::ConfigError;
use crate::dom::DomError;
use crate::router::RouteError;
use crate::store::StorageError;

// ============================================================================
// ShopError
// ============================================================================

/// Any failure surfaced by the storefront.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ShopError>;
