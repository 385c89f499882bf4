//! Product data: wire types, the API seam, an in-process catalog and
//! per-component fetch state.

mod catalog;
mod resource;
mod types;

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::store::SearchParams;

pub use catalog::StaticCatalog;
pub use resource::{FetchState, Resource};
pub use types::{CategoryTree, Pagination, Product, ProductList};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("request aborted")]
    Aborted,
}

impl FetchError {
    /// Whether an automatic retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// The product backend.
///
/// Futures are `'static` so a [`Resource`] can spawn them; implementations
/// clone whatever they need out of `&self`.
pub trait ProductApi {
    fn get_products(&self, params: &SearchParams) -> LocalBoxFuture<'static, Result<ProductList, FetchError>>;

    fn get_categories(&self) -> LocalBoxFuture<'static, Result<CategoryTree, FetchError>>;

    fn get_product(&self, product_id: &str) -> LocalBoxFuture<'static, Result<Product, FetchError>>;
}
