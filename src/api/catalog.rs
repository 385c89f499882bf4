//! An in-process [`ProductApi`] over a fixed product list.

use std::cell::Cell;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use tracing::debug;

use crate::store::{SearchParams, SortOrder};

use super::types::{CategoryTree, Pagination, Product, ProductList};
use super::{FetchError, ProductApi};

/// Answers immediately from memory. `fail_next` makes the following calls
/// fail with a network error, for exercising retry paths.
#[derive(Clone)]
pub struct StaticCatalog {
    products: Rc<[Product]>,
    failures: Rc<Cell<u32>>,
    requests: Rc<Cell<u32>>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: products.into(),
            failures: Rc::new(Cell::new(0)),
            requests: Rc::new(Cell::new(0)),
        }
    }

    /// `[Product, ...]` or `{"items": [Product, ...]}` as the upstream
    /// search API returns it.
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Feed {
            List(Vec<Product>),
            Items { items: Vec<Product> },
        }
        let products = match serde_json::from_str::<Feed>(json)? {
            Feed::List(products) | Feed::Items { items: products } => products,
        };
        Ok(Self::new(products))
    }

    /// A deterministic catalog of `count` products over a few categories.
    pub fn sample(count: usize) -> Self {
        const CATEGORIES: [(&str, &[&str]); 3] = [
            ("Home", &["Kitchen", "Bath", "Storage"]),
            ("Digital", &["Audio", "Cameras"]),
            ("Outdoor", &["Camping"]),
        ];
        const NAMES: [&str; 8] = [
            "Shelf", "Kettle", "Towel", "Speaker", "Lens", "Tent", "Lamp", "Basket",
        ];

        let products = (1..=count)
            .map(|n| {
                let (category1, subs) = CATEGORIES[n % CATEGORIES.len()];
                let category2 = subs[(n / CATEGORIES.len()) % subs.len()];
                let name = NAMES[n % NAMES.len()];
                Product {
                    product_id: format!("{}", 1000 + n),
                    title: format!("{name} {n:03}"),
                    link: format!("https://shop.example/products/{}", 1000 + n),
                    image: format!("https://img.example/{}.jpg", 1000 + n),
                    lprice: 1000 + ((n as u64 * 7919) % 49) * 500,
                    mall_name: "Example Mall".into(),
                    brand: ["Acme", "Nordic", "Hanul"][n % 3].into(),
                    category1: category1.into(),
                    category2: category2.into(),
                    description: format!("{name} number {n}."),
                    stock: (n as u32 * 37) % 120,
                    review_count: (n as u32 * 13) % 400,
                    rating: 3.0 + (n % 20) as f32 / 10.0,
                    ..Product::default()
                }
            })
            .collect();
        Self::new(products)
    }

    pub fn fail_next(&self, calls: u32) {
        self.failures.set(calls);
    }

    /// Calls answered so far, failures included.
    pub fn request_count(&self) -> u32 {
        self.requests.get()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> CategoryTree {
        let mut tree = CategoryTree::new();
        for product in self.products.iter() {
            tree.insert(&product.category1, Some(&product.category2));
        }
        tree
    }

    /// The listing for `params`, computed synchronously.
    pub fn query(&self, params: &SearchParams) -> ProductList {
        let needle = params.search.to_lowercase();
        let mut matches: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.title.to_lowercase().contains(&needle)
                    || p.brand.to_lowercase().contains(&needle)
            })
            .filter(|p| params.category1.as_deref().is_none_or(|c| p.category1 == c))
            .filter(|p| params.category2.as_deref().is_none_or(|c| p.category2 == c))
            .collect();

        match params.sort {
            SortOrder::PriceAsc => matches.sort_by_key(|p| p.lprice),
            SortOrder::PriceDesc => matches.sort_by(|a, b| b.lprice.cmp(&a.lprice)),
            SortOrder::NameAsc => matches.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::NameDesc => matches.sort_by(|a, b| b.title.cmp(&a.title)),
        }

        let total = matches.len();
        let limit = params.limit.value();
        let products = matches
            .into_iter()
            .skip(params.offset())
            .take(limit as usize)
            .cloned()
            .collect();

        ProductList {
            products,
            pagination: Pagination::new(params.page, limit, total),
            filters: params.clone(),
        }
    }

    fn answer<T: 'static>(&self, what: &str, value: Result<T, FetchError>) -> LocalBoxFuture<'static, Result<T, FetchError>> {
        self.requests.set(self.requests.get() + 1);
        let pending = self.failures.get();
        let result = if pending > 0 {
            self.failures.set(pending - 1);
            debug!(what, "injected failure");
            Err(FetchError::Network(format!("{what}: connection reset")))
        } else {
            value
        };
        future::ready(result).boxed_local()
    }
}

impl ProductApi for StaticCatalog {
    fn get_products(&self, params: &SearchParams) -> LocalBoxFuture<'static, Result<ProductList, FetchError>> {
        self.answer("products", Ok(self.query(params)))
    }

    fn get_categories(&self) -> LocalBoxFuture<'static, Result<CategoryTree, FetchError>> {
        self.answer("categories", Ok(self.categories()))
    }

    fn get_product(&self, product_id: &str) -> LocalBoxFuture<'static, Result<Product, FetchError>> {
        let found = self
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("product {product_id}")));
        self.answer("product", found)
    }
}

impl std::fmt::Debug for StaticCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCatalog")
            .field("products", &self.products.len())
            .field("pending_failures", &self.failures.get())
            .finish()
    }
}
