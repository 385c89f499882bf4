//! Everything a page needs, handed to each page factory.

use std::cell::RefCell;
use std::rc::Rc;

use futures::task::LocalSpawn;
use tracing::warn;

use crate::api::{ProductApi, Resource};
use crate::component::Host;
use crate::config::ShopConfig;
use crate::router::{join_base, Router, WeakRouter};
use crate::store::{CartStore, SearchParams, ToastQueue};

/// Shared services, created once per [`App`](super::App) and dropped with it.
///
/// Cheap to clone. The router is held weakly: pages are owned by the router,
/// so a strong handle here would keep it alive forever.
#[derive(Clone)]
pub struct AppContext {
    host: Host,
    config: Rc<ShopConfig>,
    cart: CartStore,
    toasts: ToastQueue,
    api: Rc<dyn ProductApi>,
    spawner: Rc<dyn LocalSpawn>,
    router: Rc<RefCell<WeakRouter>>,
}

impl AppContext {
    pub fn new(
        host: Host,
        config: ShopConfig,
        cart: CartStore,
        toasts: ToastQueue,
        api: Rc<dyn ProductApi>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        Self {
            host,
            config: Rc::new(config),
            cart,
            toasts,
            api,
            spawner,
            router: Rc::new(RefCell::new(WeakRouter::default())),
        }
    }

    pub(crate) fn attach_router(&self, router: &Router) {
        *self.router.borrow_mut() = router.downgrade();
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn api(&self) -> &Rc<dyn ProductApi> {
        &self.api
    }

    pub fn router(&self) -> Option<Router> {
        self.router.borrow().upgrade()
    }

    /// A fetch slot for one page, using the configured retry budget.
    pub fn resource<T: Clone + PartialEq + 'static>(&self, name: &str) -> Resource<T> {
        Resource::new(self.host.runtime(), name, self.spawner.clone(), self.config.fetch_retries)
    }

    /// `path` under the configured base path.
    pub fn href(&self, path: &str) -> String {
        join_base(self.config.base_path.trim_end_matches('/'), path)
    }

    /// Listing URL for `params`.
    pub fn listing_href(&self, params: &SearchParams) -> String {
        let query = params.to_query();
        let home = self.href("/");
        if query.is_empty() { home } else { format!("{home}?{query}") }
    }

    pub fn product_href(&self, product_id: &str) -> String {
        self.href(&format!("/product/{product_id}"))
    }

    pub fn navigate(&self, href: &str) {
        match self.router() {
            Some(router) => router.push(href),
            None => warn!(%href, "navigation without a running router"),
        }
    }

    /// Rewrite the address bar without remounting the page.
    pub fn update_url(&self, href: &str) {
        match self.router() {
            Some(router) => router.update_url(href),
            None => warn!(%href, "url update without a running router"),
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("cart_items", &self.cart.len())
            .field("toasts", &self.toasts.len())
            .finish()
    }
}

/// `12300` as `12,300원`.
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('원');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0원");
        assert_eq!(format_price(999), "999원");
        assert_eq!(format_price(12300), "12,300원");
        assert_eq!(format_price(1234567), "1,234,567원");
    }
}
