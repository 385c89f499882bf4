//! The storefront: layout, pages and the [`App`] that wires them to the
//! router, the cart and the product API.
//!
//! | Path           | Page                      | Strategy |
//! |----------------|---------------------------|----------|
//! | `/`            | listing with filters      | string   |
//! | `/product/:id` | detail, stepper, related  | tree     |
//! | `/cart`        | cart                      | string   |
//! | anything else  | not found                 | string   |

mod cart;
mod context;
mod detail;
mod home;
mod layout;
mod not_found;

#[cfg(test)]
mod tests;

pub use context::{format_price, AppContext};
pub use layout::OUTLET;

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::task::LocalSpawn;
use tracing::{info, warn};
use web_time::Instant;

use crate::api::ProductApi;
use crate::component::{Component, Host};
use crate::config::ShopConfig;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::reactive::Runtime;
use crate::router::{MemoryHistory, RouteError, RouteMatch, Router};
use crate::store::{CartStore, Storage, ToastQueue};

/// Upper bound on executor/microtask alternations in one [`App::settle`].
const MAX_SETTLE_ROUNDS: usize = 64;

/// A running storefront over an in-memory document.
///
/// Fetches run on a [`LocalPool`] owned by the app; nothing happens until
/// [`settle`](App::settle) drives it. Hook effects queued on the runtime are
/// flushed in the same loop.
pub struct App {
    ctx: AppContext,
    router: Router,
    root: NodeId,
    pool: RefCell<LocalPool>,
}

impl App {
    /// Build the app at `initial_href`. Nothing is mounted until
    /// [`start`](App::start).
    pub fn new(
        config: ShopConfig,
        api: Rc<dyn ProductApi>,
        storage: Rc<dyn Storage>,
        initial_href: &str,
    ) -> Result<Self> {
        config.validate()?;

        let runtime = Runtime::new();
        let host = Host::new(Document::new(), runtime.clone());
        let root = host.create_root("root")?;

        let pool = LocalPool::new();
        let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());

        let cart = CartStore::load(&runtime, storage, &config.storage_key);
        let toasts = ToastQueue::new(&runtime, config.toast_duration(), config.max_toasts);
        let ctx = AppContext::new(host, config, cart, toasts, api, spawner);

        let router = routes(&ctx, root, MemoryHistory::new(initial_href))?;
        ctx.attach_router(&router);

        Ok(Self {
            ctx,
            router,
            root,
            pool: RefCell::new(pool),
        })
    }

    /// Mount the layout and the page for the current URL, then settle.
    pub fn start(&self) -> Result<()> {
        self.router.start()?;
        self.settle();
        info!(
            href = %self.router.location(),
            cart_items = self.ctx.cart().len(),
            "storefront started"
        );
        Ok(())
    }

    /// Tear down every page and the layout. The cart stays persisted.
    pub fn stop(&self) {
        self.router.stop();
        self.ctx.toasts().clear();
        self.ctx.host().runtime().flush_microtasks();
        info!("storefront stopped");
    }

    /// Run pending fetches and deferred effects until neither has work left.
    /// Returns the number of rounds it took.
    pub fn settle(&self) -> usize {
        let runtime = self.ctx.host().runtime();
        let mut pool = self.pool.borrow_mut();
        let mut rounds = 0;
        loop {
            pool.run_until_stalled();
            rounds += 1;
            if runtime.flush_microtasks() == 0 {
                break;
            }
            if rounds >= MAX_SETTLE_ROUNDS {
                warn!(rounds, "still busy, giving up on settling");
                break;
            }
        }
        rounds
    }

    /// Drop toasts whose time is up.
    pub fn expire_toasts(&self) -> usize {
        self.ctx.toasts().expire(Instant::now())
    }

    /// Navigate as a `data-link` click would, then settle.
    pub fn navigate(&self, href: &str) {
        self.router.push(href);
        self.settle();
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cart(&self) -> &CartStore {
        self.ctx.cart()
    }

    pub fn document(&self) -> &Document {
        self.ctx.host().document()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Markup of the whole app.
    pub fn html(&self) -> String {
        self.document().inner_html(self.root)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("context", &self.ctx)
            .finish()
    }
}

fn routes(ctx: &AppContext, root: NodeId, history: MemoryHistory) -> std::result::Result<Router, RouteError> {
    let shell = ctx.clone();
    Ok(Router::builder(ctx.host(), root)
        .history(history)
        .base_path(&ctx.config().base_path)
        .layout(OUTLET, move || layout::layout(&shell))
        .route("/", page(ctx, home::home))?
        .route("/product/:id", page(ctx, detail::detail))?
        .route("/cart", page(ctx, cart::cart_page))?
        .not_found(page(ctx, not_found::not_found))
        .build())
}

type PageFn<S> = fn(&AppContext, &RouteMatch) -> Component<S, RouteMatch>;

fn page<S>(ctx: &AppContext, build: PageFn<S>) -> impl Fn(&RouteMatch) -> Component<S, RouteMatch> + 'static
where
    S: Clone + PartialEq + 'static,
{
    let ctx = ctx.clone();
    move |matched| build(&ctx, matched)
}
