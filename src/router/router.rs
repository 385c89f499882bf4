//! The router: URL to page, remounted on every navigation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::component::{Component, Host, Mounted, RenderError, ViewCx};
use crate::dom::NodeId;
use crate::events::OwnerId;
use crate::reactive::{run_cleanups, Cleanup, Emitter};
use crate::render::{paint_html, Html, View};

use super::history::{Location, MemoryHistory};
use super::pattern::{Params, RoutePattern};
use super::RouteError;

/// Pattern reported for the not-found fallback.
pub const NOT_FOUND_PATTERN: &str = "*";

/// The outcome of matching a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The pattern that matched, or `*` for the not-found page.
    pub pattern: String,
    /// Pathname with the base path stripped.
    pub path: String,
    pub params: Params,
    pub location: Location,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Raw query string, without the `?`.
    pub fn query(&self) -> &str {
        &self.location.search
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.location.query_param(name)
    }

    pub fn is_not_found(&self) -> bool {
        self.pattern == NOT_FOUND_PATTERN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Nothing mounted: before `start`, after `stop`, or mid-navigation.
    Idle,
    /// A route (or the not-found page) was chosen; mounting is in progress
    /// or failed.
    Resolved,
    Mounted,
}

/// Emitted after every navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteChange {
    pub location: Location,
    /// `None` when the not-found page was shown.
    pub matched: Option<RouteMatch>,
}

type PageFactory = Rc<dyn Fn(&Host, NodeId, RouteMatch) -> Result<Box<dyn Mounted>, RenderError>>;
type LayoutFactory = Box<dyn Fn(&Host, NodeId) -> Result<Box<dyn Mounted>, RenderError>>;

struct Route {
    pattern: RoutePattern,
    page: PageFactory,
}

fn page_factory<S, F>(page: F) -> PageFactory
where
    S: Clone + PartialEq + 'static,
    F: Fn(&RouteMatch) -> Component<S, RouteMatch> + 'static,
{
    Rc::new(move |host: &Host, outlet: NodeId, matched: RouteMatch| {
        let component = page(&matched);
        let handle = component.mount(host, outlet, matched)?;
        let mounted: Box<dyn Mounted> = Box::new(handle);
        Ok(mounted)
    })
}

fn default_not_found(base_path: &str) -> Component<(), RouteMatch> {
    let home = format!("{base_path}/");
    Component::new("NotFound", (), move |cx: &ViewCx<(), RouteMatch>| {
        let mut html = Html::new();
        html.push_raw("<section class=\"not-found\"><h1>404</h1><p>No page at <code>")
            .push_text(&cx.props().location.pathname)
            .push_raw("</code></p><a")
            .push_attr("href", &home)
            .push_raw(" data-link>Home</a></section>");
        Ok(html.into())
    })
}

// =============================================================================
// RouterBuilder
// =============================================================================

pub struct RouterBuilder {
    host: Host,
    root: NodeId,
    history: Option<MemoryHistory>,
    base_path: String,
    routes: Vec<Route>,
    not_found: Option<PageFactory>,
    layout: Option<(LayoutFactory, String)>,
}

impl RouterBuilder {
    pub fn history(mut self, history: MemoryHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Prefix stripped before matching, e.g. `/shop`. Pathnames outside it
    /// get the not-found page.
    pub fn base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.trim_end_matches('/').to_string();
        self
    }

    /// Add a route. Routes are tried in the order they are added.
    pub fn route<S, F>(mut self, pattern: &str, page: F) -> Result<Self, RouteError>
    where
        S: Clone + PartialEq + 'static,
        F: Fn(&RouteMatch) -> Component<S, RouteMatch> + 'static,
    {
        self.routes.push(Route {
            pattern: RoutePattern::parse(pattern)?,
            page: page_factory(page),
        });
        Ok(self)
    }

    pub fn not_found<S, F>(mut self, page: F) -> Self
    where
        S: Clone + PartialEq + 'static,
        F: Fn(&RouteMatch) -> Component<S, RouteMatch> + 'static,
    {
        self.not_found = Some(page_factory(page));
        self
    }

    /// Wrap every page in `layout`, mounting pages into the element matching
    /// `outlet`.
    ///
    /// The layout renders once per `start`; its own template should not
    /// read state, since a repaint would replace the outlet. Dynamic parts
    /// belong in child components.
    pub fn layout<S, F>(mut self, outlet: &str, layout: F) -> Self
    where
        S: Clone + PartialEq + 'static,
        F: Fn() -> Component<S, ()> + 'static,
    {
        let factory: LayoutFactory = Box::new(move |host: &Host, root: NodeId| {
            let handle = layout().mount(host, root, ())?;
            let mounted: Box<dyn Mounted> = Box::new(handle);
            Ok(mounted)
        });
        self.layout = Some((factory, outlet.to_string()));
        self
    }

    pub fn build(self) -> Router {
        let not_found = self
            .not_found
            .unwrap_or_else(|| {
                let base = self.base_path.clone();
                page_factory(move |_| default_not_found(&base))
            });
        let owner = OwnerId(self.host.runtime().next_id());
        Router {
            inner: Rc::new(RouterInner {
                history: self.history.unwrap_or_else(|| MemoryHistory::new("/")),
                host: self.host,
                root: self.root,
                base_path: self.base_path,
                routes: self.routes,
                not_found,
                layout: self.layout,
                owner,
                state: Cell::new(RouterState::Idle),
                current: RefCell::new(None),
                current_match: RefCell::new(None),
                layout_handle: RefCell::new(None),
                outlet: Cell::new(None),
                changes: Emitter::new(),
                cleanups: RefCell::new(Vec::new()),
                resolving: Cell::new(false),
                pending: Cell::new(false),
            }),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

struct RouterInner {
    host: Host,
    root: NodeId,
    history: MemoryHistory,
    base_path: String,
    routes: Vec<Route>,
    not_found: PageFactory,
    layout: Option<(LayoutFactory, String)>,
    owner: OwnerId,
    state: Cell<RouterState>,
    current: RefCell<Option<Box<dyn Mounted>>>,
    current_match: RefCell<Option<RouteMatch>>,
    layout_handle: RefCell<Option<Box<dyn Mounted>>>,
    outlet: Cell<Option<NodeId>>,
    changes: Emitter<RouteChange>,
    /// Popstate subscription and link interception.
    cleanups: RefCell<Vec<Cleanup>>,
    resolving: Cell<bool>,
    pending: Cell<bool>,
}

/// Maps the current location to a mounted page.
///
/// Navigation (a `push`, `replace`, popstate or an intercepted
/// `[data-link]` click) destroys the current page, strips the base path,
/// picks the first matching route and mounts its page with the path and
/// query parameters, falling back to the not-found page.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    pub fn builder(host: &Host, root: NodeId) -> RouterBuilder {
        RouterBuilder {
            host: host.clone(),
            root,
            history: None,
            base_path: String::new(),
            routes: Vec::new(),
            not_found: None,
            layout: None,
        }
    }

    /// Mount the layout, start listening to history and links, and mount
    /// the page for the current location.
    pub fn start(&self) -> Result<(), RenderError> {
        let inner = &self.inner;
        if let Some((layout, outlet_selector)) = &inner.layout {
            let handle = layout(&inner.host, inner.root)?;
            *inner.layout_handle.borrow_mut() = Some(handle);
            match inner.host.document().find(inner.root, outlet_selector) {
                Ok(Some(outlet)) => inner.outlet.set(Some(outlet)),
                Ok(None) => {
                    self.stop();
                    return Err(RenderError::template(
                        "router",
                        format!("layout has no outlet matching `{outlet_selector}`"),
                    ));
                }
                Err(err) => {
                    self.stop();
                    return Err(err.into());
                }
            }
        }

        let weak = Rc::downgrade(inner);
        let popstate = inner.history.on_popstate(move |_| {
            if let Some(inner) = weak.upgrade() {
                Router { inner }.resolve();
            }
        });
        inner.cleanups.borrow_mut().push(popstate);

        let weak: Weak<RouterInner> = Rc::downgrade(inner);
        let links = inner.host.delegator().register(
            "click",
            "[data-link]",
            inner.owner,
            inner.root,
            move |event, link| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let document = inner.host.document();
                let href = document
                    .attribute(link, "href")
                    .or_else(|| document.attribute(link, "data-link"))
                    .filter(|href| !href.is_empty());
                if let Some(href) = href {
                    event.prevent_default();
                    Router { inner }.push(&href);
                }
            },
        )?;
        inner.cleanups.borrow_mut().push(links);

        self.resolve();
        Ok(())
    }

    /// Destroy the page and layout and stop listening.
    pub fn stop(&self) {
        let inner = &self.inner;
        run_cleanups(std::mem::take(&mut *inner.cleanups.borrow_mut()));
        let page = inner.current.borrow_mut().take();
        if let Some(page) = page {
            page.destroy();
        }
        let layout = inner.layout_handle.borrow_mut().take();
        if let Some(layout) = layout {
            layout.destroy();
        }
        inner.outlet.set(None);
        inner.current_match.replace(None);
        inner.state.set(RouterState::Idle);
        debug!("router stopped");
    }

    pub fn push(&self, href: &str) {
        self.inner.history.push(href);
        self.resolve();
    }

    pub fn replace(&self, href: &str) {
        self.inner.history.replace(href);
        self.resolve();
    }

    /// Replace the current history entry without remounting the page, for
    /// pages that keep their own copy of the URL state (listing filters).
    pub fn update_url(&self, href: &str) {
        let location = self.inner.history.replace(href);
        let matched = {
            let mut current = self.inner.current_match.borrow_mut();
            if let Some(current) = current.as_mut() {
                current.location = location.clone();
            }
            current.clone().filter(|m| !m.is_not_found())
        };
        self.inner.changes.emit(&RouteChange { location, matched });
    }

    pub fn back(&self) -> bool {
        self.inner.history.back()
    }

    pub fn forward(&self) -> bool {
        self.inner.history.forward()
    }

    /// `path` prefixed with the base path, for link hrefs.
    pub fn href(&self, path: &str) -> String {
        join_base(&self.inner.base_path, path)
    }

    pub fn location(&self) -> Location {
        self.inner.history.location()
    }

    pub fn current(&self) -> Option<RouteMatch> {
        self.inner.current_match.borrow().clone()
    }

    pub fn current_page(&self) -> Option<String> {
        self.inner.current.borrow().as_ref().map(|page| page.name().to_string())
    }

    pub fn state(&self) -> RouterState {
        self.inner.state.get()
    }

    pub fn history(&self) -> &MemoryHistory {
        &self.inner.history
    }

    pub fn host(&self) -> &Host {
        &self.inner.host
    }

    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    /// Where pages are mounted: the layout's outlet, or the root.
    pub fn outlet(&self) -> NodeId {
        self.inner.outlet.get().unwrap_or(self.inner.root)
    }

    pub fn subscribe(&self, listener: impl Fn(&RouteChange) + 'static) -> Cleanup {
        self.inner.changes.subscribe(listener)
    }

    /// A handle for pages, which the router itself keeps alive.
    pub fn downgrade(&self) -> WeakRouter {
        WeakRouter(Rc::downgrade(&self.inner))
    }

    /// A navigation started while one is in progress (a redirect from a
    /// page's mount hook) runs once the current one finishes.
    fn resolve(&self) {
        let inner = &self.inner;
        if inner.resolving.replace(true) {
            inner.pending.set(true);
            return;
        }
        loop {
            inner.pending.set(false);
            self.resolve_once();
            if !inner.pending.get() {
                break;
            }
        }
        inner.resolving.set(false);
    }

    fn resolve_once(&self) {
        let inner = &self.inner;
        let location = inner.history.location();

        let previous = inner.current.borrow_mut().take();
        if let Some(page) = previous {
            page.destroy();
        }
        inner.current_match.replace(None);
        inner.state.set(RouterState::Idle);

        let path = strip_base(&inner.base_path, &location.pathname);
        let found = path.as_deref().and_then(|path| {
            inner
                .routes
                .iter()
                .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
        });
        let found_route = found.is_some();
        let (page, matched) = match found {
            Some((route, params)) => (
                route.page.clone(),
                RouteMatch {
                    pattern: route.pattern.as_str().to_string(),
                    path: path.clone().unwrap_or_default(),
                    params,
                    location: location.clone(),
                },
            ),
            None => (
                inner.not_found.clone(),
                RouteMatch {
                    pattern: NOT_FOUND_PATTERN.to_string(),
                    path: path.unwrap_or_else(|| location.pathname.clone()),
                    params: Params::new(),
                    location: location.clone(),
                },
            ),
        };
        inner.state.set(RouterState::Resolved);
        debug!(href = %location, pattern = %matched.pattern, "route resolved");

        let outlet = self.outlet();
        match page(&inner.host, outlet, matched.clone()) {
            Ok(mounted) => {
                *inner.current.borrow_mut() = Some(mounted);
                inner.state.set(RouterState::Mounted);
            }
            Err(err) => {
                error!(href = %location, %err, "page failed to mount");
                let view = inner.host.boundary().catch("router", err);
                let painted = match view {
                    View::Html(html) => paint_html(inner.host.document(), outlet, &html).map(|_| ()),
                    View::Tree(_) => inner.host.document().clear_children(outlet),
                };
                if let Err(err) = painted {
                    error!(%err, "router fallback could not be painted");
                }
            }
        }

        inner.current_match.replace(Some(matched.clone()));
        inner.changes.emit(&RouteChange {
            location,
            matched: found_route.then_some(matched),
        });
    }
}

#[derive(Clone, Default)]
pub struct WeakRouter(Weak<RouterInner>);

impl WeakRouter {
    pub fn upgrade(&self) -> Option<Router> {
        self.0.upgrade().map(|inner| Router { inner })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.inner.base_path)
            .field("routes", &self.inner.routes.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>())
            .field("state", &self.inner.state.get())
            .finish()
    }
}

/// The pathname relative to `base`, or `None` if it lies outside it.
fn strip_base(base: &str, pathname: &str) -> Option<String> {
    if base.is_empty() {
        return Some(pathname.to_string());
    }
    match pathname.strip_prefix(base) {
        Some("") => Some("/".to_string()),
        Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
        _ => None,
    }
}

pub(crate) fn join_base(base: &str, path: &str) -> String {
    let path = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
    if base.is_empty() {
        path
    } else if path == "/" {
        format!("{base}/")
    } else {
        format!("{base}{path}")
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::reactive::Runtime;
    use pretty_assertions::assert_eq;

    fn host() -> (Host, NodeId) {
        let host = Host::new(Document::new(), Runtime::new());
        let root = host.create_root("app").unwrap();
        (host, root)
    }

    fn page(name: &'static str) -> impl Fn(&RouteMatch) -> Component<(), RouteMatch> {
        move |_| {
            Component::new(name, (), move |cx: &ViewCx<(), RouteMatch>| {
                let mut html = Html::new();
                html.push_raw("<h1>").push_text(name).push_raw("</h1>");
                for (k, v) in &cx.props().params {
                    html.push_raw("<i").push_attr("data-param", k).push_raw(">").push_text(v).push_raw("</i>");
                }
                html.push_raw("<a href=\"/cart\" data-link>cart</a><button class=\"noop\"></button>");
                Ok(html.into())
            })
            .on("click", ".noop", |_, _, _| {})
        }
    }

    fn router(host: &Host, root: NodeId) -> Router {
        Router::builder(host, root)
            .route("/", page("Home"))
            .unwrap()
            .route("/product/:id", page("Product"))
            .unwrap()
            .route("/product/:slug", page("Shadowed"))
            .unwrap()
            .route("/cart", page("Cart"))
            .unwrap()
            .build()
    }

    #[test]
    fn test_first_matching_route_wins() {
        let (host, root) = host();
        let router = router(&host, root);
        router.start().unwrap();
        assert_eq!(router.current_page().as_deref(), Some("Home"));
        assert_eq!(router.state(), RouterState::Mounted);

        router.push("/product/42");
        let current = router.current().unwrap();
        assert_eq!(current.pattern, "/product/:id");
        assert_eq!(current.param("id"), Some("42"));
        assert_eq!(router.current_page().as_deref(), Some("Product"));
        assert!(host.document().find(root, "[data-param=id]").unwrap().is_some());
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let (host, root) = host();
        let router = router(&host, root);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let _sub = router.subscribe(move |change| sink.borrow_mut().push(change.matched.is_some()));

        router.start().unwrap();
        router.push("/unknown");
        assert_eq!(router.current_page().as_deref(), Some("NotFound"));
        assert!(router.current().unwrap().is_not_found());
        assert!(host.document().text_content(root).contains("/unknown"));
        assert_eq!(*changes.borrow(), vec![true, false]);
    }

    #[test]
    fn test_navigation_destroys_previous_page() {
        let (host, root) = host();
        let router = router(&host, root);
        router.start().unwrap();
        // One page binding plus the router's link interception.
        assert_eq!(host.delegator().registration_count(), 2);

        for href in ["/cart", "/product/1", "/", "/nowhere"] {
            router.push(href);
            assert!(host.delegator().registration_count() <= 2, "{href}");
        }
        router.stop();
        assert!(host.delegator().is_empty());
        assert!(host.document().children(root).is_empty());
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_link_click_is_intercepted() {
        let (host, root) = host();
        let router = router(&host, root);
        router.start().unwrap();

        let link = host.document().find(root, "a[data-link]").unwrap().unwrap();
        let event = host.document().click(link);
        assert!(event.default_prevented());
        assert_eq!(router.current_page().as_deref(), Some("Cart"));
        assert_eq!(router.history().len(), 2);
    }

    #[test]
    fn test_popstate_remounts() {
        let (host, root) = host();
        let router = router(&host, root);
        router.start().unwrap();
        router.push("/cart");
        assert!(router.back());
        assert_eq!(router.current_page().as_deref(), Some("Home"));
        assert!(router.forward());
        assert_eq!(router.current_page().as_deref(), Some("Cart"));
    }

    #[test]
    fn test_base_path_is_stripped() {
        let (host, root) = host();
        let router = Router::builder(&host, root)
            .base_path("/shop/")
            .history(MemoryHistory::new("/shop"))
            .route("/", page("Home"))
            .unwrap()
            .route("/cart", page("Cart"))
            .unwrap()
            .build();
        router.start().unwrap();
        assert_eq!(router.current_page().as_deref(), Some("Home"));

        router.push("/shop/cart?x=1");
        let current = router.current().unwrap();
        assert_eq!(current.path, "/cart");
        assert_eq!(current.query_param("x").as_deref(), Some("1"));

        router.push("/cart");
        assert!(router.current().unwrap().is_not_found());
        assert_eq!(router.href("/cart"), "/shop/cart");
        assert_eq!(router.href("/"), "/shop/");
    }

    #[test]
    fn test_layout_outlet_and_update_url() {
        let (host, root) = host();
        let router = router_with_layout(&host, root);
        router.start().unwrap();

        let outlet = host.document().find(root, "#outlet").unwrap().unwrap();
        assert_eq!(router.outlet(), outlet);
        assert!(host.document().find(outlet, "h1").unwrap().is_some());
        assert!(host.document().find(root, "header").unwrap().is_some());

        router.push("/cart");
        assert!(host.document().find(root, "header").unwrap().is_some());

        router.update_url("/cart?sort=name_asc");
        assert_eq!(router.location().search, "sort=name_asc");
        assert_eq!(router.current().unwrap().query(), "sort=name_asc");
        assert_eq!(router.current_page().as_deref(), Some("Cart"));
    }

    fn router_with_layout(host: &Host, root: NodeId) -> Router {
        Router::builder(host, root)
            .layout("#outlet", || {
                Component::new("Layout", (), |_: &ViewCx<(), ()>| {
                    Ok("<header>shop</header><main id=\"outlet\"></main>".into())
                })
            })
            .route("/", page("Home"))
            .unwrap()
            .route("/cart", page("Cart"))
            .unwrap()
            .build()
    }

    #[test]
    fn test_missing_outlet_fails_start() {
        let (host, root) = host();
        let router = Router::builder(&host, root)
            .layout("#nope", || Component::new("Layout", (), |_: &ViewCx<(), ()>| Ok("<main></main>".into())))
            .build();
        assert!(router.start().is_err());
        assert!(host.delegator().is_empty());
    }

    #[test]
    fn test_redirect_from_mount_hook() {
        let (host, root) = host();
        let slot: Rc<RefCell<Option<Router>>> = Rc::new(RefCell::new(None));
        let redirect = slot.clone();
        let router = Router::builder(&host, root)
            .route("/", page("Home"))
            .unwrap()
            .route("/old", move |_| {
                let redirect = redirect.clone();
                Component::new("Old", (), |_: &ViewCx<(), RouteMatch>| Ok(View::empty())).on_mount(move |_| {
                    if let Some(router) = redirect.borrow().as_ref() {
                        router.replace("/");
                    }
                    None
                })
            })
            .unwrap()
            .build();
        *slot.borrow_mut() = Some(router.clone());

        router.start().unwrap();
        router.push("/old");
        assert_eq!(router.current_page().as_deref(), Some("Home"));
        assert_eq!(router.location().pathname, "/");
        slot.borrow_mut().take();
    }

    #[test]
    fn test_strip_and_join_base() {
        assert_eq!(strip_base("", "/a"), Some("/a".into()));
        assert_eq!(strip_base("/shop", "/shop"), Some("/".into()));
        assert_eq!(strip_base("/shop", "/shopping"), None);
        assert_eq!(join_base("", "cart"), "/cart");
    }
}
