//! Product listing at `/`: search, category filters, sort, page size and
//! pagination, all mirrored in the query string.

use tracing::debug;

use crate::api::{CategoryTree, FetchState, Product, ProductList, Resource};
use crate::component::{Component, Scope, ViewCx};
use crate::render::Html;
use crate::router::RouteMatch;
use crate::store::{PageLimit, SearchParams, SortOrder};

use super::{format_price, AppContext};

/// Page buttons shown either side of the current page.
const PAGE_WINDOW: u32 = 2;

type HomeScope = Scope<SearchParams, RouteMatch>;

pub fn home(ctx: &AppContext, matched: &RouteMatch) -> Component<SearchParams, RouteMatch> {
    let params = SearchParams::from_query_or(matched.query(), ctx.config().page_limit());
    let products: Resource<ProductList> = ctx.resource("products");
    let categories: Resource<CategoryTree> = ctx.resource("categories");

    let template = {
        let (ctx, products, categories) = (ctx.clone(), products.clone(), categories.clone());
        move |cx: &ViewCx<SearchParams, RouteMatch>| {
            let html = cx.with_state(|params| render(&ctx, params, &products.state(), &categories.state()));
            Ok(html.into())
        }
    };

    let filters = Filters {
        ctx: ctx.clone(),
        products: products.clone(),
    };

    Component::new("Home", params, template)
        .on("keydown", "#search-input", {
            let filters = filters.clone();
            move |scope, event, _| {
                if event.key_name() != Some("Enter") {
                    return;
                }
                let search = scope.value_of("#search-input").unwrap_or_default();
                filters.apply(scope, |p| p.with_search(&search));
            }
        })
        .on("click", "[data-category1]", {
            let filters = filters.clone();
            move |scope, _, button| {
                if let Some(category) = scope.document().attribute(button, "data-category1") {
                    filters.apply(scope, |p| p.with_category1(Some(category.as_str())));
                }
            }
        })
        .on("click", "[data-category2]", {
            let filters = filters.clone();
            move |scope, _, button| {
                if let Some(category) = scope.document().attribute(button, "data-category2") {
                    filters.apply(scope, |p| p.with_category2(Some(category.as_str())));
                }
            }
        })
        .on("click", "[data-breadcrumb]", {
            let filters = filters.clone();
            move |scope, _, crumb| match scope.document().attribute(crumb, "data-breadcrumb").as_deref() {
                Some("reset") => filters.apply(scope, |p| p.with_category1(None)),
                Some("category1") => filters.apply(scope, |p| p.with_category2(None)),
                _ => {}
            }
        })
        .on("change", "#sort-select", {
            let filters = filters.clone();
            move |scope, _, select| {
                let sort = scope
                    .document()
                    .value(select)
                    .and_then(|v| v.parse::<SortOrder>().ok());
                if let Some(sort) = sort {
                    filters.apply(scope, |p| p.with_sort(sort));
                }
            }
        })
        .on("change", "#limit-select", {
            let filters = filters.clone();
            move |scope, _, select| {
                let limit = scope
                    .document()
                    .value(select)
                    .and_then(|v| v.parse().ok())
                    .and_then(PageLimit::from_value);
                if let Some(limit) = limit {
                    filters.apply(scope, |p| p.with_limit(limit));
                }
            }
        })
        .on("click", "[data-page]", {
            let filters = filters.clone();
            move |scope, _, button| {
                let page = scope
                    .document()
                    .attribute(button, "data-page")
                    .and_then(|v| v.parse::<u32>().ok());
                if let Some(page) = page {
                    filters.apply(scope, |p| p.with_page(page));
                }
            }
        })
        .on("click", ".add-to-cart-btn", {
            let (ctx, products) = (ctx.clone(), products.clone());
            move |scope, event, button| {
                event.prevent_default();
                let Some(id) = scope.document().attribute(button, "data-product-id") else {
                    return;
                };
                match find_product(&products, &id) {
                    Some(product) => {
                        ctx.cart().add(&product, 1);
                        ctx.toasts().success("Added to cart");
                    }
                    None => debug!(product_id = %id, "add for a product no longer listed"),
                }
            }
        })
        .on("click", "#retry-btn", {
            let (products, categories) = (products.clone(), categories.clone());
            move |_, _, _| {
                products.retry();
                if categories.state().error().is_some() {
                    categories.retry();
                }
            }
        })
        .on_mount(move |scope| {
            let api = filters.ctx.api().clone();
            categories.load(move || api.get_categories());
            filters.load(&scope.state());
            None
        })
}

fn find_product(products: &Resource<ProductList>, product_id: &str) -> Option<Product> {
    products.signal().with(|state| {
        state
            .value()
            .and_then(|list| list.products.iter().find(|p| p.product_id == product_id))
            .cloned()
    })
}

/// Applies listing changes: state, address bar, refetch.
#[derive(Clone)]
struct Filters {
    ctx: AppContext,
    products: Resource<ProductList>,
}

impl Filters {
    fn apply(&self, scope: &HomeScope, change: impl FnOnce(SearchParams) -> SearchParams) {
        let current = scope.with_state(Clone::clone);
        let next = change(current.clone());
        if next == current {
            return;
        }
        debug!(query = %next.to_query(), "listing changed");
        scope.set_state(next.clone());
        self.ctx.update_url(&self.ctx.listing_href(&next));
        self.load(&next);
    }

    fn load(&self, params: &SearchParams) {
        let api = self.ctx.api().clone();
        let params = params.clone();
        self.products.load(move || api.get_products(&params));
    }
}

// ============================================================================
// MARKUP
// ============================================================================

fn render(
    ctx: &AppContext,
    params: &SearchParams,
    products: &FetchState<ProductList>,
    categories: &FetchState<CategoryTree>,
) -> Html {
    let mut html = Html::new();
    html.push_raw("<section class=\"home\"><div class=\"search-bar\"><input id=\"search-input\" type=\"text\" placeholder=\"Search products\"")
        .push_attr("value", &params.search)
        .push_raw(" /></div>");

    render_categories(&mut html, params, categories);
    render_controls(&mut html, params);

    match products {
        FetchState::Idle | FetchState::Loading => {
            html.push_raw("<div class=\"loading\" role=\"status\">Loading products...</div>");
        }
        FetchState::Failed(err) => {
            html.push_raw("<div class=\"error-state\" role=\"alert\"><p>Could not load products.</p><p class=\"error-detail\">")
                .push_text(err)
                .push_raw("</p><button id=\"retry-btn\" type=\"button\">Retry</button></div>");
        }
        FetchState::Ready(list) if list.products.is_empty() => {
            html.push_raw("<div class=\"empty-state\"><p>No products found.</p></div>");
        }
        FetchState::Ready(list) => {
            html.push_raw("<p class=\"product-count\">")
                .push_text(list.pagination.total)
                .push_raw(" products</p><div id=\"products-grid\" class=\"products-grid\">");
            for product in &list.products {
                render_card(&mut html, ctx, product);
            }
            html.push_raw("</div>");
            render_pagination(&mut html, list);
        }
    }

    html.push_raw("</section>");
    html
}

fn render_categories(html: &mut Html, params: &SearchParams, categories: &FetchState<CategoryTree>) {
    html.push_raw("<div class=\"category-filter\"><nav class=\"breadcrumb\"><button type=\"button\" data-breadcrumb=\"reset\">All</button>");
    if let Some(category1) = &params.category1 {
        html.push_raw("<span class=\"separator\">&gt;</span><button type=\"button\" data-breadcrumb=\"category1\">")
            .push_text(category1)
            .push_raw("</button>");
    }
    if let Some(category2) = &params.category2 {
        html.push_raw("<span class=\"separator\">&gt;</span><button type=\"button\" data-breadcrumb=\"category2\">")
            .push_text(category2)
            .push_raw("</button>");
    }
    html.push_raw("</nav>");

    match categories {
        FetchState::Idle | FetchState::Loading => {
            html.push_raw("<p class=\"categories-loading\">Loading categories...</p>");
        }
        FetchState::Failed(_) => {
            html.push_raw("<p class=\"categories-error\">Categories unavailable.</p>");
        }
        FetchState::Ready(tree) => {
            html.push_raw("<div class=\"category-buttons\">");
            match &params.category1 {
                None => {
                    for category in tree.top_level() {
                        html.push_raw("<button type=\"button\" class=\"category1-filter-btn\"")
                            .push_attr("data-category1", category)
                            .push_raw(">")
                            .push_text(category)
                            .push_raw("</button>");
                    }
                }
                Some(category1) => {
                    for category in tree.children_of(category1) {
                        let pressed = params.category2.as_deref() == Some(category);
                        html.push_raw("<button type=\"button\" class=\"category2-filter-btn\"")
                            .push_attr("data-category2", category)
                            .push_attr("aria-pressed", pressed)
                            .push_raw(">")
                            .push_text(category)
                            .push_raw("</button>");
                    }
                }
            }
            html.push_raw("</div>");
        }
    }
    html.push_raw("</div>");
}

fn render_controls(html: &mut Html, params: &SearchParams) {
    html.push_raw("<div class=\"listing-controls\"><label>Sort <select id=\"sort-select\">");
    for sort in SortOrder::ALL {
        html.push_raw("<option").push_attr("value", sort.as_str());
        if sort == params.sort {
            html.push_raw(" selected");
        }
        html.push_raw(">").push_text(sort.label()).push_raw("</option>");
    }
    html.push_raw("</select></label><label>Show <select id=\"limit-select\">");
    for limit in PageLimit::ALL {
        html.push_raw("<option").push_attr("value", limit.value());
        if limit == params.limit {
            html.push_raw(" selected");
        }
        html.push_raw(">").push_text(limit.value()).push_raw("</option>");
    }
    html.push_raw("</select></label></div>");
}

fn render_card(html: &mut Html, ctx: &AppContext, product: &Product) {
    let href = ctx.product_href(&product.product_id);
    html.push_raw("<div class=\"product-card\"")
        .push_attr("data-product-id", &product.product_id)
        .push_attr("data-price", product.lprice)
        .push_raw("><a class=\"product-link\"")
        .push_attr("href", &href)
        .push_raw(" data-link><img class=\"product-image\"")
        .push_attr("src", &product.image)
        .push_attr("alt", &product.title)
        .push_raw(" loading=\"lazy\" /><h3 class=\"product-title\">")
        .push_text(&product.title)
        .push_raw("</h3></a>");
    if !product.brand.is_empty() {
        html.push_raw("<p class=\"product-brand\">").push_text(&product.brand).push_raw("</p>");
    }
    html.push_raw("<p class=\"product-price\">")
        .push_text(format_price(product.lprice))
        .push_raw("</p><button type=\"button\" class=\"add-to-cart-btn\"")
        .push_attr("data-product-id", &product.product_id)
        .push_raw(">Add to cart</button></div>");
}

fn render_pagination(html: &mut Html, list: &ProductList) {
    let pagination = &list.pagination;
    if pagination.total_pages <= 1 {
        return;
    }
    let page = pagination.page;
    html.push_raw("<nav class=\"pagination\">");
    if pagination.has_prev {
        html.push_raw("<button type=\"button\" class=\"page-prev\"")
            .push_attr("data-page", page - 1)
            .push_raw(">Prev</button>");
    }
    let first = page.saturating_sub(PAGE_WINDOW).max(1);
    let last = (page + PAGE_WINDOW).min(pagination.total_pages);
    for n in first..=last {
        html.push_raw("<button type=\"button\" class=\"page-number\"").push_attr("data-page", n);
        if n == page {
            html.push_raw(" aria-current=\"page\"");
        }
        html.push_raw(">").push_text(n).push_raw("</button>");
    }
    if pagination.has_next {
        html.push_raw("<button type=\"button\" class=\"page-next\"")
            .push_attr("data-page", page + 1)
            .push_raw(">Next</button>");
    }
    html.push_raw("</nav>");
}
