//! Product detail at `/product/:id`.
//!
//! Painted with the tree strategy so the quantity input keeps its identity
//! (and focus) while the stepper re-renders.

use tracing::debug;

use crate::api::{FetchState, Product, ProductList, Resource};
use crate::component::{Component, ViewCx};
use crate::dom::Event;
use crate::render::{component, h, VComponent, VElement, VNode};
use crate::router::RouteMatch;
use crate::store::{PageLimit, SearchParams};

use super::{format_price, AppContext};

pub fn detail(ctx: &AppContext, matched: &RouteMatch) -> Component<(), RouteMatch> {
    let product_id = matched.param("id").unwrap_or_default().to_string();
    let product: Resource<Product> = ctx.resource("product");
    let related: Resource<ProductList> = ctx.resource("related");

    let template = {
        let (ctx, product, related) = (ctx.clone(), product.clone(), related.clone());
        move |_: &ViewCx<(), RouteMatch>| {
            let view = match product.state() {
                FetchState::Idle | FetchState::Loading => h("div")
                    .class("loading")
                    .attr("role", "status")
                    .text("Loading product..."),
                FetchState::Failed(err) => h("div")
                    .class("error-state")
                    .attr("role", "alert")
                    .child(h("p").text("Could not load this product."))
                    .child(h("p").class("error-detail").text(err))
                    .child(h("button").id("retry-btn").attr("type", "button").text("Retry")),
                FetchState::Ready(product) => product_view(&ctx, &product, &related.state()),
            };
            Ok(view.into())
        }
    };

    Component::new("ProductDetail", (), template)
        .on("click", ".related-product-card", {
            let ctx = ctx.clone();
            move |scope, _, card| {
                if let Some(id) = scope.document().attribute(card, "data-product-id") {
                    ctx.navigate(&ctx.product_href(&id));
                }
            }
        })
        .on("click", "#retry-btn", {
            let product = product.clone();
            move |_, _, _| {
                product.retry();
            }
        })
        .on_mount({
            let ctx = ctx.clone();
            move |_| {
                let related_limit = PageLimit::from_value(ctx.config().related_limit).unwrap_or_default();
                let api = ctx.api().clone();
                let follow = product.signal().subscribe(move |state| {
                    let FetchState::Ready(product) = state else {
                        return;
                    };
                    let params = related_params(product, related_limit);
                    debug!(product_id = %product.product_id, query = %params.to_query(), "loading related products");
                    let api = api.clone();
                    related.load(move || api.get_products(&params));
                });

                let api = ctx.api().clone();
                product.load(move || api.get_product(&product_id));
                Some(follow)
            }
        })
}

/// Same `category2` when the product has one, else same `category1`.
fn related_params(product: &Product, limit: PageLimit) -> SearchParams {
    let category1 = Some(product.category1.as_str()).filter(|c| !c.is_empty());
    let category2 = Some(product.category2.as_str()).filter(|c| !c.is_empty());
    SearchParams::default()
        .with_category1(category1)
        .with_category2(category2)
        .with_limit(limit)
}

fn product_view(ctx: &AppContext, product: &Product, related: &FetchState<ProductList>) -> VElement {
    let mut info = h("div")
        .class("product-info")
        .child(h("h1").class("product-title").text(&product.title));
    if product.rating > 0.0 {
        info = info.child(
            h("p")
                .class("product-rating")
                .text(format!("{:.1} ({} reviews)", product.rating, product.review_count)),
        );
    }
    info = info
        .child(h("p").class("product-price").text(format_price(product.lprice)))
        .child(h("p").class("product-stock").text(format!("In stock: {}", product.stock)));
    if !product.description.is_empty() {
        info = info.child(h("p").class("product-description").text(&product.description));
    }

    h("section")
        .class("product-detail")
        .attr("data-product-id", &product.product_id)
        .child(breadcrumb(ctx, product))
        .child(
            h("div")
                .class("product-main")
                .child(
                    h("img")
                        .class("product-image")
                        .attr("src", &product.image)
                        .attr("alt", &product.title),
                )
                .child(info.child(purchase_panel(ctx, product))),
        )
        .child(related_section(product, related))
}

fn breadcrumb(ctx: &AppContext, product: &Product) -> VElement {
    let mut nav = h("nav")
        .class("breadcrumb")
        .child(h("a").attr("href", ctx.href("/")).attr("data-link", "").text("Home"));
    if product.category1.is_empty() {
        return nav;
    }
    let by_category1 = SearchParams::default().with_category1(Some(product.category1.as_str()));
    nav = nav.child(
        h("a")
            .attr("href", ctx.listing_href(&by_category1))
            .attr("data-link", "")
            .text(&product.category1),
    );
    if !product.category2.is_empty() {
        let by_category2 = by_category1.with_category2(Some(product.category2.as_str()));
        nav = nav.child(
            h("a")
                .attr("href", ctx.listing_href(&by_category2))
                .attr("data-link", "")
                .text(&product.category2),
        );
    }
    nav
}

/// Quantity stepper and add button. Quantity is hook state, so it survives
/// re-renders of the page and resets on a different product.
fn purchase_panel(ctx: &AppContext, product: &Product) -> VComponent {
    let ctx = ctx.clone();
    let product = product.clone();
    let key = product.product_id.clone();
    component("PurchasePanel", move |hooks| {
        let (quantity, set_quantity) = hooks.use_state(|| 1u32);
        let document = ctx.host().document().clone();

        let decrease = {
            let set = set_quantity.clone();
            move |_: &Event| set.update(|q| *q = q.saturating_sub(1).max(1))
        };
        let increase = {
            let set = set_quantity.clone();
            move |_: &Event| set.update(|q| *q = q.saturating_add(1))
        };
        let edit = {
            let set = set_quantity.clone();
            move |event: &Event| {
                let input = event.target();
                let typed = document.value(input).unwrap_or_default();
                let quantity = typed.trim().parse::<u32>().map_or(1, |q| q.max(1));
                // Echo the clamped quantity back into the field.
                if typed != quantity.to_string() {
                    if let Err(err) = document.set_value(input, &quantity.to_string()) {
                        debug!(%err, "quantity input gone");
                    }
                }
                set.set(quantity);
            }
        };
        let add = {
            let (ctx, product) = (ctx.clone(), product.clone());
            move |_: &Event| {
                let quantity = set_quantity.get();
                ctx.cart().add(&product, quantity);
                ctx.toasts().success(format!("Added {quantity} to cart"));
            }
        };

        let node: VNode = h("div")
            .class("purchase-panel")
            .child(
                h("div")
                    .class("quantity-selector")
                    .child(h("button").id("quantity-decrease").attr("type", "button").text("-").on("click", decrease))
                    .child(
                        h("input")
                            .id("quantity-input")
                            .attr("type", "number")
                            .attr("min", 1)
                            .attr("value", quantity)
                            .on("input", edit),
                    )
                    .child(h("button").id("quantity-increase").attr("type", "button").text("+").on("click", increase)),
            )
            .child(h("button").id("add-to-cart-btn").attr("type", "button").text("Add to cart").on("click", add))
            .into();
        node
    })
    .key(key)
}

fn related_section(product: &Product, related: &FetchState<ProductList>) -> VElement {
    let section = h("section")
        .class("related-products")
        .child(h("h2").text("Related products"));
    match related {
        FetchState::Idle | FetchState::Loading => section.child(h("p").class("related-loading").text("Loading...")),
        FetchState::Failed(_) => section.child(h("p").class("related-error").text("Related products unavailable.")),
        FetchState::Ready(list) => {
            let cards: Vec<VNode> = list
                .products
                .iter()
                .filter(|p| p.product_id != product.product_id)
                .map(|p| {
                    h("div")
                        .class("related-product-card")
                        .key(&p.product_id)
                        .attr("data-product-id", &p.product_id)
                        .child(h("img").attr("src", &p.image).attr("alt", &p.title))
                        .child(h("p").class("related-title").text(&p.title))
                        .child(h("p").class("related-price").text(format_price(p.lprice)))
                        .into()
                })
                .collect();
            if cards.is_empty() {
                section.child(h("p").class("related-empty").text("No related products."))
            } else {
                section.child(h("div").class("related-grid").children(cards))
            }
        }
    }
}
