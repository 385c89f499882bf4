//! The cart page at `/cart`.

use crate::component::{Component, Scope, ViewCx};
use crate::dom::{Event, NodeId};
use crate::render::Html;
use crate::router::RouteMatch;
use crate::store::{CartEntry, CartStore};

use super::{format_price, AppContext};

pub fn cart_page(ctx: &AppContext, _: &RouteMatch) -> Component<(), RouteMatch> {
    let template = {
        let ctx = ctx.clone();
        move |_: &ViewCx<(), RouteMatch>| Ok(render(&ctx, ctx.cart()).into())
    };

    let cart = ctx.cart();
    Component::new("Cart", (), template)
        .on("click", ".cart-item-checkbox", item_action(cart, |cart, id| {
            cart.toggle(id);
        }))
        .on("click", ".quantity-increase-btn", item_action(cart, |cart, id| {
            cart.increase(id);
        }))
        .on("click", ".quantity-decrease-btn", item_action(cart, |cart, id| {
            cart.decrease(id);
        }))
        .on("click", ".cart-item-remove-btn", {
            let toasts = ctx.toasts().clone();
            item_action(cart, move |cart, id| {
                if cart.remove(id) {
                    toasts.info("Removed from cart");
                }
            })
        })
        .on("click", "#cart-select-all", {
            let cart = cart.clone();
            move |_, _, _| {
                cart.toggle_select_all();
            }
        })
        .on("click", "#cart-remove-selected", {
            let (cart, toasts) = (cart.clone(), ctx.toasts().clone());
            move |_, _, _| {
                let removed = cart.remove_selected();
                if removed > 0 {
                    toasts.info(format!("Removed {removed} item(s)"));
                }
            }
        })
        .on("click", "#cart-clear", {
            let (cart, toasts) = (cart.clone(), ctx.toasts().clone());
            move |_, _, _| {
                if !cart.is_empty() {
                    cart.clear();
                    toasts.info("Cart cleared");
                }
            }
        })
}

/// A handler that runs `action` with the `data-product-id` of the matched
/// control.
fn item_action(
    cart: &CartStore,
    action: impl Fn(&CartStore, &str) + 'static,
) -> impl Fn(&Scope<(), RouteMatch>, &Event, NodeId) + 'static {
    let cart = cart.clone();
    move |scope, _, control| {
        if let Some(id) = scope.document().attribute(control, "data-product-id") {
            action(&cart, &id);
        }
    }
}

fn render(ctx: &AppContext, cart: &CartStore) -> Html {
    let entries = cart.entries();
    let mut html = Html::new();
    html.push_raw("<section class=\"cart-page\"><h1>Cart</h1>");

    if entries.is_empty() {
        html.push_raw("<div class=\"cart-empty\"><p>Your cart is empty.</p><a")
            .push_attr("href", ctx.href("/"))
            .push_raw(" data-link>Continue shopping</a></div></section>");
        return html;
    }

    let selected = cart.selected_count();
    html.push_raw("<div class=\"cart-header\"><label><input type=\"checkbox\" id=\"cart-select-all\"");
    if cart.is_all_selected() {
        html.push_raw(" checked");
    }
    html.push_raw(" /> Select all (<span id=\"cart-selected-count\">")
        .push_text(selected)
        .push_raw("</span>/")
        .push_text(entries.len())
        .push_raw(")</label></div><ul class=\"cart-items\">");

    for entry in &entries {
        render_entry(&mut html, ctx, entry);
    }

    html.push_raw("</ul><div class=\"cart-summary\"><p>Items <span id=\"cart-total-quantity\">")
        .push_text(cart.total_quantity())
        .push_raw("</span></p><p>Selected <span id=\"cart-selected-price\">")
        .push_text(format_price(cart.selected_price()))
        .push_raw("</span></p><p>Total <span id=\"cart-total-price\">")
        .push_text(format_price(cart.total_price()))
        .push_raw("</span></p><div class=\"cart-actions\"><button type=\"button\" id=\"cart-remove-selected\"");
    if selected == 0 {
        html.push_raw(" disabled");
    }
    html.push_raw(">Remove selected</button><button type=\"button\" id=\"cart-clear\">Clear cart</button></div></div></section>");
    html
}

fn render_entry(html: &mut Html, ctx: &AppContext, entry: &CartEntry) {
    let id = &entry.product_id;
    html.push_raw("<li class=\"cart-item\"").push_attr("data-product-id", id).push_raw(">");

    html.push_raw("<input type=\"checkbox\" class=\"cart-item-checkbox\"").push_attr("data-product-id", id);
    if entry.selected {
        html.push_raw(" checked");
    }
    html.push_raw(" />");

    if !entry.image.is_empty() {
        html.push_raw("<img class=\"cart-item-image\"")
            .push_attr("src", &entry.image)
            .push_attr("alt", &entry.title)
            .push_raw(" />");
    }
    html.push_raw("<a class=\"cart-item-title\"")
        .push_attr("href", ctx.product_href(id))
        .push_raw(" data-link>")
        .push_text(&entry.title)
        .push_raw("</a><span class=\"cart-item-price\">")
        .push_text(format_price(entry.lprice))
        .push_raw("</span><div class=\"quantity-control\"><button type=\"button\" class=\"quantity-decrease-btn\"")
        .push_attr("data-product-id", id)
        .push_raw(">-</button><span class=\"quantity-value\">")
        .push_text(entry.quantity)
        .push_raw("</span><button type=\"button\" class=\"quantity-increase-btn\"")
        .push_attr("data-product-id", id)
        .push_raw(">+</button></div><span class=\"cart-item-subtotal\">")
        .push_text(format_price(entry.subtotal()))
        .push_raw("</span><button type=\"button\" class=\"cart-item-remove-btn\"")
        .push_attr("data-product-id", id)
        .push_raw(">Remove</button></li>");
}
