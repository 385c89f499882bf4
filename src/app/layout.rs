//! Page shell: header with the cart badge, the page outlet and toasts.

use tracing::debug;

use crate::component::{Component, ViewCx};
use crate::render::{Html, View};
use crate::store::ToastId;

use super::AppContext;

/// Where the router mounts pages.
pub const OUTLET: &str = "#outlet";

/// The shell renders once. The badge and the toast list are child
/// components so cart and toast changes never repaint the outlet.
pub fn layout(ctx: &AppContext) -> Component<(), ()> {
    let ctx = ctx.clone();
    Component::new("Layout", (), move |cx: &ViewCx<(), ()>| {
        let mut html = Html::new();
        html.push_raw("<div class=\"shell\"><header class=\"site-header\"><h1 class=\"logo\"><a")
            .push_attr("href", ctx.href("/"))
            .push_raw(" data-link>Shopping Mall</a></h1><nav><a id=\"cart-link\"")
            .push_attr("href", ctx.href("/cart"))
            .push_raw(" data-link>Cart<span id=\"cart-badge\"></span></a></nav></header>")
            .push_raw("<main id=\"outlet\"></main>")
            .push_raw("<footer class=\"site-footer\"><p>Shopping Mall</p></footer>")
            .push_raw("<div id=\"toast-container\" aria-live=\"polite\"></div></div>");

        cx.child("#cart-badge", cart_badge(&ctx), ());
        cx.child("#toast-container", toast_list(&ctx), ());
        Ok(html.into())
    })
}

fn cart_badge(ctx: &AppContext) -> Component<(), ()> {
    let cart = ctx.cart().clone();
    Component::new("CartBadge", (), move |_: &ViewCx<(), ()>| {
        let count = cart.len();
        if count == 0 {
            return Ok(View::empty());
        }
        let mut html = Html::new();
        html.push_raw("<span id=\"cart-count\" class=\"badge\">")
            .push_text(count)
            .push_raw("</span>");
        Ok(html.into())
    })
}

fn toast_list(ctx: &AppContext) -> Component<(), ()> {
    let toasts = ctx.toasts().clone();
    let dismiss = toasts.clone();
    Component::new("Toasts", (), move |_: &ViewCx<(), ()>| {
        let mut html = Html::new();
        for toast in toasts.visible() {
            html.push_raw("<div")
                .push_attr("class", format!("toast toast-{}", toast.kind.as_str()))
                .push_attr("data-toast-id", toast.id)
                .push_raw(" role=\"status\"><span class=\"toast-message\">")
                .push_text(&toast.message)
                .push_raw("</span><button class=\"toast-close\"")
                .push_attr("data-toast-id", toast.id)
                .push_raw(" aria-label=\"Close\">×</button></div>");
        }
        Ok(html.into())
    })
    .on("click", ".toast-close", move |scope, _, button| {
        let id = scope
            .document()
            .attribute(button, "data-toast-id")
            .and_then(|id| id.parse::<ToastId>().ok());
        if let Some(id) = id {
            debug!(%id, "toast closed");
            dismiss.dismiss(id);
        }
    })
}
