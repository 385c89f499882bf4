use crate::component::{Component, ViewCx};
use crate::render::Html;
use crate::router::RouteMatch;

use super::AppContext;

pub fn not_found(ctx: &AppContext, _: &RouteMatch) -> Component<(), RouteMatch> {
    let home = ctx.href("/");
    Component::new("NotFound", (), move |cx: &ViewCx<(), RouteMatch>| {
        let mut html = Html::new();
        html.push_raw("<section class=\"not-found\"><h1>404</h1><p>We couldn't find <code>")
            .push_text(&cx.props().location.pathname)
            .push_raw("</code>.</p><a class=\"home-link\"")
            .push_attr("href", &home)
            .push_raw(" data-link>Back to the shop</a></section>");
        Ok(html.into())
    })
}
