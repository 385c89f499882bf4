//! End-to-end scenarios over the in-memory document.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::api::StaticCatalog;
use crate::logging::init_for_tests;
use crate::store::MemoryStorage;

fn start(config: ShopConfig, storage: Rc<dyn Storage>, href: &str) -> (App, StaticCatalog) {
    init_for_tests();
    let catalog = StaticCatalog::sample(60);
    let app = App::new(config, Rc::new(catalog.clone()), storage, href).unwrap();
    app.start().unwrap();
    (app, catalog)
}

fn start_at(href: &str) -> (App, StaticCatalog) {
    start(ShopConfig::default(), Rc::new(MemoryStorage::new()), href)
}

fn find(app: &App, css: &str) -> NodeId {
    app.document()
        .find(app.root(), css)
        .unwrap()
        .unwrap_or_else(|| panic!("nothing matches `{css}`"))
}

fn exists(app: &App, css: &str) -> bool {
    app.document().find(app.root(), css).unwrap().is_some()
}

fn attr_all(app: &App, css: &str, name: &str) -> Vec<String> {
    app.document()
        .find_all(app.root(), css)
        .unwrap()
        .into_iter()
        .filter_map(|node| app.document().attribute(node, name))
        .collect()
}

fn text(app: &App, css: &str) -> String {
    app.document().text_content(find(app, css))
}

fn click(app: &App, css: &str) {
    app.document().click(find(app, css));
    app.settle();
}

fn listed_prices(app: &App) -> Vec<u64> {
    attr_all(app, ".product-card", "data-price")
        .iter()
        .map(|p| p.parse().unwrap())
        .collect()
}

#[test]
fn test_listing_sort_and_page_reset() {
    let (app, catalog) = start_at("/?limit=20&sort=price_asc");

    let prices = listed_prices(&app);
    assert_eq!(prices.len(), 20);
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));

    click(&app, "[data-page=\"2\"]");
    assert_eq!(app.router().location().query_param("current").as_deref(), Some("2"));
    assert_eq!(text(&app, "[aria-current=page]"), "2");

    let sort = find(&app, "#sort-select");
    app.document().change(sort, "price_desc").unwrap();
    app.settle();

    let location = app.router().location();
    assert_eq!(location.query_param("sort").as_deref(), Some("price_desc"));
    assert_eq!(location.query_param("current"), None);
    assert_eq!(text(&app, "[aria-current=page]"), "1");

    let prices = listed_prices(&app);
    assert!(!prices.is_empty() && prices.len() <= 20);
    assert!(prices.windows(2).all(|w| w[0] >= w[1]));
    let highest = catalog.products().iter().map(|p| p.lprice).max().unwrap();
    assert_eq!(prices[0], highest);
    // Listing changes rewrite the entry instead of stacking history.
    assert_eq!(app.router().history().len(), 1);
}

#[test]
fn test_limit_select() {
    let (app, _) = start_at("/");
    assert_eq!(listed_prices(&app).len(), 20);

    let limit = find(&app, "#limit-select");
    app.document().change(limit, "50").unwrap();
    app.settle();
    assert_eq!(listed_prices(&app).len(), 50);
    assert_eq!(app.router().location().query_param("limit").as_deref(), Some("50"));
}

#[test]
fn test_search_on_enter() {
    let (app, _) = start_at("/");
    let input = find(&app, "#search-input");
    app.document().input(input, "kettle").unwrap();
    app.settle();
    assert_eq!(app.router().location().query_param("search"), None);

    app.document().key_down(input, "Enter");
    app.settle();
    assert_eq!(app.router().location().query_param("search").as_deref(), Some("kettle"));
    let titles: Vec<String> = app
        .document()
        .find_all(app.root(), ".product-title")
        .unwrap()
        .into_iter()
        .map(|node| app.document().text_content(node))
        .collect();
    assert!(!titles.is_empty());
    assert!(titles.iter().all(|t| t.starts_with("Kettle")), "{titles:?}");
}

#[test]
fn test_category_filters_and_breadcrumb() {
    let (app, catalog) = start_at("/?search=a");

    click(&app, "[data-category1=\"Home\"]");
    let location = app.router().location();
    assert_eq!(location.query_param("category1").as_deref(), Some("Home"));
    assert_eq!(location.query_param("search").as_deref(), Some("a"));
    for id in attr_all(&app, ".product-card", "data-product-id") {
        let product = catalog.products().iter().find(|p| p.product_id == id).unwrap();
        assert_eq!(product.category1, "Home");
    }

    let category2 = attr_all(&app, "[data-category2]", "data-category2");
    assert_eq!(category2, vec!["Bath", "Kitchen", "Storage"]);
    click(&app, "[data-category2=\"Bath\"]");
    assert_eq!(app.router().location().query_param("category2").as_deref(), Some("Bath"));
    assert_eq!(text(&app, "[data-breadcrumb=category2]"), "Bath");

    click(&app, "[data-breadcrumb=category1]");
    assert_eq!(app.router().location().query_param("category2"), None);
    assert_eq!(app.router().location().query_param("category1").as_deref(), Some("Home"));

    click(&app, "[data-breadcrumb=reset]");
    let location = app.router().location();
    assert_eq!(location.query_param("category1"), None);
    assert_eq!(location.query_param("search").as_deref(), Some("a"));
}

#[test]
fn test_add_to_cart_from_listing() {
    let (app, _) = start_at("/");
    assert!(!exists(&app, "#cart-count"));

    let button = find(&app, ".add-to-cart-btn");
    let id = app.document().attribute(button, "data-product-id").unwrap();
    app.document().click(button);
    assert_eq!(app.cart().get(&id).unwrap().quantity, 1);
    assert_eq!(text(&app, "#cart-count"), "1");
    assert!(text(&app, "#toast-container").contains("Added to cart"));

    app.document().click(find(&app, ".add-to-cart-btn"));
    assert_eq!(app.cart().len(), 1);
    assert_eq!(app.cart().get(&id).unwrap().quantity, 2);
    assert_eq!(text(&app, "#cart-count"), "1");
}

#[test]
fn test_fetch_failure_shows_retry() {
    let (app, catalog) = start_at("/");
    catalog.fail_next(2);

    let sort = find(&app, "#sort-select");
    app.document().change(sort, "name_asc").unwrap();
    app.settle();
    assert!(exists(&app, ".error-state"));
    assert!(!exists(&app, ".product-card"));

    click(&app, "#retry-btn");
    assert!(!exists(&app, ".error-state"));
    assert_eq!(listed_prices(&app).len(), 20);
}

#[test]
fn test_transient_failure_retried_automatically() {
    let (app, catalog) = start_at("/");
    catalog.fail_next(1);
    let sort = find(&app, "#sort-select");
    app.document().change(sort, "name_desc").unwrap();
    app.settle();
    assert!(!exists(&app, ".error-state"));
    assert_eq!(listed_prices(&app).len(), 20);
}

#[test]
fn test_detail_stepper_keeps_input() {
    let (app, catalog) = start_at("/product/1005");
    let product = catalog.products().iter().find(|p| p.product_id == "1005").unwrap().clone();
    assert_eq!(text(&app, "h1.product-title"), product.title);

    let input = find(&app, "#quantity-input");
    click(&app, "#quantity-increase");
    click(&app, "#quantity-increase");
    assert_eq!(find(&app, "#quantity-input"), input);
    assert_eq!(app.document().value(input).as_deref(), Some("3"));

    for _ in 0..5 {
        click(&app, "#quantity-decrease");
    }
    assert_eq!(app.document().value(input).as_deref(), Some("1"));

    app.document().input(input, "4").unwrap();
    app.settle();
    click(&app, "#add-to-cart-btn");
    assert_eq!(app.cart().get("1005").unwrap().quantity, 4);
    assert_eq!(text(&app, "#cart-count"), "1");
}

#[test]
fn test_detail_quantity_input_clamps_in_place() {
    let (app, _) = start_at("/product/1005");
    let input = find(&app, "#quantity-input");

    app.document().input(input, "0").unwrap();
    app.settle();
    assert_eq!(app.document().value(input).as_deref(), Some("1"));

    app.document().input(input, "-3").unwrap();
    app.settle();
    assert_eq!(app.document().value(input).as_deref(), Some("1"));

    click(&app, "#add-to-cart-btn");
    assert_eq!(app.cart().get("1005").unwrap().quantity, 1);
}

#[test]
fn test_detail_related_products() {
    let (app, catalog) = start_at("/product/1005");
    let product = catalog.products().iter().find(|p| p.product_id == "1005").unwrap().clone();

    let related = attr_all(&app, ".related-product-card", "data-product-id");
    assert!(!related.is_empty());
    assert!(!related.contains(&product.product_id));
    for id in &related {
        let other = catalog.products().iter().find(|p| &p.product_id == id).unwrap();
        assert_eq!(other.category2, product.category2);
    }

    let target = related[0].clone();
    click(&app, ".related-product-card");
    assert_eq!(app.router().location().pathname, format!("/product/{target}"));
    assert_eq!(find_attr(&app, ".product-detail", "data-product-id"), target);
}

fn find_attr(app: &App, css: &str, name: &str) -> String {
    app.document().attribute(find(app, css), name).unwrap()
}

#[test]
fn test_unknown_product_is_an_error_state() {
    let (app, catalog) = start_at("/product/nope");
    assert!(exists(&app, ".error-state"));
    // Not found is not worth retrying.
    assert_eq!(catalog.request_count(), 1);
}

#[test]
fn test_cart_page_flow() {
    let (app, catalog) = start_at("/cart");
    assert!(exists(&app, ".cart-empty"));

    for product in &catalog.products()[..3] {
        app.cart().add(product, 1);
    }
    assert_eq!(attr_all(&app, ".cart-item", "data-product-id"), vec!["1001", "1002", "1003"]);

    click(&app, "#cart-select-all");
    assert!(app.cart().is_all_selected());
    assert_eq!(text(&app, "#cart-selected-count"), "3");
    click(&app, "#cart-select-all");
    assert!(!app.cart().is_all_selected());
    assert_eq!(app.cart().selected_count(), 0);

    click(&app, ".quantity-decrease-btn[data-product-id=\"1001\"]");
    assert_eq!(app.cart().get("1001").unwrap().quantity, 1);
    click(&app, ".quantity-increase-btn[data-product-id=\"1001\"]");
    click(&app, ".quantity-increase-btn[data-product-id=\"1001\"]");
    assert_eq!(app.cart().get("1001").unwrap().quantity, 3);
    assert_eq!(text(&app, "#cart-total-quantity"), "5");

    click(&app, ".cart-item-checkbox[data-product-id=\"1002\"]");
    assert!(app.cart().get("1002").unwrap().selected);
    click(&app, "#cart-remove-selected");
    assert!(!app.cart().contains("1002"));

    click(&app, ".cart-item-remove-btn[data-product-id=\"1001\"]");
    assert_eq!(app.cart().len(), 1);

    click(&app, "#cart-clear");
    assert!(app.cart().is_empty());
    assert!(exists(&app, ".cart-empty"));
    assert!(!exists(&app, "#cart-count"));
}

#[test]
fn test_navigation_releases_page_bindings() {
    let (app, _) = start_at("/");
    let delegator = app.context().host().delegator().clone();
    let on_home = delegator.registration_count();

    for href in ["/cart", "/product/1001", "/nowhere", "/"] {
        app.navigate(href);
    }
    assert_eq!(delegator.registration_count(), on_home);

    app.stop();
    assert!(delegator.is_empty());
    assert!(app.document().children(app.root()).is_empty());
}

#[test]
fn test_layout_link_is_routed() {
    let (app, _) = start_at("/");
    let header = find(&app, "header");

    click(&app, "#cart-link");
    assert!(exists(&app, ".cart-page"));
    assert_eq!(app.router().history().len(), 2);
    assert_eq!(find(&app, "header"), header);

    assert!(app.router().back());
    app.settle();
    assert!(exists(&app, ".product-card"));
}

#[test]
fn test_not_found_links_home() {
    let (app, _) = start_at("/nope");
    assert!(text(&app, ".not-found").contains("/nope"));
    click(&app, ".home-link");
    assert_eq!(app.router().location().pathname, "/");
    assert!(exists(&app, ".product-card"));
}

#[test]
fn test_cart_survives_restart() {
    let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
    let (first, catalog) = start(ShopConfig::default(), storage.clone(), "/");
    first.cart().add(&catalog.products()[0], 2);
    first.stop();

    let (second, _) = start(ShopConfig::default(), storage, "/cart");
    assert_eq!(second.cart().get("1001").unwrap().quantity, 2);
    assert_eq!(text(&second, "#cart-count"), "1");
    assert_eq!(attr_all(&second, ".cart-item", "data-product-id"), vec!["1001"]);
}

#[test]
fn test_base_path() {
    let config = ShopConfig {
        base_path: "/shop".into(),
        ..ShopConfig::default()
    };
    let (app, _) = start(config, Rc::new(MemoryStorage::new()), "/shop/cart");
    assert!(exists(&app, ".cart-page"));
    assert_eq!(find_attr(&app, "#cart-link", "href"), "/shop/cart");

    app.navigate("/cart");
    assert!(exists(&app, ".not-found"));
    click(&app, ".home-link");
    assert_eq!(app.router().location().pathname, "/shop/");
    assert!(exists(&app, ".product-card"));
}

#[test]
fn test_toasts_dismiss_and_expire() {
    let config = ShopConfig {
        toast_duration_ms: 0,
        ..ShopConfig::default()
    };
    let (app, _) = start(config, Rc::new(MemoryStorage::new()), "/");

    click(&app, ".add-to-cart-btn");
    assert!(exists(&app, ".toast"));
    click(&app, ".toast-close");
    assert!(!exists(&app, ".toast"));

    click(&app, ".add-to-cart-btn");
    assert_eq!(app.expire_toasts(), 1);
    assert!(!exists(&app, ".toast"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = ShopConfig {
        default_limit: 7,
        ..ShopConfig::default()
    };
    let catalog = StaticCatalog::sample(1);
    let result = App::new(config, Rc::new(catalog), Rc::new(MemoryStorage::new()), "/");
    assert!(matches!(result, Err(crate::error::ShopError::Config(_))));
}

#[test]
fn test_repeated_navigation_reuses_arena() {
    let (app, _) = start_at("/");
    app.navigate("/cart");
    app.navigate("/");
    let warm = app.document().arena_len();
    let live = app.document().node_count();

    for _ in 0..25 {
        app.navigate("/cart");
        app.navigate("/");
    }

    assert!(app.document().node_count() <= live + live / 10);
    assert!(
        app.document().arena_len() <= warm * 2,
        "arena grew from {warm} to {}",
        app.document().arena_len()
    );
}
