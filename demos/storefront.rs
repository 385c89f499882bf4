//! Storefront Example - listing, detail and cart on an in-memory document
//!
//! Walks the shop the way a visitor would:
//! - opens the listing and sorts it by price
//! - follows the first product link to its detail page
//! - adds two of it to the cart
//! - opens the cart and prints the final markup
//!
//! The cart is written to a temporary directory, so a second run of the
//! app over the same directory would start with it filled.
//!
//! Run with: cargo run --example storefront

use std::rc::Rc;

use spark_shop::app::format_price;
use spark_shop::{
    logging, App, FileStorage, NodeId, RenderError, ShopConfig, ShopError, StaticCatalog,
    StorageError,
};

fn main() -> Result<(), ShopError> {
    logging::init("spark_shop=info");

    let dir = tempfile::tempdir().map_err(|err| StorageError::Io(std::env::temp_dir(), err))?;
    let storage = Rc::new(FileStorage::open(dir.path())?);
    let api = Rc::new(StaticCatalog::sample(48));

    let app = App::new(ShopConfig::default(), api, storage, "/")?;
    app.start()?;

    println!("=== spark-shop Storefront Example ===\n");

    let doc = app.document();
    let cards = doc.find_all(app.root(), ".product-card")?;
    println!("Listing shows {} products", cards.len());

    if let Some(sort) = doc.find(app.root(), "#sort-select")? {
        doc.change(sort, "price_desc")?;
        app.settle();
        println!("Sorted by price, URL is now {}", app.router().location());
    }

    let link = first(&app, ".product-card .product-link")?;
    doc.click(link);
    app.settle();
    println!("Opened {}", app.router().location());

    let title = first(&app, ".product-detail .product-title")?;
    println!("  title: {}", doc.text_content(title));

    let increase = first(&app, "#quantity-increase")?;
    doc.click(increase);
    app.settle();
    let add = first(&app, "#add-to-cart-btn")?;
    doc.click(add);
    app.settle();

    app.navigate("/cart");
    println!("\nCart:");
    for entry in app.cart().entries() {
        println!(
            "  {} x{} = {}",
            entry.title,
            entry.quantity,
            format_price(entry.subtotal())
        );
    }
    println!("  total: {}", format_price(app.cart().total_price()));

    println!("\n--- markup ---\n{}", app.html());

    app.stop();
    Ok(())
}

fn first(app: &App, css: &str) -> Result<NodeId, ShopError> {
    app.document()
        .find(app.root(), css)?
        .ok_or_else(|| RenderError::template("storefront", format!("nothing matches `{css}`")).into())
}
