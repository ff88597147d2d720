//! Catalog price listing.

use geoart_core::{ProductCategory, retail_price, retail_price_for_name};

/// One row of the price table.
fn row(category: ProductCategory) -> String {
    let base = category
        .base_cost_cents()
        .map_or_else(|| "default".to_owned(), |cents| cents.to_string());
    let blueprint = category.catalog_mapping().map_or_else(
        || "not available".to_owned(),
        |mapping| {
            format!(
                "blueprint {} / provider {}",
                mapping.blueprint_id, mapping.print_provider_id
            )
        },
    );
    format!(
        "{:<12} {:>8} {:>8}  {blueprint}",
        category.name(),
        base,
        retail_price(category).to_string()
    )
}

/// Print every category's base cost, retail price and vendor mapping.
#[allow(clippy::print_stdout)]
pub fn table() {
    println!("{:<12} {:>8} {:>8}  vendor", "category", "base", "retail");
    for category in ProductCategory::ALL {
        println!("{}", row(category));
    }
}

/// Print the retail price for a category given by display name.
#[allow(clippy::print_stdout)]
pub fn single(name: &str) {
    match name.parse::<ProductCategory>() {
        Ok(category) => println!("{}", row(category)),
        Err(_) => println!(
            "{name}: not in the catalog, priced from the default base cost at {}",
            retail_price_for_name(name)
        ),
    }
}
