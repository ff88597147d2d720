//! Retail pricing.
//!
//! Retail price = base cost × 1.5, rounded to the nearest cent (half away
//! from zero) before conversion to dollars. A category with no base cost
//! falls back to [`DEFAULT_BASE_COST_CENTS`] so a catalog gap never blocks
//! a sale.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{Price, ProductCategory};

/// Base cost used when the catalog has no entry for a category.
pub const DEFAULT_BASE_COST_CENTS: i64 = 1000;

/// Markup multiplier applied to the base cost (50% margin).
const MARKUP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Compute the retail price for a catalog category.
#[must_use]
pub fn retail_price(category: ProductCategory) -> Price {
    price_from_base_cost(
        category
            .base_cost_cents()
            .unwrap_or(DEFAULT_BASE_COST_CENTS),
    )
}

/// Compute the retail price for a category given by display name.
///
/// Unknown names are priced from the default base cost rather than rejected.
#[must_use]
pub fn retail_price_for_name(name: &str) -> Price {
    name.parse::<ProductCategory>().map_or_else(
        |_| price_from_base_cost(DEFAULT_BASE_COST_CENTS),
        retail_price,
    )
}

fn price_from_base_cost(base_cost_cents: i64) -> Price {
    let cents = (Decimal::from(base_cost_cents) * MARKUP)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Price::new(cents / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mugs_round_half_up() {
        // 799 * 1.5 = 1198.5 -> 1199 cents
        assert_eq!(retail_price(ProductCategory::Mugs), Price::from_minor_units(1199));
    }

    #[test]
    fn test_every_category_matches_formula() {
        for category in ProductCategory::ALL {
            let base = category.base_cost_cents().unwrap_or(DEFAULT_BASE_COST_CENTS);
            // round(base * 1.5) in integer arithmetic: (3 * base + 1) / 2 for positive base
            let expected = (3 * base + 1) / 2;
            assert_eq!(
                retail_price(category).to_minor_units(),
                Some(expected),
                "{category}"
            );
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(retail_price(ProductCategory::TShirts), Price::from_minor_units(1799));
        assert_eq!(retail_price(ProductCategory::Hoodies), Price::from_minor_units(2999));
        assert_eq!(retail_price(ProductCategory::Blankets), Price::from_minor_units(3749));
    }

    #[test]
    fn test_unknown_name_uses_default_base_cost() {
        assert_eq!(retail_price_for_name("UnknownCategory"), Price::from_minor_units(1500));
    }

    #[test]
    fn test_category_without_base_cost_uses_default() {
        assert_eq!(retail_price(ProductCategory::Plates), Price::from_minor_units(1500));
    }

    #[test]
    fn test_known_name_resolves() {
        assert_eq!(retail_price_for_name("Mugs"), Price::from_minor_units(1199));
    }

    #[test]
    fn test_prices_have_no_sub_cent_component() {
        for category in ProductCategory::ALL {
            let amount = retail_price(category).amount();
            assert_eq!(amount.round_dp(2), amount);
        }
    }
}
