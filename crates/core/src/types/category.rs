//! Product categories and their print-provider catalog mapping.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a category name is not in the catalog.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported product category: {0}")]
pub struct CategoryError(pub String);

/// Print-on-demand product category offered by the storefront.
///
/// Serialized with the display names the front end uses (`"T-Shirts"`,
/// `"Wall Art"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Mugs,
    #[serde(rename = "T-Shirts")]
    TShirts,
    Hoodies,
    #[serde(rename = "Wall Art")]
    WallArt,
    Sweatshirts,
    Pillows,
    #[serde(rename = "Tote Bags")]
    ToteBags,
    #[serde(rename = "Phone Cases")]
    PhoneCases,
    Blankets,
    /// Listed as coming soon; not yet wired to a blueprint or base cost.
    Plates,
}

/// Blueprint and print provider that manufacture a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMapping {
    pub blueprint_id: i64,
    pub print_provider_id: i64,
}

impl ProductCategory {
    /// Every category, in storefront display order.
    pub const ALL: [Self; 10] = [
        Self::Mugs,
        Self::TShirts,
        Self::Hoodies,
        Self::WallArt,
        Self::Sweatshirts,
        Self::Pillows,
        Self::ToteBags,
        Self::PhoneCases,
        Self::Blankets,
        Self::Plates,
    ];

    /// Display name, identical to the serialized form.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mugs => "Mugs",
            Self::TShirts => "T-Shirts",
            Self::Hoodies => "Hoodies",
            Self::WallArt => "Wall Art",
            Self::Sweatshirts => "Sweatshirts",
            Self::Pillows => "Pillows",
            Self::ToteBags => "Tote Bags",
            Self::PhoneCases => "Phone Cases",
            Self::Blankets => "Blankets",
            Self::Plates => "Plates",
        }
    }

    /// Manufacturing base cost in cents, if the category has one.
    #[must_use]
    pub const fn base_cost_cents(&self) -> Option<i64> {
        match self {
            Self::Mugs => Some(799),
            Self::TShirts => Some(1199),
            Self::Hoodies => Some(1999),
            Self::WallArt => Some(1499),
            Self::Sweatshirts => Some(1799),
            Self::Pillows => Some(999),
            Self::ToteBags => Some(899),
            Self::PhoneCases => Some(1099),
            Self::Blankets => Some(2499),
            Self::Plates => None,
        }
    }

    /// Print-provider blueprint mapping, if the category can be manufactured.
    #[must_use]
    pub const fn catalog_mapping(&self) -> Option<CatalogMapping> {
        let (blueprint_id, print_provider_id) = match self {
            Self::Mugs => (478, 28),
            Self::TShirts => (498, 217),
            Self::Hoodies => (592, 83),
            Self::WallArt => (609, 74),
            Self::Sweatshirts => (679, 26),
            Self::Pillows => (809, 72),
            Self::ToteBags => (836, 72),
            Self::PhoneCases => (841, 88),
            Self::Blankets => (993, 66),
            Self::Plates => return None,
        };
        Some(CatalogMapping {
            blueprint_id,
            print_provider_id,
        })
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProductCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_names() {
        assert_eq!("T-Shirts".parse::<ProductCategory>(), Ok(ProductCategory::TShirts));
        assert_eq!("Wall Art".parse::<ProductCategory>(), Ok(ProductCategory::WallArt));
        assert!("Socks".parse::<ProductCategory>().is_err());
    }

    #[test]
    fn test_name_roundtrips_through_from_str() {
        for category in ProductCategory::ALL {
            assert_eq!(category.name().parse::<ProductCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&ProductCategory::PhoneCases).unwrap();
        assert_eq!(json, "\"Phone Cases\"");
        let parsed: ProductCategory = serde_json::from_str("\"Tote Bags\"").unwrap();
        assert_eq!(parsed, ProductCategory::ToteBags);
    }

    #[test]
    fn test_plates_has_no_catalog_entry() {
        assert!(ProductCategory::Plates.catalog_mapping().is_none());
        assert!(ProductCategory::Plates.base_cost_cents().is_none());
    }

    #[test]
    fn test_mugs_mapping() {
        let mapping = ProductCategory::Mugs.catalog_mapping().unwrap();
        assert_eq!(mapping.blueprint_id, 478);
        assert_eq!(mapping.print_provider_id, 28);
    }
}
