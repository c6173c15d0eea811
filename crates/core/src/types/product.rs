//! Catalog products.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;

/// Product category.
///
/// The storefront sells from a fixed set of departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Mobiles,
    Fashion,
    Home,
    Electronics,
    Grocery,
}

impl Category {
    /// Every category, in storefront navigation order.
    pub const ALL: [Self; 5] = [
        Self::Mobiles,
        Self::Fashion,
        Self::Home,
        Self::Electronics,
        Self::Grocery,
    ];

    /// Display name, also used as the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobiles => "Mobiles",
            Self::Fashion => "Fashion",
            Self::Home => "Home",
            Self::Electronics => "Electronics",
            Self::Grocery => "Grocery",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// A catalog product.
///
/// Products come from seed data and are never mutated at runtime. Field names
/// serialize in camelCase, which is the format of the local catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)] // promotional flags are independent
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub category: Category,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    pub rating: Decimal,
    pub review_count: u32,
    pub image: String,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    pub description: String,
    #[serde(default)]
    pub bank_offers: Vec<String>,
    #[serde(default)]
    pub is_sponsored: bool,
    #[serde(default)]
    pub limited_deal: bool,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Product {
    /// Percentage saved against the original price, rounded down.
    ///
    /// Returns `None` when there is no original price or it is not higher than
    /// the current price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        let original = self.original_price?.rupees();
        let price = self.price.rupees();
        if original <= price || original <= 0 {
            return None;
        }
        let percent = (original - price).saturating_mul(100) / original;
        u8::try_from(percent).ok()
    }

    /// Case-insensitive match of `term` against title or description.
    ///
    /// An empty term matches everything.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Minimal product for tests across the crate.
    pub(crate) fn product(id: &str, price: i64) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            title: format!("Product {id}"),
            category: Category::Home,
            price: Price::new(price),
            original_price: None,
            rating: Decimal::new(45, 1),
            review_count: 10,
            image: format!("https://picsum.photos/id/{id}/400/400"),
            is_best_seller: false,
            delivery_date: None,
            description: "A test product".to_owned(),
            bank_offers: Vec::new(),
            is_sponsored: false,
            limited_deal: false,
            features: Vec::new(),
        }
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("grocery".parse::<Category>().unwrap(), Category::Grocery);
        assert!("Toys".parse::<Category>().is_err());
    }

    #[test]
    fn test_discount_percent() {
        let mut p = product("1", 1299);
        assert_eq!(p.discount_percent(), None);

        p.original_price = Some(Price::new(2999));
        assert_eq!(p.discount_percent(), Some(56));

        p.original_price = Some(Price::new(1000));
        assert_eq!(p.discount_percent(), None);
    }

    #[test]
    fn test_matches_search() {
        let mut p = product("3", 26_990);
        p.title = "Sony WH-1000XM5 Headphones".to_owned();
        p.description = "Industry leading noise cancellation".to_owned();

        assert!(p.matches_search(""));
        assert!(p.matches_search("sony"));
        assert!(p.matches_search("NOISE"));
        assert!(!p.matches_search("kurta"));
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let json = r#"{
            "id": "4",
            "title": "Jaipuri Bed Sheet",
            "category": "Home",
            "price": 849,
            "originalPrice": 1999,
            "rating": 4,
            "reviewCount": 450,
            "image": "https://picsum.photos/id/4/400/400",
            "description": "Cotton bedsheet",
            "limitedDeal": true
        }"#;

        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_str(), "4");
        assert_eq!(p.original_price, Some(Price::new(1999)));
        assert!(p.limited_deal);
        assert!(!p.is_best_seller);
        assert!(p.features.is_empty());
    }
}
