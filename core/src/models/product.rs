// core/src/models/product.rs

use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;

/// 99_999_999.99, the largest value a `NUMERIC(10, 2)` money column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "product_category", rename_all = "lowercase")]
pub enum ProductCategory {
  Vegetables,
  Fruits,
  Grains,
  Dairy,
  Meat,
  Other,
}

impl ProductCategory {
  pub const ALL: [ProductCategory; 6] = [
    ProductCategory::Vegetables,
    ProductCategory::Fruits,
    ProductCategory::Grains,
    ProductCategory::Dairy,
    ProductCategory::Meat,
    ProductCategory::Other,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ProductCategory::Vegetables => "vegetables",
      ProductCategory::Fruits => "fruits",
      ProductCategory::Grains => "grains",
      ProductCategory::Dairy => "dairy",
      ProductCategory::Meat => "meat",
      ProductCategory::Other => "other",
    }
  }
}

impl fmt::Display for ProductCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ProductCategory {
  type Err = MarketError;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_ascii_lowercase();
    ProductCategory::ALL
      .into_iter()
      .find(|c| c.as_str() == wanted)
      .ok_or_else(|| MarketError::validation("category", format!("'{}' is not a valid category", s)))
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub farmer_id: Uuid,
  pub name: String,
  pub description: String,
  pub price: Decimal,
  /// Units available for sale. Never negative.
  pub quantity: i32,
  pub category: ProductCategory,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Product listing form. `category` stays a string until validation so that
/// an unknown value is reported as a field error rather than a parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price: Decimal,
  pub quantity: i32,
  pub category: String,
}

impl NewProduct {
  /// Checks every field and returns the parsed category.
  pub fn validate(&self) -> Result<ProductCategory> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(MarketError::validation("name", "Name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
      return Err(MarketError::validation(
        "name",
        format!("Name must be at most {} characters", MAX_NAME_LEN),
      ));
    }
    if self.description.trim().is_empty() {
      return Err(MarketError::validation("description", "Description is required"));
    }
    if self.price <= Decimal::ZERO {
      return Err(MarketError::validation("price", "Price must be greater than zero"));
    }
    if self.price > MAX_PRICE {
      return Err(MarketError::validation(
        "price",
        format!("Price must be at most {}", MAX_PRICE),
      ));
    }
    if self.price.normalize().scale() > 2 {
      return Err(MarketError::validation("price", "Price allows at most two decimal places"));
    }
    if self.quantity < 0 {
      return Err(MarketError::validation("quantity", "Quantity cannot be negative"));
    }
    self.category.parse()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn listing() -> NewProduct {
    NewProduct {
      name: "Sukuma wiki".to_string(),
      description: "Fresh collard greens, bundled daily.".to_string(),
      price: dec!(1.50),
      quantity: 40,
      category: "Vegetables".to_string(),
    }
  }

  #[test]
  fn parses_category_case_insensitively() {
    assert_eq!(listing().validate().unwrap(), ProductCategory::Vegetables);
  }

  #[test]
  fn rejects_unknown_category() {
    let mut p = listing();
    p.category = "flowers".to_string();
    match p.validate() {
      Err(MarketError::Validation { field, .. }) => assert_eq!(field, "category"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn rejects_non_positive_price_and_negative_stock() {
    let mut p = listing();
    p.price = dec!(0);
    assert!(matches!(p.validate(), Err(MarketError::Validation { ref field, .. }) if field == "price"));

    let mut p = listing();
    p.quantity = -1;
    assert!(matches!(p.validate(), Err(MarketError::Validation { ref field, .. }) if field == "quantity"));
  }

  #[test]
  fn price_is_capped_at_the_column_limit() {
    let mut p = listing();
    p.price = MAX_PRICE;
    assert!(p.validate().is_ok());

    p.price = dec!(100000000.00);
    assert!(matches!(p.validate(), Err(MarketError::Validation { ref field, .. }) if field == "price"));

    p.price = dec!(1000000000000000000000000000);
    assert!(matches!(p.validate(), Err(MarketError::Validation { ref field, .. }) if field == "price"));
  }

  #[test]
  fn max_price_matches_numeric_10_2() {
    assert_eq!(MAX_PRICE, dec!(99999999.99));
  }

  #[test]
  fn zero_stock_is_a_valid_listing() {
    let mut p = listing();
    p.quantity = 0;
    assert!(p.validate().is_ok());
  }
}
