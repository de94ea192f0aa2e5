// core/src/models/profile.rs

use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MAX_PHONE_LEN: usize = 15;
const MAX_LOCATION_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FarmerProfile {
  pub id: Uuid,
  pub user_id: Uuid,
  pub phone_number: String,
  pub location: String,
  /// Acres.
  pub farm_size: Decimal,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFarmerProfile {
  pub phone_number: String,
  pub location: String,
  pub farm_size: Decimal,
}

impl NewFarmerProfile {
  pub fn validate(&self) -> Result<()> {
    let phone = self.phone_number.as_str();
    if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
      return Err(MarketError::validation(
        "phone_number",
        "Phone number must contain only digits",
      ));
    }
    if phone.len() > MAX_PHONE_LEN {
      return Err(MarketError::validation(
        "phone_number",
        format!("Phone number must be at most {} digits", MAX_PHONE_LEN),
      ));
    }

    let location = self.location.trim();
    if location.is_empty() {
      return Err(MarketError::validation("location", "Location is required"));
    }
    if location.chars().count() > MAX_LOCATION_LEN {
      return Err(MarketError::validation(
        "location",
        format!("Location must be at most {} characters", MAX_LOCATION_LEN),
      ));
    }

    if self.farm_size <= Decimal::ZERO {
      return Err(MarketError::validation("farm_size", "Farm size must be greater than zero"));
    }
    if self.farm_size.normalize().scale() > 2 {
      return Err(MarketError::validation(
        "farm_size",
        "Farm size allows at most two decimal places",
      ));
    }
    Ok(())
  }
}
