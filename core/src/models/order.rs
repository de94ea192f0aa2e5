// core/src/models/order.rs

use crate::models::product::MAX_PRICE;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// `orders.total_price` shares the price column's precision.
pub const MAX_TOTAL_PRICE: Decimal = MAX_PRICE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

impl OrderStatus {
  /// The status to store alongside `payment_status`.
  ///
  /// A paid order that is still pending moves to processing; every other
  /// combination is stored as given.
  pub fn reconcile_with(self, payment_status: PaymentStatus) -> OrderStatus {
    match (self, payment_status) {
      (OrderStatus::Pending, PaymentStatus::Paid) => OrderStatus::Processing,
      (status, _) => status,
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  /// Unit price times quantity at placement. Never recomputed.
  pub total_price: Decimal,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  /// Processor payment intent id.
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Completed and paid: nothing left for a success notification to change.
  pub fn is_settled(&self) -> bool {
    self.status == OrderStatus::Completed && self.payment_status == PaymentStatus::Paid
  }
}

/// An order row ready to insert together with the stock decrement.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub total_price: Decimal,
  pub payment_reference: String,
}
