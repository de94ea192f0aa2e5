// core/src/payments/mod.rs

//! Payment processor boundary: creating payment intents and verifying the
//! processor's signed notifications.

use crate::error::MarketError;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub mod mock;
pub mod stripe;
pub mod webhook;

pub use mock::MockGateway;
pub use stripe::StripeGateway;
pub use webhook::{PaymentEvent, WebhookVerifier, PAYMENT_SUCCEEDED};

/// Attached to every intent so the processor's records can be traced back to
/// the order that created them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMetadata {
  pub product_id: Uuid,
  pub quantity: i32,
  pub buyer_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
  /// Smallest currency unit (cents for usd).
  pub amount_minor: i64,
  pub currency: String,
  pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
  pub id: String,
  /// Handed to the buyer's client to complete payment.
  pub client_secret: String,
  pub amount_minor: i64,
  pub currency: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
  #[error("payment request rejected: {0}")]
  Rejected(String),
  #[error("payment processor unreachable: {0}")]
  Transport(String),
  #[error("unexpected processor response: {0}")]
  Response(String),
}

impl From<PaymentError> for MarketError {
  fn from(err: PaymentError) -> Self {
    MarketError::PaymentProcessor(err.to_string())
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError>;
}

/// Converts a major-unit amount to minor units, truncating any fraction of
/// a minor unit. `None` if the result does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
  amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}
