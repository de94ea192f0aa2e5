// core/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `ContextData`.

use crate::marketplace::MarketSettings;
use crate::models::{FarmerProfile, NewFarmerProfile, NewProduct, Order, Product, ProductCategory, Registration, User};
use crate::payments::{PaymentEvent, PaymentGateway, PaymentIntent, WebhookVerifier};
use crate::store::{MarketStore, StockReservation};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators every pipeline may reach for, built once at startup.
#[derive(Clone)]
pub struct MarketServices {
  pub store: Arc<dyn MarketStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub verifier: WebhookVerifier,
  pub settings: MarketSettings,
}

pub struct RegistrationCtxData {
  pub services: MarketServices,
  pub registration: Registration,
  pub password_hash: Option<String>,
  pub user: Option<User>,
}

pub struct ProfileSetupCtxData {
  pub services: MarketServices,
  pub user_id: Uuid,
  pub input: NewFarmerProfile,
  pub profile: Option<FarmerProfile>,
}

pub struct ListingCtxData {
  pub services: MarketServices,
  pub user_id: Uuid,
  pub input: NewProduct,
  pub category: Option<ProductCategory>,
  pub farmer: Option<FarmerProfile>,
  pub product: Option<Product>,
}

pub struct PlaceOrderCtxData {
  pub services: MarketServices,
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  /// As received; narrowed to `quantity` once validated.
  pub requested_quantity: i64,
  pub quantity: Option<i32>,
  /// Held from `reserve_product_stock` until `persist_order` commits it, or
  /// until the run fails and the context is dropped.
  pub reservation: Option<Box<dyn StockReservation>>,
  pub product: Option<Product>,
  pub total_price: Option<Decimal>,
  pub payment_intent: Option<PaymentIntent>,
  pub order: Option<Order>,
}

impl PlaceOrderCtxData {
  pub fn new(services: MarketServices, buyer_id: Uuid, product_id: Uuid, requested_quantity: i64) -> Self {
    Self {
      services,
      buyer_id,
      product_id,
      requested_quantity,
      quantity: None,
      reservation: None,
      product: None,
      total_price: None,
      payment_intent: None,
      order: None,
    }
  }
}

/// What a verified payment notification did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
  /// The order moved to completed/paid.
  Settled { order_id: Uuid },
  /// The order was already completed/paid; nothing changed.
  AlreadySettled { order_id: Uuid },
  /// Event type this handler does not act on.
  Ignored { event_type: String },
}

pub struct ReconciliationCtxData {
  pub services: MarketServices,
  pub payload: Vec<u8>,
  pub signature_header: Option<String>,
  pub event: Option<PaymentEvent>,
  pub order: Option<Order>,
  pub outcome: Option<ReconciliationOutcome>,
}
