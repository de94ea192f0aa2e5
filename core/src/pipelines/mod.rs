// core/src/pipelines/mod.rs

//! Workflow definitions for every marketplace operation that writes.

pub mod catalog_pipeline;
pub mod contexts;
pub mod order_pipeline;
pub mod profile_pipeline;
pub mod reconciliation_pipeline;
pub mod registration_pipeline;

use crate::error::MarketError;
use crate::workflow::Pipeline;
use contexts::{ListingCtxData, PlaceOrderCtxData, ProfileSetupCtxData, ReconciliationCtxData, RegistrationCtxData};
use std::sync::Arc;

/// Every pipeline, built once and shared across requests.
#[derive(Clone)]
pub struct Pipelines {
  pub registration: Arc<Pipeline<RegistrationCtxData, MarketError>>,
  pub profile_setup: Arc<Pipeline<ProfileSetupCtxData, MarketError>>,
  pub listing: Arc<Pipeline<ListingCtxData, MarketError>>,
  pub place_order: Arc<Pipeline<PlaceOrderCtxData, MarketError>>,
  pub reconciliation: Arc<Pipeline<ReconciliationCtxData, MarketError>>,
}

impl Pipelines {
  pub fn build() -> Self {
    tracing::debug!("Building marketplace pipelines.");
    Self {
      registration: Arc::new(registration_pipeline::build_registration_pipeline()),
      profile_setup: Arc::new(profile_pipeline::build_profile_setup_pipeline()),
      listing: Arc::new(catalog_pipeline::build_listing_pipeline()),
      place_order: Arc::new(order_pipeline::build_place_order_pipeline()),
      reconciliation: Arc::new(reconciliation_pipeline::build_reconciliation_pipeline()),
    }
  }
}
