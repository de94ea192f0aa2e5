// core/src/marketplace.rs

//! `Marketplace`: the entry point for every operation. Writes go through the
//! pipelines in `crate::pipelines`; reads go straight to the store.

use crate::error::{MarketError, Result};
use crate::models::{FarmerProfile, NewFarmerProfile, NewProduct, Order, Product, Registration, User};
use crate::payments::webhook::DEFAULT_TOLERANCE;
use crate::payments::{PaymentGateway, WebhookVerifier};
use crate::pipelines::contexts::{
  ListingCtxData, MarketServices, PlaceOrderCtxData, ProfileSetupCtxData, ReconciliationCtxData,
  ReconciliationOutcome, RegistrationCtxData,
};
use crate::pipelines::Pipelines;
use crate::services::credentials;
use crate::store::MarketStore;
use crate::workflow::{ContextData, Pipeline, PipelineResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MarketSettings {
  /// ISO currency code sent with payment intents, lowercase.
  pub currency: String,
  pub webhook_secret: String,
  pub webhook_tolerance: Duration,
}

impl Default for MarketSettings {
  fn default() -> Self {
    Self {
      currency: "usd".to_string(),
      webhook_secret: String::new(),
      webhook_tolerance: DEFAULT_TOLERANCE,
    }
  }
}

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
  pub order: Order,
  /// Lets the buyer's client complete the payment with the processor.
  pub client_secret: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmerDashboard {
  pub profile: FarmerProfile,
  pub products: Vec<Product>,
  /// Orders placed against the farmer's products, newest first.
  pub orders: Vec<Order>,
}

#[derive(Clone)]
pub struct Marketplace {
  services: MarketServices,
  pipelines: Pipelines,
}

/// Runs a pipeline to completion. A handler stopping the run early is a
/// wiring bug for these workflows, so it surfaces as an internal error.
async fn run_to_completion<T>(pipeline: &Pipeline<T, MarketError>, ctx_data: ContextData<T>, name: &str) -> Result<()>
where
  T: Send + Sync + 'static,
{
  match pipeline.run(ctx_data).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(pipeline = name, "Pipeline stopped before completing.");
      Err(MarketError::Internal(format!("{} did not complete", name)))
    }
  }
}

fn missing_result(name: &str, field: &str) -> MarketError {
  MarketError::Internal(format!("{} completed without producing '{}'", name, field))
}

impl Marketplace {
  pub fn new(store: Arc<dyn MarketStore>, gateway: Arc<dyn PaymentGateway>, settings: MarketSettings) -> Self {
    let verifier = WebhookVerifier::new(settings.webhook_secret.as_bytes()).with_tolerance(settings.webhook_tolerance);
    Self {
      services: MarketServices {
        store,
        gateway,
        verifier,
        settings,
      },
      pipelines: Pipelines::build(),
    }
  }

  pub fn store(&self) -> &Arc<dyn MarketStore> {
    &self.services.store
  }

  pub fn settings(&self) -> &MarketSettings {
    &self.services.settings
  }

  /// Verifier holding the configured signing secret.
  pub fn webhook_verifier(&self) -> &WebhookVerifier {
    &self.services.verifier
  }

  #[instrument(name = "Marketplace::register_user", skip_all, fields(username = %registration.username), err(Display))]
  pub async fn register_user(&self, registration: Registration) -> Result<User> {
    let ctx_data = ContextData::new(RegistrationCtxData {
      services: self.services.clone(),
      registration,
      password_hash: None,
      user: None,
    });
    run_to_completion(&self.pipelines.registration, ctx_data.clone(), "registration").await?;
    let user = ctx_data.write().user.take();
    user.ok_or_else(|| missing_result("registration", "user"))
  }

  /// Checks a username/password pair. Both an unknown name and a wrong
  /// password fail with the same `Unauthenticated` message.
  #[instrument(name = "Marketplace::authenticate", skip(self, password), err(Display))]
  pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
    let rejected = || MarketError::Unauthenticated("Invalid username or password".to_string());
    let user = self
      .services
      .store
      .find_user_by_username(username.trim())
      .await?
      .ok_or_else(rejected)?;
    if !credentials::verify_password_blocking(user.password_hash.clone(), password.to_string()).await? {
      return Err(rejected());
    }
    info!(user_id = %user.id, "User authenticated.");
    Ok(user)
  }

  #[instrument(name = "Marketplace::setup_profile", skip(self, input), err(Display))]
  pub async fn setup_profile(&self, user_id: Uuid, input: NewFarmerProfile) -> Result<FarmerProfile> {
    let ctx_data = ContextData::new(ProfileSetupCtxData {
      services: self.services.clone(),
      user_id,
      input,
      profile: None,
    });
    run_to_completion(&self.pipelines.profile_setup, ctx_data.clone(), "profile setup").await?;
    let profile = ctx_data.write().profile.take();
    profile.ok_or_else(|| missing_result("profile setup", "profile"))
  }

  #[instrument(name = "Marketplace::add_product", skip(self, input), err(Display))]
  pub async fn add_product(&self, user_id: Uuid, input: NewProduct) -> Result<Product> {
    let ctx_data = ContextData::new(ListingCtxData {
      services: self.services.clone(),
      user_id,
      input,
      category: None,
      farmer: None,
      product: None,
    });
    run_to_completion(&self.pipelines.listing, ctx_data.clone(), "listing").await?;
    let product = ctx_data.write().product.take();
    product.ok_or_else(|| missing_result("listing", "product"))
  }

  pub async fn list_products(&self) -> Result<Vec<Product>> {
    self.services.store.list_products().await
  }

  pub async fn get_product(&self, product_id: Uuid) -> Result<Product> {
    self
      .services
      .store
      .find_product(product_id)
      .await?
      .ok_or_else(|| MarketError::NotFound(format!("Product {}", product_id)))
  }

  #[instrument(name = "Marketplace::farmer_dashboard", skip(self), err(Display))]
  pub async fn farmer_dashboard(&self, user_id: Uuid) -> Result<FarmerDashboard> {
    let store = &self.services.store;
    let profile = store
      .find_profile_by_user(user_id)
      .await?
      .ok_or(MarketError::ProfileRequired)?;
    let products = store.list_products_by_farmer(profile.id).await?;
    let orders = store.list_orders_for_farmer(profile.id).await?;
    Ok(FarmerDashboard {
      profile,
      products,
      orders,
    })
  }

  pub async fn buyer_orders(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
    self.services.store.list_orders_by_buyer(buyer_id).await
  }

  /// Places an order for `requested_quantity` units of a product.
  ///
  /// On success the product's stock has been decremented by exactly that
  /// quantity and the order is pending/pending with the payment intent id as
  /// its reference. On any failure nothing was written.
  #[instrument(name = "Marketplace::place_order", skip(self), err(Display))]
  pub async fn place_order(&self, buyer_id: Uuid, product_id: Uuid, requested_quantity: i64) -> Result<PlacedOrder> {
    let ctx_data = ContextData::new(PlaceOrderCtxData::new(
      self.services.clone(),
      buyer_id,
      product_id,
      requested_quantity,
    ));
    let run = run_to_completion(&self.pipelines.place_order, ctx_data.clone(), "order placement").await;

    let mut guard = ctx_data.write();
    // A reservation still held here means the run ended early; dropping it
    // rolls back.
    drop(guard.reservation.take());
    run?;

    let order = guard.order.take().ok_or_else(|| missing_result("order placement", "order"))?;
    let client_secret = guard
      .payment_intent
      .take()
      .map(|intent| intent.client_secret)
      .ok_or_else(|| missing_result("order placement", "payment_intent"))?;
    Ok(PlacedOrder { order, client_secret })
  }

  /// Verifies and applies a payment processor notification.
  ///
  /// `InvalidSignature`/`InvalidPayload` mean the notification was rejected
  /// before anything was looked up. `OrderNotFound` means it was genuine but
  /// refers to no local order.
  #[instrument(name = "Marketplace::handle_payment_notification", skip_all, fields(payload_len = payload.len()), err(Display))]
  pub async fn handle_payment_notification(
    &self,
    payload: &[u8],
    signature_header: Option<&str>,
  ) -> Result<ReconciliationOutcome> {
    let ctx_data = ContextData::new(ReconciliationCtxData {
      services: self.services.clone(),
      payload: payload.to_vec(),
      signature_header: signature_header.map(str::to_string),
      event: None,
      order: None,
      outcome: None,
    });
    run_to_completion(&self.pipelines.reconciliation, ctx_data.clone(), "payment reconciliation").await?;
    let outcome = ctx_data.write().outcome.take();
    outcome.ok_or_else(|| missing_result("payment reconciliation", "outcome"))
  }
}
