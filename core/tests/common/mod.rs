// tests/common/mod.rs
#![allow(dead_code)]

use farmgate::models::{NewFarmerProfile, NewProduct, Product, Registration, User};
use farmgate::payments::PAYMENT_SUCCEEDED;
use farmgate::workflow::{ContextData, Handler, PipelineControl, WorkflowError};
use farmgate::{InMemoryStore, MarketSettings, Marketplace, MockGateway};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::Level;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Workflow engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TestError {
  #[error("workflow error: {0}")]
  Workflow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<WorkflowError> for TestError {
  fn from(err: WorkflowError) -> Self {
    TestError::Workflow(format!("{:?}", err))
  }
}

type TestHandlerFuture = Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>;

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| -> TestHandlerFuture {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| -> TestHandlerFuture {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err::<PipelineControl, _>(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Marketplace fixtures ---
pub struct TestMarket {
  pub market: Marketplace,
  pub store: Arc<InMemoryStore>,
  pub gateway: Arc<MockGateway>,
}

pub fn test_market() -> TestMarket {
  let store = Arc::new(InMemoryStore::new());
  let gateway = Arc::new(MockGateway::new());
  let settings = MarketSettings {
    webhook_secret: WEBHOOK_SECRET.to_string(),
    ..MarketSettings::default()
  };
  TestMarket {
    market: Marketplace::new(store.clone(), gateway.clone(), settings),
    store,
    gateway,
  }
}

pub fn registration(username: &str) -> Registration {
  Registration {
    username: username.to_string(),
    email: format!("{}@example.com", username),
    password: "s3cure-passw0rd".to_string(),
    password_confirmation: "s3cure-passw0rd".to_string(),
  }
}

pub async fn register(market: &Marketplace, username: &str) -> User {
  market.register_user(registration(username)).await.unwrap()
}

pub fn profile_input() -> NewFarmerProfile {
  NewFarmerProfile {
    phone_number: "254700123456".to_string(),
    location: "Nakuru".to_string(),
    farm_size: Decimal::new(1250, 2),
  }
}

pub fn listing(price: Decimal, quantity: i32) -> NewProduct {
  NewProduct {
    name: "Sukuma wiki".to_string(),
    description: "Fresh collard greens, bundled.".to_string(),
    price,
    quantity,
    category: "vegetables".to_string(),
  }
}

/// A registered farmer with a profile and one listed product.
pub async fn farmer_with_product(market: &Marketplace, username: &str, price: Decimal, quantity: i32) -> (User, Product) {
  let farmer = register(market, username).await;
  market.setup_profile(farmer.id, profile_input()).await.unwrap();
  let product = market.add_product(farmer.id, listing(price, quantity)).await.unwrap();
  (farmer, product)
}

pub fn event_payload(event_type: &str, intent_id: &str) -> Vec<u8> {
  serde_json::json!({
    "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
    "type": event_type,
    "data": { "object": { "id": intent_id, "object": "payment_intent" } }
  })
  .to_string()
  .into_bytes()
}

/// A `payment_intent.succeeded` notification signed with the test secret.
pub fn signed_success(market: &Marketplace, intent_id: &str) -> (Vec<u8>, String) {
  signed_event(market, PAYMENT_SUCCEEDED, intent_id)
}

pub fn signed_event(market: &Marketplace, event_type: &str, intent_id: &str) -> (Vec<u8>, String) {
  let payload = event_payload(event_type, intent_id);
  let header = market
    .webhook_verifier()
    .sign(&payload, chrono::Utc::now().timestamp());
  (payload, header)
}
