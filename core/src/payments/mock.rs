// core/src/payments/mock.rs

use crate::payments::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Stand-in processor for development and tests.
///
/// Issues `mock_pi_<uuid>` intents. `reject_requests(true)` makes every
/// following request fail, and every request is remembered for inspection.
#[derive(Debug, Default)]
pub struct MockGateway {
  reject: AtomicBool,
  latency: Duration,
  requests: Mutex<Vec<PaymentIntentRequest>>,
}

impl MockGateway {
  pub fn new() -> Self {
    Self::default()
  }

  /// Simulated network latency per request.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn reject_requests(&self, reject: bool) {
    self.reject.store(reject, Ordering::SeqCst);
  }

  pub fn requests(&self) -> Vec<PaymentIntentRequest> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  #[instrument(name = "MockGateway::create_payment_intent", skip_all, fields(amount = request.amount_minor, currency = %request.currency))]
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError> {
    self.requests.lock().push(request.clone());
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }

    if self.reject.load(Ordering::SeqCst) {
      return Err(PaymentError::Rejected("mock processor configured to reject".to_string()));
    }
    if request.amount_minor <= 0 {
      return Err(PaymentError::Rejected("amount must be greater than zero".to_string()));
    }

    let intent_id = format!("mock_pi_{}", Uuid::new_v4().simple());
    info!(payment_intent_id = %intent_id, "Mock payment intent created.");
    Ok(PaymentIntent {
      client_secret: format!("{}_secret_{}", intent_id, Uuid::new_v4().simple()),
      id: intent_id,
      amount_minor: request.amount_minor,
      currency: request.currency.clone(),
    })
  }
}
