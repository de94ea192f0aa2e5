// core/src/payments/stripe.rs

use crate::payments::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Creates payment intents through the Stripe REST API.
#[derive(Clone)]
pub struct StripeGateway {
  client: Client,
  api_base: String,
  secret_key: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
  id: String,
  client_secret: Option<String>,
  amount: i64,
  currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: Option<String>,
  #[serde(rename = "type")]
  kind: Option<String>,
}

impl StripeGateway {
  pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self, PaymentError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| PaymentError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      api_base: api_base.into().trim_end_matches('/').to_string(),
      secret_key: secret_key.into(),
    })
  }

  fn form(request: &PaymentIntentRequest) -> Vec<(&'static str, String)> {
    vec![
      ("amount", request.amount_minor.to_string()),
      ("currency", request.currency.clone()),
      ("metadata[product_id]", request.metadata.product_id.to_string()),
      ("metadata[quantity]", request.metadata.quantity.to_string()),
      ("metadata[buyer_id]", request.metadata.buyer_id.to_string()),
    ]
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "StripeGateway::create_payment_intent", skip_all, fields(amount = request.amount_minor, currency = %request.currency))]
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError> {
    let url = format!("{}/v1/payment_intents", self.api_base);
    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.secret_key)
      .form(&Self::form(request))
      .send()
      .await
      .map_err(|e| PaymentError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => format!(
          "{} ({})",
          envelope.error.message.unwrap_or_else(|| "no message".to_string()),
          envelope.error.kind.unwrap_or_else(|| status.to_string())
        ),
        Err(_) => format!("HTTP {}", status),
      };
      warn!(%status, %message, "Processor rejected payment intent.");
      return Err(PaymentError::Rejected(message));
    }

    let intent: IntentResponse = response
      .json()
      .await
      .map_err(|e| PaymentError::Response(e.to_string()))?;
    let client_secret = intent
      .client_secret
      .ok_or_else(|| PaymentError::Response("payment intent has no client_secret".to_string()))?;

    info!(payment_intent_id = %intent.id, "Payment intent created.");
    Ok(PaymentIntent {
      id: intent.id,
      client_secret,
      amount_minor: intent.amount,
      currency: intent.currency,
    })
  }
}
