// server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use farmgate::MarketError;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Receives payment processor notifications.
///
/// Answers 200 for everything the processor should not retry, including
/// genuine events about orders this service does not know. Only signature
/// and payload verification failures are rejected.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(payload_len = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok());

  match app_state
    .market
    .handle_payment_notification(&body, signature_header)
    .await
  {
    Ok(outcome) => {
      info!(?outcome, "Payment notification processed.");
      Ok(HttpResponse::Ok().json(json!({ "received": true, "result": outcome })))
    }
    Err(MarketError::OrderNotFound(reference)) => {
      warn!(%reference, "Payment notification for an unknown order; acknowledging.");
      Ok(HttpResponse::Ok().json(json!({ "received": true, "result": { "outcome": "order_not_found" } })))
    }
    Err(e) => Err(e.into()),
  }
}
