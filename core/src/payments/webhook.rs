// core/src/payments/webhook.rs

//! Verification of signed payment notifications.
//!
//! The signature header looks like `t=1717000000,v1=5257a8...,v1=...`. Each
//! `v1` value is a hex HMAC-SHA256 of `"{t}.{payload}"` keyed with the shared
//! signing secret; any one matching is enough.

use crate::error::{MarketError, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Event type that settles an order.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
  pub id: String,
  #[serde(rename = "type")]
  pub event_type: String,
  pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
  pub object: serde_json::Value,
}

impl PaymentEvent {
  /// Id of the object the event is about; for payment intent events this is
  /// the intent id stored as the order's payment reference.
  pub fn object_id(&self) -> Option<&str> {
    self.data.object.get("id").and_then(serde_json::Value::as_str)
  }

  pub fn is_payment_success(&self) -> bool {
    self.event_type == PAYMENT_SUCCEEDED
  }
}

#[derive(Clone)]
pub struct WebhookVerifier {
  secret: Vec<u8>,
  tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WebhookVerifier")
      .field("tolerance", &self.tolerance)
      .finish_non_exhaustive()
  }
}

struct SignatureHeader {
  timestamp: i64,
  signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader> {
  let mut timestamp = None;
  let mut signatures = Vec::new();

  for part in header.split(',') {
    let Some((key, value)) = part.trim().split_once('=') else {
      continue;
    };
    match key {
      "t" => {
        let parsed = value
          .parse::<i64>()
          .map_err(|_| MarketError::InvalidSignature("malformed timestamp".to_string()))?;
        timestamp = Some(parsed);
      }
      // Undecodable entries just fail to match.
      "v1" => signatures.extend(hex::decode(value).ok()),
      _ => {}
    }
  }

  let timestamp = timestamp.ok_or_else(|| MarketError::InvalidSignature("no timestamp in header".to_string()))?;
  if signatures.is_empty() {
    return Err(MarketError::InvalidSignature("no v1 signature in header".to_string()));
  }
  Ok(SignatureHeader { timestamp, signatures })
}

impl WebhookVerifier {
  pub fn new(secret: impl AsRef<[u8]>) -> Self {
    Self {
      secret: secret.as_ref().to_vec(),
      tolerance: DEFAULT_TOLERANCE,
    }
  }

  pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
    self.tolerance = tolerance;
    self
  }

  pub fn tolerance(&self) -> Duration {
    self.tolerance
  }

  fn mac_for(&self, payload: &[u8], timestamp: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
  }

  /// Builds a header that `verify_at(payload, header, timestamp)` accepts.
  pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
    let digest = self.mac_for(payload, timestamp).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
  }

  /// Checks the header against the current time and parses the event.
  pub fn verify(&self, payload: &[u8], header: &str) -> Result<PaymentEvent> {
    self.verify_at(payload, header, Utc::now().timestamp())
  }

  pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<PaymentEvent> {
    let parsed = parse_header(header)?;

    let age = now.abs_diff(parsed.timestamp);
    if age > self.tolerance.as_secs() {
      return Err(MarketError::InvalidSignature(format!(
        "timestamp outside tolerance ({}s old)",
        now - parsed.timestamp
      )));
    }

    let mac = self.mac_for(payload, parsed.timestamp);
    // verify_slice compares in constant time.
    let matched = parsed.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
      return Err(MarketError::InvalidSignature("no signature matches the payload".to_string()));
    }
    debug!(timestamp = parsed.timestamp, "Notification signature verified.");

    serde_json::from_slice::<PaymentEvent>(payload).map_err(|e| MarketError::InvalidPayload(e.to_string()))
  }
}
