// core/src/error.rs

use crate::workflow::WorkflowError;
use thiserror::Error;

/// Every failure a marketplace operation can report.
///
/// Callers branch on the variant (or on `kind()`); nothing is collapsed into a
/// generic "something went wrong".
#[derive(Debug, Error)]
pub enum MarketError {
  #[error("Invalid {field}: {message}")]
  Validation { field: String, message: String },

  #[error("Quantity must be greater than zero")]
  InvalidQuantity,

  #[error("Not enough stock available (requested {requested}, available {available})")]
  InsufficientStock { requested: i32, available: i32 },

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("A farmer profile is required for this operation")]
  ProfileRequired,

  #[error("A farmer profile already exists for this user")]
  ProfileExists,

  #[error("Authentication Failed: {0}")]
  Unauthenticated(String),

  #[error("Payment Processing Error: {0}")]
  PaymentProcessor(String),

  #[error("Invalid webhook signature: {0}")]
  InvalidSignature(String),

  #[error("Invalid webhook payload: {0}")]
  InvalidPayload(String),

  #[error("No order for payment reference '{0}'")]
  OrderNotFound(String),

  #[error("Database Error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: WorkflowError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl MarketError {
  pub fn validation(field: &str, message: impl Into<String>) -> Self {
    MarketError::Validation {
      field: field.to_string(),
      message: message.into(),
    }
  }

  /// Stable machine-readable code for the failure kind.
  pub fn kind(&self) -> &'static str {
    match self {
      MarketError::Validation { .. } => "validation_error",
      MarketError::InvalidQuantity => "invalid_quantity",
      MarketError::InsufficientStock { .. } => "insufficient_stock",
      MarketError::NotFound(_) => "not_found",
      MarketError::ProfileRequired => "profile_required",
      MarketError::ProfileExists => "profile_exists",
      MarketError::Unauthenticated(_) => "unauthenticated",
      MarketError::PaymentProcessor(_) => "payment_processor_error",
      MarketError::InvalidSignature(_) => "invalid_signature",
      MarketError::InvalidPayload(_) => "invalid_payload",
      MarketError::OrderNotFound(_) => "order_not_found",
      MarketError::Database(_) => "database_error",
      MarketError::Workflow { .. } => "workflow_error",
      MarketError::Internal(_) => "internal_error",
    }
  }

  /// Webhook verification failures: terminal, never retried, never mutate state.
  pub fn is_verification_failure(&self) -> bool {
    matches!(self, MarketError::InvalidSignature(_) | MarketError::InvalidPayload(_))
  }
}

pub type Result<T, E = MarketError> = std::result::Result<T, E>;
