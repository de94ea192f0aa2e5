// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use farmgate::MarketError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Market(#[from] MarketError),

  #[error("Configuration Error: {0}")]
  Config(String),
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    AppError::Market(MarketError::Database(err))
  }
}

impl AppError {
  fn kind(&self) -> &'static str {
    match self {
      AppError::Market(e) => e.kind(),
      AppError::Config(_) => "configuration_error",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    let AppError::Market(market_err) = self else {
      return StatusCode::INTERNAL_SERVER_ERROR;
    };
    match market_err {
      MarketError::Validation { .. }
      | MarketError::InvalidQuantity
      | MarketError::InvalidSignature(_)
      | MarketError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
      MarketError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      MarketError::NotFound(_) | MarketError::OrderNotFound(_) => StatusCode::NOT_FOUND,
      MarketError::InsufficientStock { .. } | MarketError::ProfileRequired | MarketError::ProfileExists => {
        StatusCode::CONFLICT
      }
      MarketError::PaymentProcessor(_) => StatusCode::BAD_GATEWAY,
      MarketError::Database(_) | MarketError::Workflow { .. } | MarketError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let body = match self {
      AppError::Market(MarketError::Validation { field, message }) => {
        json!({ "error": self.kind(), "field": field, "message": message })
      }
      AppError::Market(MarketError::InsufficientStock { requested, available }) => json!({
        "error": self.kind(),
        "message": self.to_string(),
        "requested": requested,
        "available": available,
      }),
      // Internal details stay in the logs.
      _ if status.is_server_error() && status != StatusCode::BAD_GATEWAY => {
        json!({ "error": self.kind(), "message": "An internal error occurred" })
      }
      _ => json!({ "error": self.kind(), "message": self.to_string() }),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
