// server/src/web/handlers/extractors.rs

use crate::errors::AppError;
use actix_web::{FromRequest, HttpRequest};
use farmgate::MarketError;
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Identity asserted by the fronting auth layer through `X-User-ID`.
///
/// Only the header's shape is checked here; operations that need the user
/// to exist check that themselves.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    match user_id {
      Some(user_id) => futures_util::future::ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("Missing or invalid X-User-ID header.");
        futures_util::future::ready(Err(AppError::Market(MarketError::Unauthenticated(
          "Missing or invalid X-User-ID header".to_string(),
        ))))
      }
    }
  }
}
