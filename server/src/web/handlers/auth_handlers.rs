// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use farmgate::models::Registration;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub username: String,
  pub password: String,
}

#[instrument(
    name = "handler::register",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<Registration>,
) -> Result<HttpResponse, AppError> {
  let user = app_state.market.register_user(req_payload.into_inner()).await?;
  info!(user_id = %user.id, "Registration successful.");

  Ok(HttpResponse::Created().json(json!({
      "message": "Registration successful.",
      "user": user,
  })))
}

/// Checks credentials and returns the user id the auth layer should forward
/// as `X-User-ID`.
#[instrument(
    name = "handler::login",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .market
    .authenticate(&req_payload.username, &req_payload.password)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
      "user_id": user.id,
      "username": user.username,
  })))
}
