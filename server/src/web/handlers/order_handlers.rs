// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::extractors::AuthenticatedUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct PlaceOrderRequestPayload {
  pub quantity: i64,
}

#[instrument(
    name = "handler::place_order",
    skip(app_state, path, req_payload),
    fields(user_id = %auth_user.user_id, product_id = %*path, quantity = req_payload.quantity)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<PlaceOrderRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let placed = app_state
    .market
    .place_order(auth_user.user_id, path.into_inner(), req_payload.quantity)
    .await?;
  info!(order_id = %placed.order.id, "Order accepted; awaiting payment.");

  Ok(HttpResponse::Created().json(placed))
}

#[instrument(name = "handler::list_orders", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.market.buyer_orders(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
