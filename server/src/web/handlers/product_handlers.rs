// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use farmgate::models::NewProduct;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::extractors::AuthenticatedUser;
use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.market.list_products().await?;
  info!(count = products.len(), "Products listed.");

  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %*path))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.market.get_product(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(
    name = "handler::add_product",
    skip(app_state, req_payload),
    fields(user_id = %auth_user.user_id, name = %req_payload.name)
)]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .market
    .add_product(auth_user.user_id, req_payload.into_inner())
    .await?;
  Ok(HttpResponse::Created().json(json!({ "product": product })))
}
