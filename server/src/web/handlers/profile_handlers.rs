// server/src/web/handlers/profile_handlers.rs

use actix_web::{web, HttpResponse};
use farmgate::models::NewFarmerProfile;
use tracing::instrument;

use super::extractors::AuthenticatedUser;
use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::setup_profile", skip(app_state, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn setup_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewFarmerProfile>,
) -> Result<HttpResponse, AppError> {
  let profile = app_state
    .market
    .setup_profile(auth_user.user_id, req_payload.into_inner())
    .await?;
  Ok(HttpResponse::Created().json(profile))
}

#[instrument(name = "handler::dashboard", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn dashboard_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let dashboard = app_state.market.farmer_dashboard(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(dashboard))
}
