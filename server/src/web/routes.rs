// server/src/web/routes.rs

use crate::state::AppState;
use crate::web::handlers::{auth_handlers, order_handlers, product_handlers, profile_handlers, webhook_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let config = &app_state.config;
  HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "store": if config.database_url.is_some() { "postgres" } else { "memory" },
    "payments": if config.stripe_secret_key.is_some() { "stripe" } else { "mock" },
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler)),
      )
      .route("/profile", web::post().to(profile_handlers::setup_profile_handler))
      .route("/dashboard", web::get().to(profile_handlers::dashboard_handler))
      .service(
        web::scope("/products")
          .service(
            web::resource("")
              .route(web::get().to(product_handlers::list_products_handler))
              .route(web::post().to(product_handlers::add_product_handler)),
          )
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}/orders", web::post().to(order_handlers::place_order_handler)),
      )
      .route("/orders", web::get().to(order_handlers::list_orders_handler))
      .service(
        web::scope("/webhooks").route("/payments", web::post().to(webhook_handlers::payment_webhook_handler)),
      ),
  );
}
