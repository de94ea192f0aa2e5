// server/src/lib.rs

//! HTTP surface for the farmgate marketplace.

pub mod config;
pub mod errors;
pub mod state;
pub mod web;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::state::AppState;
use farmgate::{InMemoryStore, MarketSettings, MarketStore, Marketplace, MockGateway, PaymentGateway, PgMarketStore, StripeGateway};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Connects the store and payment gateway named by `config`.
pub async fn build_state(config: AppConfig) -> Result<AppState> {
  let store: Arc<dyn MarketStore> = match &config.database_url {
    Some(database_url) => {
      let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
      tracing::info!("Connected to the database.");
      let store = PgMarketStore::new(pool);
      if config.run_migrations {
        store.migrate().await?;
      }
      Arc::new(store)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on restart.");
      Arc::new(InMemoryStore::new())
    }
  };

  let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
    Some(secret_key) => {
      let gateway = StripeGateway::new(secret_key.clone(), config.stripe_api_base.clone())
        .map_err(|e| AppError::Config(format!("Stripe client: {}", e)))?;
      Arc::new(gateway)
    }
    None => {
      tracing::warn!("STRIPE_SECRET_KEY not set; payment intents come from the mock gateway.");
      Arc::new(MockGateway::new())
    }
  };

  let settings = MarketSettings {
    currency: config.payment_currency.clone(),
    webhook_secret: config.stripe_webhook_secret.clone(),
    webhook_tolerance: Duration::from_secs(config.webhook_tolerance_secs),
  };

  Ok(AppState {
    market: Arc::new(Marketplace::new(store, gateway, settings)),
    config: Arc::new(config),
  })
}
