// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Signing secret used when none is configured and payments are mocked.
pub const LOCAL_WEBHOOK_SECRET: &str = "whsec_local_development";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs against the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,

  pub payment_currency: String,
  /// `None` uses the mock gateway.
  pub stripe_secret_key: Option<String>,
  pub stripe_api_base: String,
  pub stripe_webhook_secret: String,
  pub webhook_tolerance_secs: u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      database_max_connections: 10,
      run_migrations: true,
      payment_currency: "usd".to_string(),
      stripe_secret_key: None,
      stripe_api_base: farmgate::payments::stripe::DEFAULT_API_BASE.to_string(),
      stripe_webhook_secret: LOCAL_WEBHOOK_SECRET.to_string(),
      webhook_tolerance_secs: 300,
    }
  }
}

fn parse_var<T>(var_name: &str, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    Err(_) => Ok(default),
  }
}

fn optional_var(var_name: &str) -> Option<String> {
  env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    let defaults = AppConfig::default();

    let stripe_secret_key = optional_var("STRIPE_SECRET_KEY");
    let stripe_webhook_secret = match (optional_var("STRIPE_WEBHOOK_SECRET"), &stripe_secret_key) {
      (Some(secret), _) => secret,
      (None, Some(_)) => {
        return Err(AppError::Config(
          "STRIPE_WEBHOOK_SECRET is required when STRIPE_SECRET_KEY is set".to_string(),
        ))
      }
      (None, None) => {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; using the local development secret.");
        defaults.stripe_webhook_secret
      }
    };

    let config = Self {
      server_host: optional_var("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port: parse_var("SERVER_PORT", defaults.server_port)?,
      database_url: optional_var("DATABASE_URL"),
      database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
      run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations)?,
      payment_currency: optional_var("PAYMENT_CURRENCY")
        .map(|c| c.trim().to_ascii_lowercase())
        .unwrap_or(defaults.payment_currency),
      stripe_secret_key,
      stripe_api_base: optional_var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
      stripe_webhook_secret,
      webhook_tolerance_secs: parse_var("WEBHOOK_TOLERANCE_SECS", defaults.webhook_tolerance_secs)?,
    };

    // Secrets are never logged.
    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      database = config.database_url.is_some(),
      stripe = config.stripe_secret_key.is_some(),
      currency = %config.payment_currency,
      "Application configuration loaded."
    );
    Ok(config)
  }
}
