// server/src/state.rs

use crate::config::AppConfig;
use farmgate::Marketplace;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub market: Arc<Marketplace>,
  pub config: Arc<AppConfig>,
}
