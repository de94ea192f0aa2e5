// core/src/lib.rs

//! Farmgate: a farmers' marketplace core.
//!
//! Farmers register, set up a profile and list produce; buyers place orders
//! that reserve stock and open a payment intent with the processor; signed
//! payment notifications settle the orders.
//!
//! Every write runs as a named-step [`workflow::Pipeline`]. Storage and the
//! payment processor sit behind the [`store::MarketStore`] and
//! [`payments::PaymentGateway`] traits, with in-memory and mock
//! implementations alongside the PostgreSQL and Stripe ones.

pub mod error;
pub mod marketplace;
pub mod models;
pub mod payments;
pub mod pipelines;
pub mod services;
pub mod store;
pub mod workflow;

pub use crate::error::{MarketError, Result};
pub use crate::marketplace::{FarmerDashboard, MarketSettings, Marketplace, PlacedOrder};
pub use crate::payments::{MockGateway, PaymentGateway, StripeGateway, WebhookVerifier};
pub use crate::pipelines::contexts::ReconciliationOutcome;
pub use crate::store::{InMemoryStore, MarketStore, PgMarketStore, StockReservation};
pub use crate::workflow::{ContextData, Pipeline, PipelineControl, PipelineResult};
