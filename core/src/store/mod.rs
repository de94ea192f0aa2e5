// core/src/store/mod.rs

//! Persistence port for users, profiles, products and orders.
//!
//! Every method that writes more than one row does so atomically. Stock
//! changes only happen through a [`StockReservation`], which serializes
//! check-and-decrement per product.

use crate::error::Result;
use crate::models::{
  FarmerProfile, NewFarmerProfile, NewOrder, NewProduct, NewUser, Order, OrderStatus, PaymentStatus, Product,
  ProductCategory, User,
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgMarketStore;

#[async_trait]
pub trait MarketStore: Send + Sync {
  /// Fails with a `username` validation error when the name is taken
  /// (compared case-insensitively).
  async fn insert_user(&self, user: NewUser) -> Result<User>;
  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;
  /// Case-insensitive lookup.
  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
  async fn username_exists(&self, username: &str) -> Result<bool> {
    Ok(self.find_user_by_username(username).await?.is_some())
  }

  /// Fails with `ProfileExists` when the user already has one.
  async fn insert_profile(&self, user_id: Uuid, profile: &NewFarmerProfile) -> Result<FarmerProfile>;
  async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<FarmerProfile>>;

  async fn insert_product(&self, farmer_id: Uuid, product: &NewProduct, category: ProductCategory) -> Result<Product>;
  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>>;
  /// Newest first.
  async fn list_products(&self) -> Result<Vec<Product>>;
  async fn list_products_by_farmer(&self, farmer_id: Uuid) -> Result<Vec<Product>>;

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>>;
  async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>>;
  /// Newest first.
  async fn list_orders_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>>;
  /// Orders placed against any product of the farmer, newest first.
  async fn list_orders_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>>;

  /// Writes the order's state, applying `OrderStatus::reconcile_with`.
  ///
  /// Returns `None` when the stored state already matched, so a repeated
  /// update changes nothing. Fails with `NotFound` for an unknown order.
  async fn update_order_state(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
  ) -> Result<Option<Order>>;

  /// Locks the product's stock for the caller until the reservation is
  /// committed, released or dropped. `None` when the product does not exist.
  ///
  /// Concurrent reservations of the same product wait for each other, so the
  /// stock seen through `StockReservation::product` stays current until the
  /// reservation ends.
  async fn reserve_stock(&self, product_id: Uuid) -> Result<Option<Box<dyn StockReservation>>>;
}

/// Exclusive hold on one product's stock.
#[async_trait]
pub trait StockReservation: Send + Sync {
  /// The product as it stood when the lock was taken.
  fn product(&self) -> &Product;

  /// Inserts the order and decrements stock by `order.quantity` as one unit,
  /// then releases the lock. Fails with `InsufficientStock` (and writes
  /// nothing) if the decrement would make stock negative.
  async fn commit(self: Box<Self>, order: NewOrder) -> Result<Order>;

  /// Releases the lock without writing anything.
  async fn release(self: Box<Self>) -> Result<()>;
}
