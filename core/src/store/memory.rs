// core/src/store/memory.rs

//! Process-local store used when no database is configured, and by tests.

use crate::error::{MarketError, Result};
use crate::models::{
  FarmerProfile, NewFarmerProfile, NewOrder, NewProduct, NewUser, Order, OrderStatus, PaymentStatus, Product,
  ProductCategory, User,
};
use crate::store::{MarketStore, StockReservation};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
  users: HashMap<Uuid, User>,
  profiles: HashMap<Uuid, FarmerProfile>,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
  state: Arc<RwLock<MemoryState>>,
  // One async mutex per product; holding it is what a reservation means here.
  product_locks: Arc<parking_lot::Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn product_lock(&self, product_id: Uuid) -> Arc<Mutex<()>> {
    self.product_locks.lock().entry(product_id).or_default().clone()
  }
}

/// Same comparison as PostgreSQL's `lower(a) = lower(b)`.
fn same_username(a: &str, b: &str) -> bool {
  a.to_lowercase() == b.to_lowercase()
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
  rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
  rows
}

#[async_trait]
impl MarketStore for InMemoryStore {
  async fn insert_user(&self, user: NewUser) -> Result<User> {
    let mut state = self.state.write().await;
    if state.users.values().any(|u| same_username(&u.username, &user.username)) {
      return Err(MarketError::validation("username", "A user with that username already exists"));
    }
    let row = User {
      id: Uuid::new_v4(),
      username: user.username,
      email: user.email,
      password_hash: user.password_hash,
      created_at: Utc::now(),
    };
    state.users.insert(row.id, row.clone());
    Ok(row)
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    Ok(self.state.read().await.users.get(&user_id).cloned())
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    let state = self.state.read().await;
    Ok(state.users.values().find(|u| same_username(&u.username, username)).cloned())
  }

  async fn insert_profile(&self, user_id: Uuid, profile: &NewFarmerProfile) -> Result<FarmerProfile> {
    let mut state = self.state.write().await;
    if !state.users.contains_key(&user_id) {
      return Err(MarketError::NotFound(format!("User {}", user_id)));
    }
    if state.profiles.values().any(|p| p.user_id == user_id) {
      return Err(MarketError::ProfileExists);
    }
    let now = Utc::now();
    let row = FarmerProfile {
      id: Uuid::new_v4(),
      user_id,
      phone_number: profile.phone_number.clone(),
      location: profile.location.trim().to_string(),
      farm_size: profile.farm_size,
      created_at: now,
      updated_at: now,
    };
    state.profiles.insert(row.id, row.clone());
    Ok(row)
  }

  async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<FarmerProfile>> {
    let state = self.state.read().await;
    Ok(state.profiles.values().find(|p| p.user_id == user_id).cloned())
  }

  async fn insert_product(&self, farmer_id: Uuid, product: &NewProduct, category: ProductCategory) -> Result<Product> {
    let mut state = self.state.write().await;
    if !state.profiles.contains_key(&farmer_id) {
      return Err(MarketError::ProfileRequired);
    }
    let now = Utc::now();
    let row = Product {
      id: Uuid::new_v4(),
      farmer_id,
      name: product.name.trim().to_string(),
      description: product.description.clone(),
      price: product.price,
      quantity: product.quantity,
      category,
      created_at: now,
      updated_at: now,
    };
    state.products.insert(row.id, row.clone());
    Ok(row)
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    Ok(self.state.read().await.products.get(&product_id).cloned())
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let rows = self.state.read().await.products.values().cloned().collect();
    Ok(newest_first(rows, |p: &Product| p.created_at))
  }

  async fn list_products_by_farmer(&self, farmer_id: Uuid) -> Result<Vec<Product>> {
    let state = self.state.read().await;
    let rows = state.products.values().filter(|p| p.farmer_id == farmer_id).cloned().collect();
    Ok(newest_first(rows, |p: &Product| p.created_at))
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.state.read().await.orders.get(&order_id).cloned())
  }

  async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
    let state = self.state.read().await;
    Ok(
      state
        .orders
        .values()
        .find(|o| o.payment_reference.as_deref() == Some(reference))
        .cloned(),
    )
  }

  async fn list_orders_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
    let state = self.state.read().await;
    let rows = state.orders.values().filter(|o| o.buyer_id == buyer_id).cloned().collect();
    Ok(newest_first(rows, |o: &Order| o.created_at))
  }

  async fn list_orders_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>> {
    let state = self.state.read().await;
    let rows = state
      .orders
      .values()
      .filter(|o| {
        state
          .products
          .get(&o.product_id)
          .is_some_and(|p| p.farmer_id == farmer_id)
      })
      .cloned()
      .collect();
    Ok(newest_first(rows, |o: &Order| o.created_at))
  }

  async fn update_order_state(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
  ) -> Result<Option<Order>> {
    let mut state = self.state.write().await;
    let order = state
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| MarketError::NotFound(format!("Order {}", order_id)))?;

    let status = status.reconcile_with(payment_status);
    if order.status == status && order.payment_status == payment_status {
      return Ok(None);
    }
    order.status = status;
    order.payment_status = payment_status;
    order.updated_at = Utc::now();
    Ok(Some(order.clone()))
  }

  #[instrument(name = "InMemoryStore::reserve_stock", skip(self))]
  async fn reserve_stock(&self, product_id: Uuid) -> Result<Option<Box<dyn StockReservation>>> {
    let guard = self.product_lock(product_id).lock_owned().await;
    // Read only after the lock is held so the snapshot reflects every earlier commit.
    let Some(product) = self.find_product(product_id).await? else {
      return Ok(None);
    };
    debug!(available = product.quantity, "Stock reserved.");
    Ok(Some(Box::new(MemoryReservation {
      product,
      state: self.state.clone(),
      _guard: guard,
    })))
  }
}

struct MemoryReservation {
  product: Product,
  state: Arc<RwLock<MemoryState>>,
  _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StockReservation for MemoryReservation {
  fn product(&self) -> &Product {
    &self.product
  }

  async fn commit(self: Box<Self>, order: NewOrder) -> Result<Order> {
    let mut state = self.state.write().await;
    if state
      .orders
      .values()
      .any(|o| o.payment_reference.as_deref() == Some(order.payment_reference.as_str()))
    {
      return Err(MarketError::Internal(format!(
        "Payment reference '{}' already recorded",
        order.payment_reference
      )));
    }

    let now = Utc::now();
    let product = state
      .products
      .get_mut(&order.product_id)
      .ok_or_else(|| MarketError::NotFound(format!("Product {}", order.product_id)))?;
    if product.quantity < order.quantity {
      return Err(MarketError::InsufficientStock {
        requested: order.quantity,
        available: product.quantity,
      });
    }
    product.quantity -= order.quantity;
    product.updated_at = now;

    let row = Order {
      id: Uuid::new_v4(),
      buyer_id: order.buyer_id,
      product_id: order.product_id,
      quantity: order.quantity,
      total_price: order.total_price,
      status: OrderStatus::Pending,
      payment_status: PaymentStatus::Pending,
      payment_reference: Some(order.payment_reference),
      created_at: now,
      updated_at: now,
    };
    state.orders.insert(row.id, row.clone());
    Ok(row)
  }

  async fn release(self: Box<Self>) -> Result<()> {
    Ok(())
  }
}
