// core/src/store/postgres.rs

use crate::error::{MarketError, Result};
use crate::models::{
  FarmerProfile, NewFarmerProfile, NewOrder, NewProduct, NewUser, Order, OrderStatus, PaymentStatus, Product,
  ProductCategory, User,
};
use crate::store::{MarketStore, StockReservation};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, farmer_id, name, description, price, quantity, category, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Clone)]
pub struct PgMarketStore {
  pool: PgPool,
}

impl PgMarketStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPool::connect(database_url).await?;
    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Applies the embedded migrations under `core/migrations`.
  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| MarketError::Internal(format!("Migration failed: {}", e)))?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl MarketStore for PgMarketStore {
  async fn insert_user(&self, user: NewUser) -> Result<User> {
    sqlx::query_as::<_, User>(
      "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4)
       RETURNING id, username, email, password_hash, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        MarketError::validation("username", "A user with that username already exists")
      } else {
        MarketError::Database(e)
      }
    })
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, username, email, password_hash, created_at FROM users WHERE lower(username) = lower($1)",
    )
    .bind(username)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  async fn username_exists(&self, username: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(username) = lower($1))")
      .bind(username)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  async fn insert_profile(&self, user_id: Uuid, profile: &NewFarmerProfile) -> Result<FarmerProfile> {
    sqlx::query_as::<_, FarmerProfile>(
      "INSERT INTO farmer_profiles (id, user_id, phone_number, location, farm_size) VALUES ($1, $2, $3, $4, $5)
       RETURNING id, user_id, phone_number, location, farm_size, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&profile.phone_number)
    .bind(profile.location.trim())
    .bind(profile.farm_size)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        MarketError::ProfileExists
      } else {
        MarketError::Database(e)
      }
    })
  }

  async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<FarmerProfile>> {
    let profile = sqlx::query_as::<_, FarmerProfile>(
      "SELECT id, user_id, phone_number, location, farm_size, created_at, updated_at
       FROM farmer_profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(profile)
  }

  async fn insert_product(&self, farmer_id: Uuid, product: &NewProduct, category: ProductCategory) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
      "INSERT INTO products (id, farmer_id, name, description, price, quantity, category)
       VALUES ($1, $2, $3, $4, $5, $6, $7)
       RETURNING id, farmer_id, name, description, price, quantity, category, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(farmer_id)
    .bind(product.name.trim())
    .bind(&product.description)
    .bind(product.price)
    .bind(product.quantity)
    .bind(category)
    .fetch_one(&self.pool)
    .await?;
    Ok(product)
  }

  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&query)
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let query = format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS);
    let products = sqlx::query_as::<_, Product>(&query).fetch_all(&self.pool).await?;
    Ok(products)
  }

  async fn list_products_by_farmer(&self, farmer_id: Uuid) -> Result<Vec<Product>> {
    let query = format!(
      "SELECT {} FROM products WHERE farmer_id = $1 ORDER BY created_at DESC",
      PRODUCT_COLUMNS
    );
    let products = sqlx::query_as::<_, Product>(&query)
      .bind(farmer_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "SELECT id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference,
              created_at, updated_at
       FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "SELECT id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference,
              created_at, updated_at
       FROM orders WHERE payment_reference = $1",
    )
    .bind(reference)
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  async fn list_orders_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference,
              created_at, updated_at
       FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC",
    )
    .bind(buyer_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  async fn list_orders_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT o.id, o.buyer_id, o.product_id, o.quantity, o.total_price, o.status, o.payment_status,
              o.payment_reference, o.created_at, o.updated_at
       FROM orders o JOIN products p ON p.id = o.product_id
       WHERE p.farmer_id = $1 ORDER BY o.created_at DESC",
    )
    .bind(farmer_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  #[instrument(name = "PgMarketStore::update_order_state", skip(self))]
  async fn update_order_state(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
  ) -> Result<Option<Order>> {
    let status = status.reconcile_with(payment_status);
    // Conditional on the current state so a replayed update matches no row.
    let updated = sqlx::query_as::<_, Order>(
      "UPDATE orders SET status = $2, payment_status = $3, updated_at = now()
       WHERE id = $1 AND (status <> $2 OR payment_status <> $3)
       RETURNING id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference,
                 created_at, updated_at",
    )
    .bind(order_id)
    .bind(status)
    .bind(payment_status)
    .fetch_optional(&self.pool)
    .await?;

    if updated.is_none() && self.find_order(order_id).await?.is_none() {
      return Err(MarketError::NotFound(format!("Order {}", order_id)));
    }
    Ok(updated)
  }

  #[instrument(name = "PgMarketStore::reserve_stock", skip(self))]
  async fn reserve_stock(&self, product_id: Uuid) -> Result<Option<Box<dyn StockReservation>>> {
    let mut tx = self.pool.begin().await?;
    let query = format!("SELECT {} FROM products WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&query)
      .bind(product_id)
      .fetch_optional(&mut *tx)
      .await?;

    let Some(product) = product else {
      tx.rollback().await?;
      return Ok(None);
    };
    debug!(available = product.quantity, "Product row locked.");
    Ok(Some(Box::new(PgStockReservation {
      product,
      tx: Mutex::new(tx),
    })))
  }
}

/// Holds the `FOR UPDATE` row lock until the transaction ends. Dropping it
/// without committing rolls back.
struct PgStockReservation {
  product: Product,
  tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait]
impl StockReservation for PgStockReservation {
  fn product(&self) -> &Product {
    &self.product
  }

  async fn commit(self: Box<Self>, order: NewOrder) -> Result<Order> {
    let PgStockReservation { product, tx } = *self;
    let mut tx = tx.into_inner();

    let inserted = sqlx::query_as::<_, Order>(
      "INSERT INTO orders (id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
       RETURNING id, buyer_id, product_id, quantity, total_price, status, payment_status, payment_reference,
                 created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(order.buyer_id)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.total_price)
    .bind(OrderStatus::Pending)
    .bind(PaymentStatus::Pending)
    .bind(&order.payment_reference)
    .fetch_one(&mut *tx)
    .await?;

    let decremented = sqlx::query(
      "UPDATE products SET quantity = quantity - $2, updated_at = now() WHERE id = $1 AND quantity >= $2",
    )
    .bind(order.product_id)
    .bind(order.quantity)
    .execute(&mut *tx)
    .await?;

    if decremented.rows_affected() != 1 {
      tx.rollback().await?;
      return Err(MarketError::InsufficientStock {
        requested: order.quantity,
        available: product.quantity,
      });
    }

    tx.commit().await?;
    Ok(inserted)
  }

  async fn release(self: Box<Self>) -> Result<()> {
    self.tx.into_inner().rollback().await?;
    Ok(())
  }
}
