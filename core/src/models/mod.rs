// core/src/models/mod.rs

//! Persisted records and the validated inputs that create them.

pub mod order;
pub mod product;
pub mod profile;
pub mod user;

pub use order::{MAX_TOTAL_PRICE, NewOrder, Order, OrderStatus, PaymentStatus};
pub use product::{MAX_PRICE, NewProduct, Product, ProductCategory};
pub use profile::{FarmerProfile, NewFarmerProfile};
pub use user::{NewUser, Registration, User};
