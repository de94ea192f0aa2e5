// tests/accounts_catalog_tests.rs
mod common;

use common::*;
use farmgate::models::{NewFarmerProfile, ProductCategory};
use farmgate::MarketError;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn field_of(err: &MarketError) -> &str {
  match err {
    MarketError::Validation { field, .. } => field,
    other => panic!("Expected a validation error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registration_hashes_password_and_authenticates() {
  setup_tracing();
  let t = test_market();
  let user = register(&t.market, "wanjiru").await;

  assert_eq!(user.username, "wanjiru");
  assert_ne!(user.password_hash, "s3cure-passw0rd");
  assert!(user.password_hash.starts_with("$argon2"));

  let authed = t.market.authenticate("wanjiru", "s3cure-passw0rd").await.unwrap();
  assert_eq!(authed.id, user.id);

  let err = t.market.authenticate("wanjiru", "wrong-password").await.unwrap_err();
  assert!(matches!(err, MarketError::Unauthenticated(_)));
  let err = t.market.authenticate("nobody", "s3cure-passw0rd").await.unwrap_err();
  assert!(matches!(err, MarketError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_duplicate_username_is_rejected_case_insensitively() {
  setup_tracing();
  let t = test_market();
  register(&t.market, "wanjiru").await;

  let err = t.market.register_user(registration("Wanjiru")).await.unwrap_err();
  assert_eq!(field_of(&err), "username");
}

#[tokio::test]
async fn test_non_ascii_usernames_collide_case_insensitively() {
  setup_tracing();
  let t = test_market();
  register(&t.market, "Ömer").await;

  let err = t.market.register_user(registration("ömer")).await.unwrap_err();
  assert_eq!(field_of(&err), "username");

  let found = t.market.authenticate("ÖMER", "s3cure-passw0rd").await.unwrap();
  assert_eq!(found.username, "Ömer");
}

#[tokio::test]
async fn test_profile_location_is_stored_trimmed() {
  setup_tracing();
  let t = test_market();
  let farmer = register(&t.market, "wanjiru").await;

  let mut input = profile_input();
  input.location = "  Nakuru  ".to_string();
  let profile = t.market.setup_profile(farmer.id, input).await.unwrap();
  assert_eq!(profile.location, "Nakuru");
}

#[tokio::test]
async fn test_registration_validation_reports_the_field() {
  setup_tracing();
  let t = test_market();

  let mut mismatched = registration("kamau");
  mismatched.password_confirmation = "something-else".to_string();
  let err = t.market.register_user(mismatched).await.unwrap_err();
  assert_eq!(field_of(&err), "password_confirmation");

  let mut bad_email = registration("kamau");
  bad_email.email = "not-an-email".to_string();
  let err = t.market.register_user(bad_email).await.unwrap_err();
  assert_eq!(field_of(&err), "email");
}

#[tokio::test]
async fn test_profile_setup_once_per_user() {
  setup_tracing();
  let t = test_market();
  let farmer = register(&t.market, "wanjiru").await;

  let profile = t.market.setup_profile(farmer.id, profile_input()).await.unwrap();
  assert_eq!(profile.user_id, farmer.id);
  assert_eq!(profile.farm_size, dec!(12.50));

  let err = t.market.setup_profile(farmer.id, profile_input()).await.unwrap_err();
  assert!(matches!(err, MarketError::ProfileExists));
}

#[tokio::test]
async fn test_profile_setup_validates_phone_and_user() {
  setup_tracing();
  let t = test_market();
  let farmer = register(&t.market, "wanjiru").await;

  let bad_phone = NewFarmerProfile {
    phone_number: "+254 700".to_string(),
    ..profile_input()
  };
  let err = t.market.setup_profile(farmer.id, bad_phone).await.unwrap_err();
  assert_eq!(field_of(&err), "phone_number");

  let err = t.market.setup_profile(Uuid::new_v4(), profile_input()).await.unwrap_err();
  assert!(matches!(err, MarketError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_listing_requires_a_profile() {
  setup_tracing();
  let t = test_market();
  let user = register(&t.market, "kamau").await;

  let err = t.market.add_product(user.id, listing(dec!(3.00), 4)).await.unwrap_err();
  assert!(matches!(err, MarketError::ProfileRequired));
  assert!(t.market.list_products().await.unwrap().is_empty());

  let err = t.market.farmer_dashboard(user.id).await.unwrap_err();
  assert!(matches!(err, MarketError::ProfileRequired));
}

#[tokio::test]
async fn test_listing_validation() {
  setup_tracing();
  let t = test_market();
  let farmer = register(&t.market, "wanjiru").await;
  t.market.setup_profile(farmer.id, profile_input()).await.unwrap();

  let err = t.market.add_product(farmer.id, listing(dec!(0), 4)).await.unwrap_err();
  assert_eq!(field_of(&err), "price");

  let err = t.market.add_product(farmer.id, listing(dec!(1.00), -1)).await.unwrap_err();
  assert_eq!(field_of(&err), "quantity");

  let err = t
    .market
    .add_product(farmer.id, listing(dec!(1000000000000000000000000000), 5))
    .await
    .unwrap_err();
  assert_eq!(field_of(&err), "price");

  let mut unknown_category = listing(dec!(1.00), 1);
  unknown_category.category = "spices".to_string();
  let err = t.market.add_product(farmer.id, unknown_category).await.unwrap_err();
  assert_eq!(field_of(&err), "category");
}

#[tokio::test]
async fn test_catalog_lists_newest_first_and_dashboard_shows_own_products() {
  setup_tracing();
  let t = test_market();
  let (farmer, first) = farmer_with_product(&t.market, "wanjiru", dec!(10.00), 5).await;
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let mut fruit = listing(dec!(0.50), 100);
  fruit.name = "Mangoes".to_string();
  fruit.category = "Fruits".to_string();
  let second = t.market.add_product(farmer.id, fruit).await.unwrap();
  assert_eq!(second.category, ProductCategory::Fruits);

  let (_other, foreign) = farmer_with_product(&t.market, "kamau", dec!(2.00), 1).await;

  let listed: Vec<Uuid> = t.market.list_products().await.unwrap().iter().map(|p| p.id).collect();
  assert_eq!(listed, vec![foreign.id, second.id, first.id]);

  let fetched = t.market.get_product(first.id).await.unwrap();
  assert_eq!(fetched.name, "Sukuma wiki");
  assert!(matches!(
    t.market.get_product(Uuid::new_v4()).await.unwrap_err(),
    MarketError::NotFound(_)
  ));

  let buyer = register(&t.market, "otieno").await;
  t.market.place_order(buyer.id, first.id, 2).await.unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  t.market.place_order(buyer.id, foreign.id, 1).await.unwrap();

  let dashboard = t.market.farmer_dashboard(farmer.id).await.unwrap();
  assert_eq!(dashboard.products.len(), 2);
  assert_eq!(dashboard.orders.len(), 1);
  assert_eq!(dashboard.orders[0].product_id, first.id);

  let orders = t.market.buyer_orders(buyer.id).await.unwrap();
  assert_eq!(orders.len(), 2);
  assert_eq!(orders[0].product_id, foreign.id);
}
