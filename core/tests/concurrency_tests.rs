// tests/concurrency_tests.rs
mod common;

use common::*;
use farmgate::{InMemoryStore, MarketError, MarketSettings, Marketplace, MockGateway};
use futures_util::future::join_all;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_for_last_unit_sell_it_once() {
  setup_tracing();
  let t = test_market();
  let (_farmer, product) = farmer_with_product(&t.market, "wanjiru", dec!(10.00), 1).await;
  let buyer_a = register(&t.market, "buyer_a").await;
  let buyer_b = register(&t.market, "buyer_b").await;
  let (buyer_a, buyer_b, product_id) = (buyer_a.id, buyer_b.id, product.id);

  let market = Arc::new(t.market);
  let a = {
    let market = market.clone();
    tokio::spawn(async move { market.place_order(buyer_a, product_id, 1).await })
  };
  let b = {
    let market = market.clone();
    tokio::spawn(async move { market.place_order(buyer_b, product_id, 1).await })
  };
  let results = vec![a.await.unwrap(), b.await.unwrap()];

  let succeeded = results.iter().filter(|r| r.is_ok()).count();
  let short = results
    .iter()
    .filter(|r| matches!(r, Err(MarketError::InsufficientStock { requested: 1, available: 0 })))
    .count();
  assert_eq!(succeeded, 1);
  assert_eq!(short, 1);
  assert_eq!(market.get_product(product_id).await.unwrap().quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_orders_never_drive_stock_negative() {
  setup_tracing();
  // Latency in the processor call widens the window between stock check and write.
  let store = Arc::new(InMemoryStore::new());
  let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_millis(5)));
  let market = Arc::new(Marketplace::new(store, gateway, MarketSettings::default()));

  let (_farmer, product) = farmer_with_product(&market, "wanjiru", dec!(2.00), 10).await;
  let buyer = register(&market, "otieno").await;
  let (buyer_id, product_id) = (buyer.id, product.id);

  let attempts = (0..25).map(|_| {
    let market = market.clone();
    tokio::spawn(async move { market.place_order(buyer_id, product_id, 1).await })
  });
  let results = join_all(attempts).await;

  let mut placed = 0;
  for result in results {
    match result.unwrap() {
      Ok(_) => placed += 1,
      Err(MarketError::InsufficientStock { .. }) => {}
      Err(other) => panic!("unexpected error: {}", other),
    }
  }

  assert_eq!(placed, 10);
  assert_eq!(market.get_product(product_id).await.unwrap().quantity, 0);
  assert_eq!(market.buyer_orders(buyer_id).await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_notifications_racing_settle_once() {
  setup_tracing();
  let t = test_market();
  let (_farmer, product) = farmer_with_product(&t.market, "wanjiru", dec!(10.00), 5).await;
  let buyer = register(&t.market, "otieno").await;
  let placed = t.market.place_order(buyer.id, product.id, 2).await.unwrap();
  let reference = placed.order.payment_reference.clone().unwrap();

  let (payload, header) = signed_success(&t.market, &reference);
  let market = Arc::new(t.market);
  let deliveries = (0..4).map(|_| {
    let market = market.clone();
    let payload = payload.clone();
    let header = header.clone();
    tokio::spawn(async move { market.handle_payment_notification(&payload, Some(header.as_str())).await })
  });

  let outcomes: Vec<_> = join_all(deliveries)
    .await
    .into_iter()
    .map(|joined| joined.unwrap().unwrap())
    .collect();
  let settled = outcomes
    .iter()
    .filter(|o| matches!(o, farmgate::ReconciliationOutcome::Settled { .. }))
    .count();
  assert_eq!(settled, 1);
}
