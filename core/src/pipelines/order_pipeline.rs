// core/src/pipelines/order_pipeline.rs

//! Order placement: validate, lock stock, price, request a payment intent,
//! then write the order and the stock decrement together.
//!
//! The stock reservation is held from `reserve_product_stock` to
//! `persist_order`, so no other placement for the same product can read or
//! change its stock in between. Any failure releases it without writing.

use crate::error::MarketError;
use crate::models::{NewOrder, MAX_TOTAL_PRICE};
use crate::payments::{to_minor_units, PaymentIntentRequest, PaymentMetadata};
use crate::pipelines::contexts::PlaceOrderCtxData;
use crate::workflow::{ContextData, Pipeline, PipelineControl, WorkflowError};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

async fn release_reservation(ctx_data: &ContextData<PlaceOrderCtxData>) {
  let reservation = ctx_data.write().reservation.take();
  if let Some(reservation) = reservation {
    if let Err(e) = reservation.release().await {
      error!(error = %e, "Failed to release stock reservation.");
    }
  }
}

pub fn build_place_order_pipeline() -> Pipeline<PlaceOrderCtxData, MarketError> {
  let mut p = Pipeline::<PlaceOrderCtxData, MarketError>::new(&[
    ("validate_order_request", false, None),
    ("reserve_product_stock", false, None),
    ("price_order", false, None),
    ("create_payment_intent", false, None),
    ("persist_order", false, None),
  ]);

  p.on("validate_order_request", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (store, buyer_id, requested) = {
        let guard = ctx_data.read();
        (guard.services.store.clone(), guard.buyer_id, guard.requested_quantity)
      };

      let quantity = i32::try_from(requested)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(MarketError::InvalidQuantity)?;

      if store.find_user(buyer_id).await?.is_none() {
        return Err(MarketError::Unauthenticated(format!("Unknown buyer {}", buyer_id)));
      }

      ctx_data.write().quantity = Some(quantity);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("reserve_product_stock", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (store, product_id, quantity) = {
        let guard = ctx_data.read();
        let quantity = guard
          .quantity
          .ok_or_else(|| WorkflowError::missing("reserve_product_stock", "quantity"))?;
        (guard.services.store.clone(), guard.product_id, quantity)
      };

      let reservation = store
        .reserve_stock(product_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Product {}", product_id)))?;

      let product = reservation.product().clone();
      if quantity > product.quantity {
        reservation.release().await?;
        warn!(%product_id, requested = quantity, available = product.quantity, "Not enough stock.");
        return Err(MarketError::InsufficientStock {
          requested: quantity,
          available: product.quantity,
        });
      }

      let mut guard = ctx_data.write();
      guard.product = Some(product);
      guard.reservation = Some(reservation);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("price_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let quantity = guard
        .quantity
        .ok_or_else(|| WorkflowError::missing("price_order", "quantity"))?;
      let price = guard
        .product
        .as_ref()
        .map(|product| product.price)
        .ok_or_else(|| WorkflowError::missing("price_order", "product"))?;
      let total = price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= MAX_TOTAL_PRICE)
        .ok_or_else(|| {
          MarketError::validation(
            "quantity",
            format!("Order total may not exceed {}", MAX_TOTAL_PRICE),
          )
        })?;
      guard.total_price = Some(total);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("create_payment_intent", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (gateway, request) = {
        let guard = ctx_data.read();
        let total = guard
          .total_price
          .ok_or_else(|| WorkflowError::missing("create_payment_intent", "total_price"))?;
        let quantity = guard
          .quantity
          .ok_or_else(|| WorkflowError::missing("create_payment_intent", "quantity"))?;
        let amount_minor = to_minor_units(total)
          .ok_or_else(|| MarketError::Internal(format!("Order total {} is out of range", total)))?;
        (
          guard.services.gateway.clone(),
          PaymentIntentRequest {
            amount_minor,
            currency: guard.services.settings.currency.clone(),
            metadata: PaymentMetadata {
              product_id: guard.product_id,
              quantity,
              buyer_id: guard.buyer_id,
            },
          },
        )
      };

      match gateway.create_payment_intent(&request).await {
        Ok(intent) => {
          info!(payment_intent_id = %intent.id, amount = intent.amount_minor, "Payment intent created.");
          ctx_data.write().payment_intent = Some(intent);
          Ok::<_, MarketError>(PipelineControl::Continue)
        }
        Err(e) => {
          warn!(error = %e, "Payment processor refused the intent; releasing stock.");
          release_reservation(&ctx_data).await;
          Err(e.into())
        }
      }
    })
  });

  p.on("persist_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (reservation, new_order) = {
        let mut guard = ctx_data.write();
        let reservation = guard
          .reservation
          .take()
          .ok_or_else(|| WorkflowError::missing("persist_order", "reservation"))?;
        let new_order = NewOrder {
          buyer_id: guard.buyer_id,
          product_id: guard.product_id,
          quantity: guard
            .quantity
            .ok_or_else(|| WorkflowError::missing("persist_order", "quantity"))?,
          total_price: guard
            .total_price
            .ok_or_else(|| WorkflowError::missing("persist_order", "total_price"))?,
          payment_reference: guard
            .payment_intent
            .as_ref()
            .map(|intent| intent.id.clone())
            .ok_or_else(|| WorkflowError::missing("persist_order", "payment_intent"))?,
        };
        (reservation, new_order)
      };

      let payment_reference = new_order.payment_reference.clone();
      let order = reservation.commit(new_order).await.map_err(|e| {
        error!(error = %e, %payment_reference, "Order write failed after the payment intent was created.");
        e
      })?;
      ctx_data.write().order = Some(order);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.after("persist_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if let Some(order) = &guard.order {
        info!(
          order_id = %order.id,
          product_id = %order.product_id,
          quantity = order.quantity,
          total_price = %order.total_price,
          "Order placed."
        );
      }
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p
}
