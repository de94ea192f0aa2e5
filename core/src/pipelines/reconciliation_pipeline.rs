// core/src/pipelines/reconciliation_pipeline.rs

//! Applies verified payment notifications to orders.
//!
//! Verification failures abort before any lookup. Once an outcome is known
//! (ignored event type, or an order that is already settled) the remaining
//! steps are skipped.

use crate::error::MarketError;
use crate::models::{OrderStatus, PaymentStatus};
use crate::pipelines::contexts::{ReconciliationCtxData, ReconciliationOutcome};
use crate::workflow::{ContextData, Pipeline, PipelineControl, SkipCondition, WorkflowError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub fn build_reconciliation_pipeline() -> Pipeline<ReconciliationCtxData, MarketError> {
  let outcome_decided: SkipCondition<ReconciliationCtxData> =
    Arc::new(|ctx_data: ContextData<ReconciliationCtxData>| ctx_data.read().outcome.is_some());

  let mut p = Pipeline::<ReconciliationCtxData, MarketError>::new(&[
    ("verify_notification_signature", false, None),
    ("load_order_for_payment", false, Some(outcome_decided.clone())),
    ("settle_order", false, Some(outcome_decided)),
  ]);

  p.on("verify_notification_signature", |ctx_data: ContextData<ReconciliationCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let header = guard
        .signature_header
        .clone()
        .ok_or_else(|| MarketError::InvalidSignature("missing signature header".to_string()))?;
      let event = guard.services.verifier.verify(&guard.payload, &header)?;

      if !event.is_payment_success() {
        debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring payment event.");
        guard.outcome = Some(ReconciliationOutcome::Ignored {
          event_type: event.event_type.clone(),
        });
      } else if event.object_id().is_none() {
        return Err(MarketError::InvalidPayload(format!(
          "event {} carries no payment intent id",
          event.id
        )));
      }
      guard.event = Some(event);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("load_order_for_payment", |ctx_data: ContextData<ReconciliationCtxData>| {
    Box::pin(async move {
      let (store, reference) = {
        let guard = ctx_data.read();
        let reference = guard
          .event
          .as_ref()
          .and_then(|event| event.object_id())
          .map(str::to_string)
          .ok_or_else(|| WorkflowError::missing("load_order_for_payment", "event"))?;
        (guard.services.store.clone(), reference)
      };

      let Some(order) = store.find_order_by_payment_reference(&reference).await? else {
        return Err(MarketError::OrderNotFound(reference));
      };

      let mut guard = ctx_data.write();
      if order.is_settled() {
        debug!(order_id = %order.id, "Order already settled; nothing to do.");
        guard.outcome = Some(ReconciliationOutcome::AlreadySettled { order_id: order.id });
      }
      guard.order = Some(order);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("settle_order", |ctx_data: ContextData<ReconciliationCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|order| order.id)
          .ok_or_else(|| WorkflowError::missing("settle_order", "order"))?;
        (guard.services.store.clone(), order_id)
      };

      let outcome = match store
        .update_order_state(order_id, OrderStatus::Completed, PaymentStatus::Paid)
        .await?
      {
        Some(order) => {
          info!(order_id = %order.id, payment_reference = ?order.payment_reference, "Order settled.");
          ctx_data.write().order = Some(order);
          ReconciliationOutcome::Settled { order_id }
        }
        None => {
          warn!(%order_id, "Concurrent notification already settled the order.");
          ReconciliationOutcome::AlreadySettled { order_id }
        }
      };
      ctx_data.write().outcome = Some(outcome);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p
}
