// core/src/pipelines/catalog_pipeline.rs

use crate::error::MarketError;
use crate::pipelines::contexts::ListingCtxData;
use crate::workflow::{ContextData, Pipeline, PipelineControl, WorkflowError};
use tracing::{info, warn};

pub fn build_listing_pipeline() -> Pipeline<ListingCtxData, MarketError> {
  let mut p = Pipeline::<ListingCtxData, MarketError>::new(&[
    ("load_farmer_profile", false, None),
    ("validate_listing", false, None),
    ("create_product", false, None),
  ]);

  p.on("load_farmer_profile", |ctx_data: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.services.store.clone(), guard.user_id)
      };
      let Some(farmer) = store.find_profile_by_user(user_id).await? else {
        warn!(%user_id, "Listing rejected: no farmer profile.");
        return Err(MarketError::ProfileRequired);
      };
      ctx_data.write().farmer = Some(farmer);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("validate_listing", |ctx_data: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let category = ctx_data.read().input.validate()?;
      ctx_data.write().category = Some(category);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("create_product", |ctx_data: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let (store, farmer_id, input, category) = {
        let guard = ctx_data.read();
        let farmer = guard
          .farmer
          .as_ref()
          .ok_or_else(|| WorkflowError::missing("create_product", "farmer"))?;
        let category = guard
          .category
          .ok_or_else(|| WorkflowError::missing("create_product", "category"))?;
        (guard.services.store.clone(), farmer.id, guard.input.clone(), category)
      };
      let product = store.insert_product(farmer_id, &input, category).await?;
      info!(product_id = %product.id, %farmer_id, name = %product.name, "Product listed.");
      ctx_data.write().product = Some(product);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p
}
