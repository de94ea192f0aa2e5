// core/src/pipelines/profile_pipeline.rs

use crate::error::MarketError;
use crate::pipelines::contexts::ProfileSetupCtxData;
use crate::workflow::{ContextData, Pipeline, PipelineControl};
use tracing::info;

pub fn build_profile_setup_pipeline() -> Pipeline<ProfileSetupCtxData, MarketError> {
  let mut p = Pipeline::<ProfileSetupCtxData, MarketError>::new(&[
    ("validate_profile", false, None),
    ("ensure_account", false, None),
    ("create_profile", false, None),
  ]);

  p.on("validate_profile", |ctx_data: ContextData<ProfileSetupCtxData>| {
    Box::pin(async move {
      ctx_data.read().input.validate()?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("ensure_account", |ctx_data: ContextData<ProfileSetupCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.services.store.clone(), guard.user_id)
      };
      if store.find_user(user_id).await?.is_none() {
        return Err(MarketError::Unauthenticated(format!("Unknown user {}", user_id)));
      }
      if store.find_profile_by_user(user_id).await?.is_some() {
        return Err(MarketError::ProfileExists);
      }
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("create_profile", |ctx_data: ContextData<ProfileSetupCtxData>| {
    Box::pin(async move {
      let (store, user_id, input) = {
        let guard = ctx_data.read();
        (guard.services.store.clone(), guard.user_id, guard.input.clone())
      };
      let profile = store.insert_profile(user_id, &input).await?;
      info!(%user_id, profile_id = %profile.id, "Farmer profile created.");
      ctx_data.write().profile = Some(profile);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p
}
