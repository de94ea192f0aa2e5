// core/src/pipelines/registration_pipeline.rs

use crate::error::MarketError;
use crate::models::NewUser;
use crate::pipelines::contexts::RegistrationCtxData;
use crate::services::credentials;
use crate::workflow::{ContextData, Pipeline, PipelineControl, WorkflowError};
use tracing::{info, warn};

pub fn build_registration_pipeline() -> Pipeline<RegistrationCtxData, MarketError> {
  let mut p = Pipeline::<RegistrationCtxData, MarketError>::new(&[
    ("validate_registration", false, None),
    ("check_username_available", false, None),
    ("hash_credentials", false, None),
    ("create_user", false, None),
  ]);

  p.on("validate_registration", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      ctx_data.read().registration.validate()?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  // The insert re-checks under the store's uniqueness guarantee; this gives the
  // common case a field error before any hashing work.
  p.on("check_username_available", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let (store, username) = {
        let guard = ctx_data.read();
        (guard.services.store.clone(), guard.registration.username.trim().to_string())
      };
      if store.username_exists(&username).await? {
        warn!(%username, "Registration rejected: username taken.");
        return Err(MarketError::validation("username", "A user with that username already exists"));
      }
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("hash_credentials", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let password = ctx_data.read().registration.password.clone();
      let hash = credentials::hash_password_blocking(password).await?;
      ctx_data.write().password_hash = Some(hash);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p.on("create_user", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let (store, new_user) = {
        let guard = ctx_data.read();
        let password_hash = guard
          .password_hash
          .clone()
          .ok_or_else(|| WorkflowError::missing("create_user", "password_hash"))?;
        (
          guard.services.store.clone(),
          NewUser {
            username: guard.registration.username.trim().to_string(),
            email: guard.registration.email.trim().to_string(),
            password_hash,
          },
        )
      };

      let user = store.insert_user(new_user).await?;
      info!(user_id = %user.id, username = %user.username, "User registered.");
      ctx_data.write().user = Some(user);
      Ok::<_, MarketError>(PipelineControl::Continue)
    })
  });

  p
}
