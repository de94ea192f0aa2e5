// core/src/services/credentials.rs

//! Password hashing and verification (argon2, PHC string format).

use crate::error::{MarketError, Result};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

#[instrument(name = "credentials::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(MarketError::validation("password", "Password cannot be empty"));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(MarketError::Internal(format!("Password hashing failed: {}", argon_err)))
    }
  }
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
#[instrument(name = "credentials::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool> {
  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash is not a valid PHC string.");
    MarketError::Internal(format!("Invalid stored password hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification failed.");
      Err(MarketError::Internal(format!("Password verification failed: {}", other)))
    }
  }
}

fn join_error(err: tokio::task::JoinError) -> MarketError {
  MarketError::Internal(format!("Password hashing task failed: {}", err))
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_blocking(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(join_error)?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_blocking(stored_hash: String, provided_password: String) -> Result<bool> {
  tokio::task::spawn_blocking(move || verify_password(&stored_hash, &provided_password))
    .await
    .map_err(join_error)?
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(flavor = "current_thread")]
  async fn blocking_variants_hash_and_verify() {
    let hash = hash_password_blocking("correct horse".to_string()).await.unwrap();
    assert!(verify_password_blocking(hash.clone(), "correct horse".to_string()).await.unwrap());
    assert!(!verify_password_blocking(hash, "wrong horse".to_string()).await.unwrap());
    assert!(matches!(
      hash_password_blocking(String::new()).await,
      Err(MarketError::Validation { .. })
    ));
  }

  #[test]
  fn verifies_the_hashed_password_only() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
  }

  #[test]
  fn salts_every_hash() {
    assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
  }

  #[test]
  fn rejects_garbage_stored_hash() {
    assert!(matches!(verify_password("plain", "x"), Err(MarketError::Internal(_))));
  }
}
