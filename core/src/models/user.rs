// core/src/models/user.rs

use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

/// Registration form as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub username: String,
  pub email: String,
  pub password: String,
  pub password_confirmation: String,
}

impl Registration {
  pub fn validate(&self) -> Result<()> {
    let username = self.username.trim();
    if username.is_empty() {
      return Err(MarketError::validation("username", "Username is required."));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
      return Err(MarketError::validation(
        "username",
        format!("Username must be at most {} characters.", MAX_USERNAME_LEN),
      ));
    }
    if !username
      .chars()
      .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
      return Err(MarketError::validation(
        "username",
        "Username may contain only letters, digits and @/./+/-/_ characters.",
      ));
    }

    let email = self.email.trim();
    match email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {}
      _ => return Err(MarketError::validation("email", "Enter a valid email address.")),
    }

    if self.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(MarketError::validation(
        "password",
        format!("Password must be at least {} characters long.", MIN_PASSWORD_LEN),
      ));
    }
    if self.password != self.password_confirmation {
      return Err(MarketError::validation(
        "password_confirmation",
        "The two password fields didn't match.",
      ));
    }
    Ok(())
  }
}

/// A user row ready to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration() -> Registration {
    Registration {
      username: "wanjiku_farms".to_string(),
      email: "wanjiku@example.com".to_string(),
      password: "s3cure-pass".to_string(),
      password_confirmation: "s3cure-pass".to_string(),
    }
  }

  fn field_of(err: MarketError) -> String {
    match err {
      MarketError::Validation { field, .. } => field,
      other => panic!("expected a validation error, got {:?}", other),
    }
  }

  #[test]
  fn accepts_a_well_formed_registration() {
    assert!(registration().validate().is_ok());
  }

  #[test]
  fn rejects_usernames_with_spaces() {
    let mut r = registration();
    r.username = "two words".to_string();
    assert_eq!(field_of(r.validate().unwrap_err()), "username");
  }

  #[test]
  fn rejects_bad_email() {
    let mut r = registration();
    r.email = "not-an-email".to_string();
    assert_eq!(field_of(r.validate().unwrap_err()), "email");
  }

  #[test]
  fn rejects_mismatched_confirmation() {
    let mut r = registration();
    r.password_confirmation = "different-pass".to_string();
    assert_eq!(field_of(r.validate().unwrap_err()), "password_confirmation");
  }

  #[test]
  fn rejects_short_password() {
    let mut r = registration();
    r.password = "short".to_string();
    r.password_confirmation = "short".to_string();
    assert_eq!(field_of(r.validate().unwrap_err()), "password");
  }
}
