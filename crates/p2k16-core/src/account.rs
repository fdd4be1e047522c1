//! Accounts and the acting principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member account. The password hash is kept out of this type; it is only
/// ever read through [`crate::store::Store::find_credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub id:         i64,
  pub username:   String,
  pub email:      String,
  pub name:       Option<String>,
  pub phone:      Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Account {
  /// The full name if one is on file, otherwise the username.
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.username)
  }

  pub fn to_ref(&self) -> AccountRef {
    AccountRef {
      id:           self.id,
      display_name: self.display_name().to_owned(),
    }
  }
}

/// The minimum needed to name an account in a response or error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
  pub id:           i64,
  pub display_name: String,
}

/// Input to [`crate::store::Store::add_account`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
  pub username: String,
  pub email:    String,
  pub name:     Option<String>,
  pub phone:    Option<String>,
}

/// The authenticated account performing an action.
///
/// Resolved once per request by the identity layer and passed explicitly to
/// every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub account_id: i64,
  pub username:   String,
  pub is_admin:   bool,
}
