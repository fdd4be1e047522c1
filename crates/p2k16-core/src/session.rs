//! Login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A login session. Only the SHA-256 digest of the bearer token is stored;
/// the token itself is handed to the client once and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub token_hash: String,
  pub account_id: i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}
