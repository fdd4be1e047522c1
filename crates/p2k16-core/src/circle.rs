//! Circles: named access-control groups.
//!
//! Membership of the configured admin circle is what makes a principal an
//! administrator. Tools may optionally belong to a circle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
  pub id:          i64,
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCircle {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

/// A membership row. `issuer_id` is the account that granted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleMember {
  pub id:         i64,
  pub circle_id:  i64,
  pub account_id: i64,
  pub issuer_id:  i64,
  pub comment:    Option<String>,
  pub created_at: DateTime<Utc>,
}
