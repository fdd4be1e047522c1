//! Error types for `p2k16-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountRef;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Entity {
  Tool,
  Checkout,
  Account,
  Circle,
  Badge,
  #[serde(rename = "account_badge")]
  #[strum(serialize = "account badge")]
  AccountBadge,
}

/// Every way a tool lifecycle operation can fail.
///
/// A failed operation never leaves a partial write behind: no checkout row is
/// inserted and no checkout row is closed.
#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} {1} not found")]
  NotFound(Entity, i64),

  /// The tool already has an open checkout held by someone.
  #[error("tool '{tool_name}' is already checked out to {}", .held_by.display_name)]
  Conflict {
    tool_id:     i64,
    tool_name:   String,
    checkout_id: i64,
    held_by:     AccountRef,
  },

  /// Check-in attempted on a checkout that is already closed.
  #[error("checkout {0} is already checked in")]
  InvalidState(i64),

  #[error("account {account_id} may not check in checkout {checkout_id}")]
  Forbidden { checkout_id: i64, account_id: i64 },

  #[error("persistence failure: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error. Used with `map_err` at every store call site.
  pub fn persistence<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
