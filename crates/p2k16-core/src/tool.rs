//! Tools and checkouts.
//!
//! A checkout is one occupancy interval of a tool by an account. It is created
//! open (`checkin_at == None`) and closed exactly once. Checkout rows are never
//! deleted; together they form the tool's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountRef;

// ─── Tool ────────────────────────────────────────────────────────────────────

/// A physical resource that members can check out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
  /// The circle that governs access to this tool, if any.
  pub circle_id:   Option<i64>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::Store::add_tool`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTool {
  pub name:        String,
  pub description: Option<String>,
  pub circle_id:   Option<i64>,
}

// ─── Checkout ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
  pub id:          i64,
  pub tool_id:     i64,
  pub account_id:  i64,
  pub checkout_at: DateTime<Utc>,
  /// `None` while the tool is still out.
  pub checkin_at:  Option<DateTime<Utc>>,
}

impl Checkout {
  pub fn is_open(&self) -> bool { self.checkin_at.is_none() }
}

/// An open checkout joined with the names a reader needs to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCheckout {
  pub checkout:  Checkout,
  pub tool_name: String,
  pub holder:    AccountRef,
}

/// A tool together with whoever currently holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
  pub tool:   Tool,
  /// `None` when the tool is available.
  pub holder: Option<OpenCheckout>,
}

impl ToolStatus {
  pub fn is_available(&self) -> bool { self.holder.is_none() }
}

// ─── Store outcomes ──────────────────────────────────────────────────────────

/// Result of [`crate::store::Store::insert_checkout`].
///
/// The store checks for an existing open checkout and inserts the new one
/// atomically; `Occupied` means another checkout won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutInsert {
  Inserted(Checkout),
  Occupied(OpenCheckout),
}

/// Result of [`crate::store::Store::mark_checked_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinOutcome {
  /// The checkout was open and is now closed.
  Done(Checkout),
  NotFound,
  /// The checkout was already closed; nothing was written.
  AlreadyClosed,
}
