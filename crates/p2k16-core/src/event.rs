//! Audit events.
//!
//! Events are append-only. The lifecycle manager records one per successful
//! checkout and checkin, and the API records logins, badge awards and
//! membership changes; recording is best-effort and never fails the
//! operation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DOMAIN_TOOL: &str = "tool";
pub const DOMAIN_AUTH: &str = "auth";
pub const DOMAIN_BADGE: &str = "badge";
pub const DOMAIN_MEMBERSHIP: &str = "membership";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:         i64,
  /// Coarse area, e.g. `"tool"` or `"auth"`.
  pub domain:     String,
  /// What happened within the domain, e.g. `"checkout"`.
  pub key:        String,
  /// The account that caused the event, if any.
  pub account_id: Option<i64>,
  /// The record the event is about (tool id, checkout id, ...).
  pub subject_id: Option<i64>,
  pub text:       Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::Store::record_event`]. `created_at` is set by the
/// store.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub domain:     String,
  pub key:        String,
  pub account_id: Option<i64>,
  pub subject_id: Option<i64>,
  pub text:       Option<String>,
}

impl NewEvent {
  pub fn new(domain: &str, key: &str) -> Self {
    Self {
      domain:     domain.to_owned(),
      key:        key.to_owned(),
      account_id: None,
      subject_id: None,
      text:       None,
    }
  }

  pub fn by(mut self, account_id: i64) -> Self {
    self.account_id = Some(account_id);
    self
  }

  pub fn about(mut self, subject_id: i64) -> Self {
    self.subject_id = Some(subject_id);
    self
  }

  pub fn text(mut self, text: impl Into<String>) -> Self {
    self.text = Some(text.into());
    self
  }
}
