//! Badges: named skills or certifications held by accounts.
//!
//! A badge description may name a certification circle. Only members of that
//! circle (or administrators) can award such a badge; ordinary badges can be
//! taken by anyone for themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Principal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDescription {
  pub id:                      i64,
  pub title:                   String,
  pub description:             Option<String>,
  pub certification_circle_id: Option<i64>,
  pub slug:                    Option<String>,
  pub icon:                    Option<String>,
  pub color:                   Option<String>,
  pub created_by:              i64,
  pub created_at:              DateTime<Utc>,
}

/// Input to [`crate::store::Store::add_badge`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewBadge {
  pub title:                   String,
  #[serde(default)]
  pub description:             Option<String>,
  #[serde(default)]
  pub certification_circle_id: Option<i64>,
  #[serde(default)]
  pub slug:                    Option<String>,
  #[serde(default)]
  pub icon:                    Option<String>,
  #[serde(default)]
  pub color:                   Option<String>,
}

/// A badge held by an account, joined with the badge title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBadge {
  pub id:                   i64,
  pub account_id:           i64,
  pub badge_description_id: i64,
  pub title:                String,
  pub awarded_by_id:        i64,
  pub created_at:           DateTime<Utc>,
}

/// Result of [`crate::store::Store::award_badge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeAward {
  Awarded(AccountBadge),
  /// The account already held the badge; nothing was written.
  AlreadyHeld(AccountBadge),
}

impl BadgeAward {
  pub fn into_badge(self) -> AccountBadge {
    match self {
      Self::Awarded(b) | Self::AlreadyHeld(b) => b,
    }
  }
}

impl BadgeDescription {
  /// Whether `awarder` may give this badge to `recipient_id`.
  ///
  /// `certifier` is whether the awarder belongs to the badge's certification
  /// circle; it is ignored for badges without one.
  pub fn may_award(
    &self,
    awarder: &Principal,
    recipient_id: i64,
    certifier: bool,
  ) -> bool {
    if awarder.is_admin {
      return true;
    }
    match self.certification_circle_id {
      Some(_) => certifier,
      None => awarder.account_id == recipient_id,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn badge(circle: Option<i64>) -> BadgeDescription {
    BadgeDescription {
      id:                      1,
      title:                   "Laser Cutter Trained".into(),
      description:             None,
      certification_circle_id: circle,
      slug:                    None,
      icon:                    None,
      color:                   None,
      created_by:              7,
      created_at:              Utc::now(),
    }
  }

  fn principal(account_id: i64, is_admin: bool) -> Principal {
    Principal {
      account_id,
      username: format!("member{account_id}"),
      is_admin,
    }
  }

  #[test]
  fn plain_badges_are_self_service() {
    let b = badge(None);
    assert!(b.may_award(&principal(7, false), 7, false));
    assert!(!b.may_award(&principal(7, false), 9, false));
    assert!(b.may_award(&principal(1, true), 9, false));
  }

  #[test]
  fn certified_badges_need_a_certifier() {
    let b = badge(Some(3));
    assert!(!b.may_award(&principal(7, false), 7, false));
    assert!(b.may_award(&principal(7, false), 9, true));
    assert!(b.may_award(&principal(1, true), 9, false));
  }
}
