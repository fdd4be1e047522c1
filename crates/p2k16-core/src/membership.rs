//! Paid membership of the space.
//!
//! An account has at most one membership row. It is active once its start
//! date has been reached and it carries a non-zero monthly fee.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub id:                i64,
  pub account_id:        i64,
  /// When the account first became a member; kept across renewals.
  pub first_membership:  NaiveDate,
  pub start_membership:  NaiveDate,
  /// Monthly fee in øre.
  pub fee:               i64,
  pub membership_number: Option<i64>,
  pub updated_at:        DateTime<Utc>,
}

/// Input to [`crate::store::Store::set_membership`].
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipTerms {
  pub start_membership:  NaiveDate,
  pub fee:               i64,
  #[serde(default)]
  pub membership_number: Option<i64>,
}

impl Membership {
  pub fn is_paying(&self) -> bool { self.fee > 0 }

  pub fn is_active(&self, today: NaiveDate) -> bool {
    self.is_paying() && self.start_membership <= today
  }
}

/// What an account's membership looks like on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipStatus {
  pub account_id: i64,
  pub is_active:  bool,
  pub is_paying:  bool,
  pub membership: Option<Membership>,
}

impl MembershipStatus {
  pub fn of(
    account_id: i64,
    membership: Option<Membership>,
    today: NaiveDate,
  ) -> Self {
    Self {
      account_id,
      is_active: membership.as_ref().is_some_and(|m| m.is_active(today)),
      is_paying: membership.as_ref().is_some_and(Membership::is_paying),
      membership,
    }
  }
}
