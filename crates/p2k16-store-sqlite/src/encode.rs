//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so that text comparison in SQL agrees with
//! chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use p2k16_core::{
  account::{Account, AccountRef},
  badge::{AccountBadge, BadgeDescription},
  circle::{Circle, CircleMember},
  event::Event,
  membership::Membership,
  session::Session,
  tool::{Checkout, OpenCheckout, Tool},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Drop sub-microsecond precision so a value survives a round trip intact.
pub fn truncate_dt(dt: DateTime<Utc>) -> Result<DateTime<Utc>> {
  decode_dt(&encode_dt(dt))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str =
  "a.id, a.username, a.email, a.name, a.phone, a.created_at";

pub const CHECKOUT_COLUMNS: &str =
  "c.id, c.tool_id, c.account_id, c.checkout_at, c.checkin_at";

/// `CHECKOUT_COLUMNS` plus the tool and holder names; expects `tools t` and
/// `accounts a` joined in.
pub const OPEN_CHECKOUT_COLUMNS: &str = "c.id, c.tool_id, c.account_id, \
   c.checkout_at, c.checkin_at, t.name, a.username, a.name";

pub const BADGE_COLUMNS: &str = "b.id, b.title, b.description, \
   b.certification_circle_id, b.slug, b.icon, b.color, b.created_by, \
   b.created_at";

/// Expects `badge_descriptions b` joined in for the title.
pub const ACCOUNT_BADGE_COLUMNS: &str = "ab.id, ab.account_id, \
   ab.badge_description_id, b.title, ab.awarded_by_id, ab.created_at";

pub const MEMBERSHIP_COLUMNS: &str = "m.id, m.account_id, m.first_membership, \
   m.start_membership, m.fee, m.membership_number, m.updated_at";

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub id:         i64,
  pub username:   String,
  pub email:      String,
  pub name:       Option<String>,
  pub phone:      Option<String>,
  pub created_at: String,
}

impl RawAccount {
  /// Map a row selected with [`ACCOUNT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      username:   row.get(1)?,
      email:      row.get(2)?,
      name:       row.get(3)?,
      phone:      row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:         self.id,
      username:   self.username,
      email:      self.email,
      name:       self.name,
      phone:      self.phone,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCircle {
  pub id:          i64,
  pub name:        String,
  pub description: String,
  pub created_at:  String,
}

impl RawCircle {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_circle(self) -> Result<Circle> {
    Ok(Circle {
      id:          self.id,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCircleMember {
  pub id:         i64,
  pub circle_id:  i64,
  pub account_id: i64,
  pub issuer_id:  i64,
  pub comment:    Option<String>,
  pub created_at: String,
}

impl RawCircleMember {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      circle_id:  row.get(1)?,
      account_id: row.get(2)?,
      issuer_id:  row.get(3)?,
      comment:    row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_member(self) -> Result<CircleMember> {
    Ok(CircleMember {
      id:         self.id,
      circle_id:  self.circle_id,
      account_id: self.account_id,
      issuer_id:  self.issuer_id,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawTool {
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
  pub circle_id:   Option<i64>,
  pub created_at:  String,
}

impl RawTool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      circle_id:   row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_tool(self) -> Result<Tool> {
    Ok(Tool {
      id:          self.id,
      name:        self.name,
      description: self.description,
      circle_id:   self.circle_id,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `tool_checkouts` row.
pub struct RawCheckout {
  pub id:          i64,
  pub tool_id:     i64,
  pub account_id:  i64,
  pub checkout_at: String,
  pub checkin_at:  Option<String>,
}

impl RawCheckout {
  /// Map a row selected with [`CHECKOUT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      tool_id:     row.get(1)?,
      account_id:  row.get(2)?,
      checkout_at: row.get(3)?,
      checkin_at:  row.get(4)?,
    })
  }

  pub fn into_checkout(self) -> Result<Checkout> {
    Ok(Checkout {
      id:          self.id,
      tool_id:     self.tool_id,
      account_id:  self.account_id,
      checkout_at: decode_dt(&self.checkout_at)?,
      checkin_at:  self.checkin_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// An open checkout row joined with tool and account names.
pub struct RawOpenCheckout {
  pub checkout:  RawCheckout,
  pub tool_name: String,
  pub username:  String,
  pub name:      Option<String>,
}

impl RawOpenCheckout {
  /// Map a row selected with [`OPEN_CHECKOUT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      checkout:  RawCheckout::from_row(row)?,
      tool_name: row.get(5)?,
      username:  row.get(6)?,
      name:      row.get(7)?,
    })
  }

  pub fn into_open_checkout(self) -> Result<OpenCheckout> {
    let checkout = self.checkout.into_checkout()?;
    Ok(OpenCheckout {
      holder: AccountRef {
        id:           checkout.account_id,
        display_name: self.name.unwrap_or(self.username),
      },
      tool_name: self.tool_name,
      checkout,
    })
  }
}

pub struct RawSession {
  pub token_hash: String,
  pub account_id: i64,
  pub created_at: String,
  pub expires_at: String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_hash: row.get(0)?,
      account_id: row.get(1)?,
      created_at: row.get(2)?,
      expires_at: row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token_hash: self.token_hash,
      account_id: self.account_id,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

pub struct RawEvent {
  pub id:         i64,
  pub domain:     String,
  pub key:        String,
  pub account_id: Option<i64>,
  pub subject_id: Option<i64>,
  pub text:       Option<String>,
  pub created_at: String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      domain:     row.get(1)?,
      key:        row.get(2)?,
      account_id: row.get(3)?,
      subject_id: row.get(4)?,
      text:       row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:         self.id,
      domain:     self.domain,
      key:        self.key,
      account_id: self.account_id,
      subject_id: self.subject_id,
      text:       self.text,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawBadge {
  pub id:                      i64,
  pub title:                   String,
  pub description:             Option<String>,
  pub certification_circle_id: Option<i64>,
  pub slug:                    Option<String>,
  pub icon:                    Option<String>,
  pub color:                   Option<String>,
  pub created_by:              i64,
  pub created_at:              String,
}

impl RawBadge {
  /// Map a row selected with [`BADGE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get(0)?,
      title:                   row.get(1)?,
      description:             row.get(2)?,
      certification_circle_id: row.get(3)?,
      slug:                    row.get(4)?,
      icon:                    row.get(5)?,
      color:                   row.get(6)?,
      created_by:              row.get(7)?,
      created_at:              row.get(8)?,
    })
  }

  pub fn into_badge(self) -> Result<BadgeDescription> {
    Ok(BadgeDescription {
      id:                      self.id,
      title:                   self.title,
      description:             self.description,
      certification_circle_id: self.certification_circle_id,
      slug:                    self.slug,
      icon:                    self.icon,
      color:                   self.color,
      created_by:              self.created_by,
      created_at:              decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAccountBadge {
  pub id:                   i64,
  pub account_id:           i64,
  pub badge_description_id: i64,
  pub title:                String,
  pub awarded_by_id:        i64,
  pub created_at:           String,
}

impl RawAccountBadge {
  /// Map a row selected with [`ACCOUNT_BADGE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      account_id:           row.get(1)?,
      badge_description_id: row.get(2)?,
      title:                row.get(3)?,
      awarded_by_id:        row.get(4)?,
      created_at:           row.get(5)?,
    })
  }

  pub fn into_account_badge(self) -> Result<AccountBadge> {
    Ok(AccountBadge {
      id:                   self.id,
      account_id:           self.account_id,
      badge_description_id: self.badge_description_id,
      title:                self.title,
      awarded_by_id:        self.awarded_by_id,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawMembership {
  pub id:                i64,
  pub account_id:        i64,
  pub first_membership:  String,
  pub start_membership:  String,
  pub fee:               i64,
  pub membership_number: Option<i64>,
  pub updated_at:        String,
}

impl RawMembership {
  /// Map a row selected with [`MEMBERSHIP_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      account_id:        row.get(1)?,
      first_membership:  row.get(2)?,
      start_membership:  row.get(3)?,
      fee:               row.get(4)?,
      membership_number: row.get(5)?,
      updated_at:        row.get(6)?,
    })
  }

  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      id:                self.id,
      account_id:        self.account_id,
      first_membership:  decode_date(&self.first_membership)?,
      start_membership:  decode_date(&self.start_membership)?,
      fee:               self.fee,
      membership_number: self.membership_number,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
