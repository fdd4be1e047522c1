//! [`SqliteStore`], the SQLite implementation of [`Store`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use p2k16_core::{
  account::{Account, NewAccount},
  badge::{AccountBadge, BadgeAward, BadgeDescription, NewBadge},
  circle::{Circle, CircleMember, NewCircle},
  event::{Event, NewEvent},
  membership::{Membership, MembershipTerms},
  session::Session,
  store::Store,
  tool::{CheckinOutcome, Checkout, CheckoutInsert, NewTool, OpenCheckout, Tool},
};

use crate::{
  Error, Result,
  encode::{
    ACCOUNT_BADGE_COLUMNS, ACCOUNT_COLUMNS, BADGE_COLUMNS, CHECKOUT_COLUMNS,
    MEMBERSHIP_COLUMNS, OPEN_CHECKOUT_COLUMNS, RawAccount, RawAccountBadge,
    RawBadge, RawCheckout, RawCircle, RawCircleMember, RawEvent,
    RawMembership, RawOpenCheckout, RawSession, RawTool, encode_date,
    encode_dt, truncate_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A p2k16 store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised onto the connection's background thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Outcome of the checkout insert transaction, before decoding.
enum RawInsert {
  Inserted(RawCheckout),
  Occupied(RawOpenCheckout),
}

/// Outcome of the checkin transaction, before decoding.
enum RawCheckin {
  Done(RawCheckout),
  NotFound,
  AlreadyClosed,
}

fn select_open_for_tool(
  conn: &rusqlite::Connection,
  tool_id: i64,
) -> rusqlite::Result<Option<RawOpenCheckout>> {
  conn
    .query_row(
      &format!(
        "SELECT {OPEN_CHECKOUT_COLUMNS}
         FROM tool_checkouts c
         JOIN tools    t ON t.id = c.tool_id
         JOIN accounts a ON a.id = c.account_id
         WHERE c.tool_id = ?1 AND c.checkin_at IS NULL"
      ),
      rusqlite::params![tool_id],
      RawOpenCheckout::from_row,
    )
    .optional()
}

fn select_checkout(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawCheckout>> {
  conn
    .query_row(
      &format!("SELECT {CHECKOUT_COLUMNS} FROM tool_checkouts c WHERE c.id = ?1"),
      rusqlite::params![id],
      RawCheckout::from_row,
    )
    .optional()
}

fn select_account_badge(
  conn: &rusqlite::Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Option<RawAccountBadge>> {
  conn
    .query_row(
      &format!(
        "SELECT {ACCOUNT_BADGE_COLUMNS}
         FROM account_badges ab
         JOIN badge_descriptions b ON b.id = ab.badge_description_id
         WHERE {clause}"
      ),
      params,
      RawAccountBadge::from_row,
    )
    .optional()
}

fn select_badge(
  conn: &rusqlite::Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Option<RawBadge>> {
  conn
    .query_row(
      &format!("SELECT {BADGE_COLUMNS} FROM badge_descriptions b WHERE {clause}"),
      params,
      RawBadge::from_row,
    )
    .optional()
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Tools ─────────────────────────────────────────────────────────────────

  async fn add_tool(&self, input: NewTool) -> Result<Tool> {
    let created_at = truncate_dt(Utc::now())?;
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tools (name, description, circle_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row.name, row.description, row.circle_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Tool {
      id,
      name: input.name,
      description: input.description,
      circle_id: input.circle_id,
      created_at,
    })
  }

  async fn find_tool(&self, id: i64) -> Result<Option<Tool>> {
    let raw: Option<RawTool> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, description, circle_id, created_at
               FROM tools WHERE id = ?1",
              rusqlite::params![id],
              RawTool::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTool::into_tool).transpose()
  }

  async fn list_tools(&self) -> Result<Vec<Tool>> {
    let raws: Vec<RawTool> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, description, circle_id, created_at
           FROM tools ORDER BY name, id",
        )?;
        let rows = stmt
          .query_map([], RawTool::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTool::into_tool).collect()
  }

  // ── Checkouts ─────────────────────────────────────────────────────────────

  async fn list_open_checkouts(&self) -> Result<Vec<OpenCheckout>> {
    let raws: Vec<RawOpenCheckout> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OPEN_CHECKOUT_COLUMNS}
           FROM tool_checkouts c
           JOIN tools    t ON t.id = c.tool_id
           JOIN accounts a ON a.id = c.account_id
           WHERE c.checkin_at IS NULL
           ORDER BY c.checkout_at DESC, c.id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawOpenCheckout::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawOpenCheckout::into_open_checkout)
      .collect()
  }

  async fn find_checkout(&self, id: i64) -> Result<Option<Checkout>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_checkout(conn, id)?))
      .await?;

    raw.map(RawCheckout::into_checkout).transpose()
  }

  async fn insert_checkout(
    &self,
    tool_id: i64,
    account_id: i64,
    at: DateTime<Utc>,
  ) -> Result<CheckoutInsert> {
    let at_str = encode_dt(at);

    // The open-checkout check and the insert share one IMMEDIATE transaction,
    // which takes the write lock up front. The partial unique index on
    // `tool_checkouts(tool_id) WHERE checkin_at IS NULL` backs this up
    // against writers on other connections.
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(held) = select_open_for_tool(&tx, tool_id)? {
          return Ok(RawInsert::Occupied(held));
        }

        let inserted = tx.execute(
          "INSERT INTO tool_checkouts (tool_id, account_id, checkout_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![tool_id, account_id, at_str],
        );

        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return match select_open_for_tool(&tx, tool_id)? {
              Some(held) => Ok(RawInsert::Occupied(held)),
              None => Err(e.into()),
            };
          }
          Err(e) => return Err(e.into()),
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(RawInsert::Inserted(RawCheckout {
          id,
          tool_id,
          account_id,
          checkout_at: at_str,
          checkin_at: None,
        }))
      })
      .await?;

    Ok(match raw {
      RawInsert::Inserted(c) => CheckoutInsert::Inserted(c.into_checkout()?),
      RawInsert::Occupied(held) => {
        CheckoutInsert::Occupied(held.into_open_checkout()?)
      }
    })
  }

  async fn mark_checked_in(
    &self,
    checkout_id: i64,
    at: DateTime<Utc>,
  ) -> Result<CheckinOutcome> {
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = select_checkout(&tx, checkout_id)? else {
          return Ok(RawCheckin::NotFound);
        };
        if current.checkin_at.is_some() {
          return Ok(RawCheckin::AlreadyClosed);
        }

        tx.execute(
          "UPDATE tool_checkouts SET checkin_at = ?2
           WHERE id = ?1 AND checkin_at IS NULL",
          rusqlite::params![checkout_id, at_str],
        )?;
        tx.commit()?;

        Ok(RawCheckin::Done(RawCheckout {
          checkin_at: Some(at_str),
          ..current
        }))
      })
      .await?;

    Ok(match raw {
      RawCheckin::Done(c) => CheckinOutcome::Done(c.into_checkout()?),
      RawCheckin::NotFound => CheckinOutcome::NotFound,
      RawCheckin::AlreadyClosed => CheckinOutcome::AlreadyClosed,
    })
  }

  async fn checkout_history(
    &self,
    tool_id: i64,
    limit: usize,
  ) -> Result<Vec<Checkout>> {
    let limit_val = limit as i64;

    let raws: Vec<RawCheckout> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHECKOUT_COLUMNS} FROM tool_checkouts c
           WHERE c.tool_id = ?1
           ORDER BY c.checkout_at DESC, c.id DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![tool_id, limit_val], RawCheckout::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCheckout::into_checkout).collect()
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn add_account(
    &self,
    input: NewAccount,
    password_hash: String,
  ) -> Result<Account> {
    let created_at = truncate_dt(Utc::now())?;
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts
             (username, email, password_hash, name, phone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.username,
            row.email,
            password_hash,
            row.name,
            row.phone,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Account {
      id,
      username: input.username,
      email: input.email,
      name: input.name,
      phone: input.phone,
      created_at,
    })
  }

  async fn find_account(&self, id: i64) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.id = ?1"),
              rusqlite::params![id],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn find_account_by_username(
    &self,
    username: &str,
  ) -> Result<Option<Account>> {
    Ok(self.find_credentials(username).await?.map(|(account, _)| account))
  }

  async fn find_credentials(
    &self,
    username: &str,
  ) -> Result<Option<(Account, String)>> {
    let username = username.to_owned();

    let raw: Option<(RawAccount, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLUMNS}, a.password_hash
                 FROM accounts a WHERE a.username = ?1"
              ),
              rusqlite::params![username],
              |row| Ok((RawAccount::from_row(row)?, row.get(6)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(account, hash)| Ok((account.into_account()?, hash)))
      .transpose()
  }

  async fn list_accounts(&self) -> Result<Vec<Account>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts a ORDER BY a.username"
        ))?;
        let rows = stmt
          .query_map([], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  // ── Circles ───────────────────────────────────────────────────────────────

  async fn add_circle(&self, input: NewCircle) -> Result<Circle> {
    let created_at = truncate_dt(Utc::now())?;
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO circles (name, description, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![row.name, row.description, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Circle {
      id,
      name: input.name,
      description: input.description,
      created_at,
    })
  }

  async fn find_circle(&self, id: i64) -> Result<Option<Circle>> {
    let raw: Option<RawCircle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, description, created_at FROM circles WHERE id = ?1",
              rusqlite::params![id],
              RawCircle::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCircle::into_circle).transpose()
  }

  async fn list_circles(&self) -> Result<Vec<Circle>> {
    let raws: Vec<RawCircle> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, description, created_at FROM circles ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], RawCircle::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCircle::into_circle).collect()
  }

  async fn add_circle_member(
    &self,
    circle_id: i64,
    account_id: i64,
    issuer_id: i64,
    comment: Option<String>,
  ) -> Result<CircleMember> {
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawCircleMember> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO circle_members
             (circle_id, account_id, issuer_id, comment, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![circle_id, account_id, issuer_id, comment, at_str],
        )?;
        Ok(
          conn
            .query_row(
              "SELECT id, circle_id, account_id, issuer_id, comment, created_at
               FROM circle_members WHERE circle_id = ?1 AND account_id = ?2",
              rusqlite::params![circle_id, account_id],
              RawCircleMember::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or_else(|| {
        Error::Vanished(format!("circle {circle_id} member {account_id}"))
      })?
      .into_member()
  }

  async fn is_circle_member(
    &self,
    account_id: i64,
    circle_name: &str,
  ) -> Result<bool> {
    let circle_name = circle_name.to_owned();

    let member = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM circle_members m
             JOIN circles c ON c.id = m.circle_id
             WHERE m.account_id = ?1 AND c.name = ?2
           )",
          rusqlite::params![account_id, circle_name],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(member)
  }

  async fn in_circle(&self, account_id: i64, circle_id: i64) -> Result<bool> {
    let member = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM circle_members
             WHERE account_id = ?1 AND circle_id = ?2
           )",
          rusqlite::params![account_id, circle_id],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(member)
  }

  // ── Badges ────────────────────────────────────────────────────────────────

  async fn add_badge(
    &self,
    input: NewBadge,
    created_by: i64,
  ) -> Result<BadgeDescription> {
    let created_at = truncate_dt(Utc::now())?;
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO badge_descriptions
             (title, description, certification_circle_id, slug, icon, color,
              created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            row.title,
            row.description,
            row.certification_circle_id,
            row.slug,
            row.icon,
            row.color,
            created_by,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(BadgeDescription {
      id,
      title: input.title,
      description: input.description,
      certification_circle_id: input.certification_circle_id,
      slug: input.slug,
      icon: input.icon,
      color: input.color,
      created_by,
      created_at,
    })
  }

  async fn find_badge(&self, id: i64) -> Result<Option<BadgeDescription>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(select_badge(conn, "b.id = ?1", rusqlite::params![id])?)
      })
      .await?;

    raw.map(RawBadge::into_badge).transpose()
  }

  async fn find_badge_by_title(
    &self,
    title: &str,
  ) -> Result<Option<BadgeDescription>> {
    let title = title.to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(select_badge(conn, "b.title = ?1", rusqlite::params![title])?)
      })
      .await?;

    raw.map(RawBadge::into_badge).transpose()
  }

  async fn list_badges(&self) -> Result<Vec<BadgeDescription>> {
    let raws: Vec<RawBadge> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BADGE_COLUMNS} FROM badge_descriptions b ORDER BY b.title"
        ))?;
        let rows = stmt
          .query_map([], RawBadge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBadge::into_badge).collect()
  }

  async fn award_badge(
    &self,
    badge_id: i64,
    account_id: i64,
    awarded_by: i64,
  ) -> Result<BadgeAward> {
    let at_str = encode_dt(Utc::now());

    let (inserted, raw) = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT OR IGNORE INTO account_badges
             (account_id, badge_description_id, awarded_by_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![account_id, badge_id, awarded_by, at_str],
        )?;
        let raw = select_account_badge(
          conn,
          "ab.account_id = ?1 AND ab.badge_description_id = ?2",
          rusqlite::params![account_id, badge_id],
        )?;
        Ok((inserted == 1, raw))
      })
      .await?;

    let badge = raw
      .ok_or_else(|| {
        Error::Vanished(format!("badge {badge_id} of account {account_id}"))
      })?
      .into_account_badge()?;

    Ok(if inserted {
      BadgeAward::Awarded(badge)
    } else {
      BadgeAward::AlreadyHeld(badge)
    })
  }

  async fn find_account_badge(&self, id: i64) -> Result<Option<AccountBadge>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(select_account_badge(conn, "ab.id = ?1", rusqlite::params![id])?)
      })
      .await?;

    raw.map(RawAccountBadge::into_account_badge).transpose()
  }

  async fn list_account_badges(
    &self,
    account_id: i64,
  ) -> Result<Vec<AccountBadge>> {
    let raws: Vec<RawAccountBadge> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_BADGE_COLUMNS}
           FROM account_badges ab
           JOIN badge_descriptions b ON b.id = ab.badge_description_id
           WHERE ab.account_id = ?1
           ORDER BY b.title"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![account_id], RawAccountBadge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAccountBadge::into_account_badge)
      .collect()
  }

  async fn remove_account_badge(&self, id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM account_badges WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Memberships ───────────────────────────────────────────────────────────

  async fn set_membership(
    &self,
    account_id: i64,
    terms: MembershipTerms,
  ) -> Result<Membership> {
    let start_str = encode_date(terms.start_membership);
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawMembership> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO memberships
             (account_id, first_membership, start_membership, fee,
              membership_number, updated_at)
           VALUES (?1, ?2, ?2, ?3, ?4, ?5)
           ON CONFLICT (account_id) DO UPDATE SET
             first_membership  = MIN(first_membership, excluded.start_membership),
             start_membership  = excluded.start_membership,
             fee               = excluded.fee,
             membership_number = excluded.membership_number,
             updated_at        = excluded.updated_at",
          rusqlite::params![
            account_id,
            start_str,
            terms.fee,
            terms.membership_number,
            at_str,
          ],
        )?;
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m
                 WHERE m.account_id = ?1"
              ),
              rusqlite::params![account_id],
              RawMembership::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or_else(|| Error::Vanished(format!("membership of account {account_id}")))?
      .into_membership()
  }

  async fn find_membership(&self, account_id: i64) -> Result<Option<Membership>> {
    let raw: Option<RawMembership> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m
                 WHERE m.account_id = ?1"
              ),
              rusqlite::params![account_id],
              RawMembership::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMembership::into_membership).transpose()
  }

  async fn list_active_members(&self, today: NaiveDate) -> Result<Vec<Account>> {
    let today_str = encode_date(today);

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS}
           FROM accounts a
           JOIN memberships m ON m.account_id = a.id
           WHERE m.fee > 0 AND m.start_membership <= ?1
           ORDER BY a.username"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![today_str], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, account_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            session.token_hash,
            session.account_id,
            created_str,
            expires_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_session(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Session>> {
    let token_hash = token_hash.to_owned();
    let now_str = encode_dt(now);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token_hash, account_id, created_at, expires_at
               FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
              rusqlite::params![token_hash, now_str],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn extend_session(
    &self,
    token_hash: &str,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let token_hash = token_hash.to_owned();
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE sessions SET expires_at = ?2 WHERE token_hash = ?1",
          rusqlite::params![token_hash, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_session(&self, token_hash: &str) -> Result<bool> {
    let token_hash = token_hash.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(removed)
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn record_event(&self, input: NewEvent) -> Result<Event> {
    let created_at = truncate_dt(Utc::now())?;
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (domain, key, account_id, subject_id, text, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.domain,
            row.key,
            row.account_id,
            row.subject_id,
            row.text,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Event {
      id,
      domain: input.domain,
      key: input.key,
      account_id: input.account_id,
      subject_id: input.subject_id,
      text: input.text,
      created_at,
    })
  }

  async fn list_events(&self, limit: usize) -> Result<Vec<Event>> {
    let limit_val = limit as i64;

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, domain, key, account_id, subject_id, text, created_at
           FROM events ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}
