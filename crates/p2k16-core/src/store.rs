//! The `Store` trait: the persistence gateway.
//!
//! The trait is implemented by storage backends (e.g. `p2k16-store-sqlite`).
//! Higher layers (`p2k16-api`, the lifecycle manager) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  account::{Account, NewAccount},
  badge::{AccountBadge, BadgeAward, BadgeDescription, NewBadge},
  circle::{Circle, CircleMember, NewCircle},
  event::{Event, NewEvent},
  membership::{Membership, MembershipTerms},
  session::Session,
  tool::{CheckinOutcome, Checkout, CheckoutInsert, NewTool, OpenCheckout, Tool},
};

/// Abstraction over a p2k16 storage backend.
///
/// Checkout rows are append-only apart from the single checkin transition.
/// Backends must make [`Store::insert_checkout`] atomic with respect to the
/// open-checkout check; two concurrent calls for the same tool must never
/// both insert.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tools ─────────────────────────────────────────────────────────────

  /// Create and persist a new tool.
  fn add_tool(
    &self,
    input: NewTool,
  ) -> impl Future<Output = Result<Tool, Self::Error>> + Send + '_;

  /// Retrieve a tool by id. Returns `None` if not found.
  fn find_tool(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Tool>, Self::Error>> + Send + '_;

  /// List every tool, ordered by name.
  fn list_tools(
    &self,
  ) -> impl Future<Output = Result<Vec<Tool>, Self::Error>> + Send + '_;

  // ── Checkouts ─────────────────────────────────────────────────────────

  /// All checkouts with no checkin timestamp, joined with tool and holder
  /// names, most recent first.
  fn list_open_checkouts(
    &self,
  ) -> impl Future<Output = Result<Vec<OpenCheckout>, Self::Error>> + Send + '_;

  /// Retrieve a checkout by id. Returns `None` if not found.
  fn find_checkout(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Checkout>, Self::Error>> + Send + '_;

  /// Open a checkout of `tool_id` for `account_id` at `at`, unless the tool
  /// already has an open checkout, in which case that checkout is returned
  /// as [`CheckoutInsert::Occupied`] and nothing is written.
  fn insert_checkout(
    &self,
    tool_id: i64,
    account_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<CheckoutInsert, Self::Error>> + Send + '_;

  /// Close an open checkout by setting its checkin timestamp.
  fn mark_checked_in(
    &self,
    checkout_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<CheckinOutcome, Self::Error>> + Send + '_;

  /// Past and current checkouts of a tool, most recent first.
  fn checkout_history(
    &self,
    tool_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Checkout>, Self::Error>> + Send + '_;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Create an account. `password_hash` is an argon2 PHC string.
  fn add_account(
    &self,
    input: NewAccount,
    password_hash: String,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn find_account(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn find_account_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// The account and its stored password hash, for credential checks.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<(Account, String)>, Self::Error>>
  + Send
  + 'a;

  /// List every account, ordered by username.
  fn list_accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  // ── Circles ───────────────────────────────────────────────────────────

  fn add_circle(
    &self,
    input: NewCircle,
  ) -> impl Future<Output = Result<Circle, Self::Error>> + Send + '_;

  fn find_circle(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Circle>, Self::Error>> + Send + '_;

  /// List every circle, ordered by name.
  fn list_circles(
    &self,
  ) -> impl Future<Output = Result<Vec<Circle>, Self::Error>> + Send + '_;

  /// Add `account_id` to `circle_id`. Adding an existing member returns the
  /// existing membership row unchanged.
  fn add_circle_member(
    &self,
    circle_id: i64,
    account_id: i64,
    issuer_id: i64,
    comment: Option<String>,
  ) -> impl Future<Output = Result<CircleMember, Self::Error>> + Send + '_;

  /// Whether `account_id` belongs to the circle named `circle_name`.
  fn is_circle_member<'a>(
    &'a self,
    account_id: i64,
    circle_name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Whether `account_id` belongs to the circle with id `circle_id`.
  fn in_circle(
    &self,
    account_id: i64,
    circle_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Badges ────────────────────────────────────────────────────────────

  fn add_badge(
    &self,
    input: NewBadge,
    created_by: i64,
  ) -> impl Future<Output = Result<BadgeDescription, Self::Error>> + Send + '_;

  fn find_badge(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<BadgeDescription>, Self::Error>>
  + Send
  + '_;

  fn find_badge_by_title<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<Option<BadgeDescription>, Self::Error>>
  + Send
  + 'a;

  /// List every badge description, ordered by title.
  fn list_badges(
    &self,
  ) -> impl Future<Output = Result<Vec<BadgeDescription>, Self::Error>>
  + Send
  + '_;

  /// Give `badge_id` to `account_id`. An account holds a badge at most once;
  /// awarding it again returns the existing row as
  /// [`BadgeAward::AlreadyHeld`].
  fn award_badge(
    &self,
    badge_id: i64,
    account_id: i64,
    awarded_by: i64,
  ) -> impl Future<Output = Result<BadgeAward, Self::Error>> + Send + '_;

  fn find_account_badge(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<AccountBadge>, Self::Error>> + Send + '_;

  /// Badges held by `account_id`, ordered by title.
  fn list_account_badges(
    &self,
    account_id: i64,
  ) -> impl Future<Output = Result<Vec<AccountBadge>, Self::Error>> + Send + '_;

  /// Take a badge away. Returns `true` if it existed.
  fn remove_account_badge(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Memberships ───────────────────────────────────────────────────────

  /// Create or renew the membership of `account_id`. A renewal keeps the
  /// original `first_membership` date.
  fn set_membership(
    &self,
    account_id: i64,
    terms: MembershipTerms,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  fn find_membership(
    &self,
    account_id: i64,
  ) -> impl Future<Output = Result<Option<Membership>, Self::Error>> + Send + '_;

  /// Accounts whose membership is active on `today`, ordered by username.
  fn list_active_members(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look up a session that has not expired as of `now`.
  fn find_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Move a session's expiry forward.
  fn extend_session<'a>(
    &'a self,
    token_hash: &'a str,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a session. Returns `true` if it existed.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete every session expired as of `now`; returns how many were removed.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Append an audit event. `created_at` is set by the store.
  fn record_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// The most recent `limit` events, newest first.
  fn list_events(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;
}
